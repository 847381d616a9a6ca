// src/cli/run_campaigns.rs
use chrono::{Duration, Utc};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

use crate::analytics::EngagementEvent;
use crate::campaign::CampaignStatus;
use crate::database;
use crate::models::{Campaign, CliApp, MessageStatus};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

impl CliApp {
    pub async fn run_campaigns(&self) -> Result<()> {
        loop {
            println!("\n📝 Campaigns");
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

            let options = vec![
                "📋 List campaigns",
                "➕ Create campaign draft",
                "✍️  Generate message content",
                "🚀 Launch campaign",
                "⏸️  Pause campaign",
                "▶️  Resume campaign",
                "⏰ Activate due scheduled campaign",
                "🔁 Retry failed messages",
                "📄 Duplicate campaign",
                "📈 Record engagement event",
                "⬅️  Back",
            ];
            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Campaign action")
                .default(0)
                .items(&options)
                .interact()?;

            let outcome = match selection {
                0 => self.list_campaigns().await,
                1 => self.create_campaign().await,
                2 => self.generate_campaign_content().await,
                3 => self.launch_campaign().await,
                4 => self.pause_campaign().await,
                5 => self.resume_campaign().await,
                6 => self.activate_scheduled_campaign().await,
                7 => self.retry_failed_messages().await,
                8 => self.duplicate_campaign().await,
                9 => self.record_engagement_event().await,
                _ => break,
            };

            if let Err(e) = outcome {
                println!("❌ {}", e);
            }
        }
        Ok(())
    }

    /// Pick one campaign, optionally restricted to a status.
    async fn pick_campaign(&self, only: Option<CampaignStatus>) -> Result<Option<Campaign>> {
        let campaigns = database::list_campaigns(&self.db_pool, self.engine.workspace_id()).await?;
        let candidates: Vec<Campaign> = campaigns
            .into_iter()
            .filter(|c| only.map(|s| c.status == s).unwrap_or(true))
            .collect();

        if candidates.is_empty() {
            match only {
                Some(status) => println!("📭 No {} campaigns", status),
                None => println!("📭 No campaigns yet"),
            }
            return Ok(None);
        }

        let labels: Vec<String> = candidates
            .iter()
            .map(|c| format!("{} [{}]", c.name, c.status))
            .collect();
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Which campaign?")
            .items(&labels)
            .interact()?;

        Ok(Some(candidates[selection].clone()))
    }

    async fn list_campaigns(&self) -> Result<()> {
        let campaigns = database::list_campaigns(&self.db_pool, self.engine.workspace_id()).await?;
        if campaigns.is_empty() {
            println!("📭 No campaigns yet");
            return Ok(());
        }

        for campaign in &campaigns {
            let stats = self.engine.campaign_stats(&campaign.id).await?;
            println!(
                "  {} [{}] — {} messages ({} pending, {} sent, {} bounced)",
                campaign.name,
                campaign.status,
                stats.total_messages,
                stats.pending,
                stats.sent + stats.delivered + stats.opened + stats.clicked + stats.replied,
                stats.bounced
            );
        }
        Ok(())
    }

    async fn create_campaign(&self) -> Result<()> {
        let name: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Campaign name")
            .interact_text()?;

        let mut campaign = self.engine.new_campaign_draft(&name);

        campaign.subject_template = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Subject template (placeholders like {{name}})")
            .default("Quick question, {{name}}".to_string())
            .interact_text()?;
        campaign.body_template = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Body template")
            .default("Hi {{name}},\n\n{{custom_message}}\n\nBest,\n{{sender_name}}".to_string())
            .interact_text()?;

        let segments = self.engine.segments().list_with_counts().await?;
        if segments.is_empty() {
            println!("⚠️ No segments exist yet — create one before launching this campaign");
        } else {
            let mut options = vec!["(choose later)".to_string()];
            options.extend(
                segments
                    .iter()
                    .map(|(s, count)| format!("{} ({} leads)", s.name, count)),
            );
            let choice = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Target segment")
                .default(0)
                .items(&options)
                .interact()?;
            if choice > 0 {
                campaign.segment_id = Some(segments[choice - 1].0.id.clone());
            }
        }

        campaign.policy.delay_between_emails = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Delay between emails (seconds)")
            .default(campaign.policy.delay_between_emails)
            .interact_text()?;
        campaign.policy.max_emails_per_day = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Max emails per day")
            .default(campaign.policy.max_emails_per_day)
            .interact_text()?;

        campaign.send_immediately = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Send immediately on launch?")
            .default(true)
            .interact()?;
        if !campaign.send_immediately {
            let hours: i64 = Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Schedule how many hours from now?")
                .default(24)
                .interact_text()?;
            campaign.scheduled_at = Some(Utc::now() + Duration::hours(hours));
        }

        self.engine.save_campaign(&campaign).await?;
        println!("✅ Draft '{}' saved", campaign.name);
        Ok(())
    }

    async fn generate_campaign_content(&self) -> Result<()> {
        let Some(campaign) = self.pick_campaign(None).await? else {
            return Ok(());
        };
        let created = self.engine.generate_content(&campaign.id).await?;
        if created == 0 {
            println!("ℹ️ Nothing new to generate — every segment lead already has a message");
        } else {
            println!("✅ Generated {} new messages", created);
        }
        Ok(())
    }

    async fn launch_campaign(&self) -> Result<()> {
        let Some(campaign) = self.pick_campaign(Some(CampaignStatus::Draft)).await? else {
            return Ok(());
        };
        if let Some(segment_id) = &campaign.segment_id {
            if let Some(segment) = self.engine.segments().get(segment_id).await? {
                println!("🎯 Target segment: {}", segment.name);
            }
        }
        let status = self.engine.launch(&campaign.id).await?;
        println!("✅ Campaign '{}' is now {}", campaign.name, status);
        Ok(())
    }

    async fn pause_campaign(&self) -> Result<()> {
        let Some(campaign) = self.pick_campaign(Some(CampaignStatus::Running)).await? else {
            return Ok(());
        };
        self.engine.pause(&campaign.id).await?;
        println!("⏸️  Campaign '{}' paused", campaign.name);
        Ok(())
    }

    async fn resume_campaign(&self) -> Result<()> {
        let Some(campaign) = self.pick_campaign(Some(CampaignStatus::Paused)).await? else {
            return Ok(());
        };
        self.engine.resume(&campaign.id).await?;
        println!("▶️  Campaign '{}' running again", campaign.name);
        Ok(())
    }

    async fn activate_scheduled_campaign(&self) -> Result<()> {
        let Some(campaign) = self.pick_campaign(Some(CampaignStatus::Scheduled)).await? else {
            return Ok(());
        };
        let status = self.engine.activate_scheduled(&campaign.id).await?;
        println!("✅ Campaign '{}' is now {}", campaign.name, status);
        Ok(())
    }

    async fn retry_failed_messages(&self) -> Result<()> {
        let Some(campaign) = self.pick_campaign(None).await? else {
            return Ok(());
        };
        let requeued = self.engine.retry_failed(&campaign.id).await?;
        if requeued == 0 {
            println!("ℹ️ No failed messages to retry (bounces are never retried)");
        } else {
            println!("🔁 Re-queued {} messages", requeued);
        }
        Ok(())
    }

    async fn duplicate_campaign(&self) -> Result<()> {
        let Some(campaign) = self.pick_campaign(None).await? else {
            return Ok(());
        };
        let copy = self.engine.duplicate(&campaign.id).await?;
        println!("📄 Created draft '{}'", copy.name);
        Ok(())
    }

    /// Manual hook for provider callbacks that have no transport here:
    /// advance a sent message along delivered/opened/clicked/replied.
    async fn record_engagement_event(&self) -> Result<()> {
        let Some(campaign) = self.pick_campaign(None).await? else {
            return Ok(());
        };

        let messages = database::list_campaign_messages(&self.db_pool, &campaign.id).await?;
        let delivered: Vec<_> = messages
            .iter()
            .filter(|m| {
                !matches!(
                    m.status,
                    MessageStatus::Pending | MessageStatus::Bounced | MessageStatus::Failed
                )
            })
            .collect();

        if delivered.is_empty() {
            println!("📭 No sent messages in this campaign");
            return Ok(());
        }

        let labels: Vec<String> = delivered
            .iter()
            .map(|m| {
                format!(
                    "{} [{}] {}",
                    m.lead_id.as_deref().unwrap_or("(lead deleted)"),
                    m.status.as_str(),
                    m.subject
                )
            })
            .collect();
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Which message?")
            .items(&labels)
            .interact()?;

        let events = vec!["delivered", "opened", "clicked", "replied"];
        let event_choice = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Event")
            .items(&events)
            .interact()?;
        let event = match event_choice {
            0 => EngagementEvent::Delivered,
            1 => EngagementEvent::Opened,
            2 => EngagementEvent::Clicked,
            _ => EngagementEvent::Replied,
        };

        let applied = self
            .engine
            .record_engagement(&delivered[selection].id, event)
            .await?;
        if applied {
            println!("✅ Recorded");
        } else {
            println!("ℹ️ Ignored — message was never sent");
        }
        Ok(())
    }
}
