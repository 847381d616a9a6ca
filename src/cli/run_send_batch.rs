// src/cli/run_send_batch.rs
use dialoguer::{theme::ColorfulTheme, Confirm, Select};

use crate::campaign::CampaignStatus;
use crate::database;
use crate::models::{CliApp, MessageStatus};
use crate::sender::{MailgunConfig, MailgunProvider};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

impl CliApp {
    pub async fn run_send_batch(&self) -> Result<()> {
        println!("\n📧 Campaign Batch Send");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let campaigns =
            database::list_campaigns(&self.db_pool, self.engine.workspace_id()).await?;
        let running: Vec<_> = campaigns
            .into_iter()
            .filter(|c| c.status == CampaignStatus::Running)
            .collect();

        if running.is_empty() {
            println!("📭 No running campaigns — launch one first");
            return Ok(());
        }

        let labels: Vec<String> = running.iter().map(|c| c.name.clone()).collect();
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Drain which campaign?")
            .items(&labels)
            .interact()?;
        let campaign = &running[selection];

        let mailgun_config = MailgunConfig::from_env().map_err(|e| {
            println!("❌ Provider configuration error: {}", e);
            e
        })?;
        let provider = MailgunProvider::new(mailgun_config);

        loop {
            let report = self.engine.run_batch(&campaign.id, &provider).await?;

            println!("\n📦 Batch result:");
            println!("   Attempted: {}", report.attempted);
            println!("   ✅ Sent: {}", report.sent);
            println!("   ↩️  Bounced: {}", report.bounced);
            println!("   ⚠️  Failed (retryable): {}", report.failed);

            if report.auto_paused {
                println!("🛑 Campaign auto-paused: bounce rate exceeded the safety threshold");
                println!("   Review the list, then resume from the campaign menu");
                break;
            }
            if report.completed {
                println!("🎉 Campaign complete — no pending messages remain");
                break;
            }
            if report.daily_cap_reached {
                println!("⏳ Daily cap reached; remaining messages wait for the window to reset");
                break;
            }

            let pending = database::count_messages_with_status(
                &self.db_pool,
                &campaign.id,
                MessageStatus::Pending,
            )
            .await?;
            if pending == 0 {
                break;
            }

            if !Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(format!("{} messages still pending — drain another batch?", pending))
                .default(true)
                .interact()?
            {
                break;
            }
        }

        Ok(())
    }
}
