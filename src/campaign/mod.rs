// src/campaign/mod.rs
use chrono::Utc;
use tracing::{debug, info};

pub mod lifecycle;

pub use lifecycle::{transition, CampaignEvent, CampaignStatus, TransitionError};

use crate::config::WorkspaceConfig;
use crate::database::{self, DbPool};
use crate::models::{Campaign, MessageStatus, OutreachMessage, Result, SendingPolicy};
use crate::template;

/// Owns campaign state changes and the side effects that accompany them.
/// Everything that moves a campaign between statuses goes through here,
/// including the sender's auto-pause/complete/fail paths.
pub struct CampaignController {
    workspace: WorkspaceConfig,
    db_pool: DbPool,
}

impl CampaignController {
    pub fn new(workspace: WorkspaceConfig, db_pool: DbPool) -> Self {
        Self { workspace, db_pool }
    }

    /// Build a fresh draft with the workspace's default sending policy.
    pub fn new_draft(&self, name: &str, defaults: &SendingPolicy) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: uuid::Uuid::new_v4().to_string(),
            workspace: self.workspace.id.clone(),
            name: name.to_string(),
            description: None,
            subject_template: String::new(),
            body_template: String::new(),
            segment_id: None,
            status: CampaignStatus::Draft,
            send_immediately: true,
            scheduled_at: None,
            policy: defaults.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Persist campaign fields. Only drafts are editable; anything past
    /// draft must be duplicated into a new draft instead.
    pub async fn save_draft(&self, campaign: &Campaign) -> Result<()> {
        if campaign.status != CampaignStatus::Draft {
            return Err(format!(
                "only draft campaigns can be edited (campaign '{}' is {})",
                campaign.name, campaign.status
            )
            .into());
        }
        if let Some(existing) = database::get_campaign(&self.db_pool, &campaign.id).await? {
            if existing.status != CampaignStatus::Draft {
                return Err(format!(
                    "only draft campaigns can be edited (campaign '{}' is {})",
                    existing.name, existing.status
                )
                .into());
            }
        }
        database::upsert_campaign(&self.db_pool, campaign).await
    }

    fn validate_ready(campaign: &Campaign) -> Result<()> {
        let mut missing = Vec::new();
        if campaign.name.trim().is_empty() {
            missing.push("name");
        }
        if campaign.subject_template.trim().is_empty() {
            missing.push("subject template");
        }
        if campaign.body_template.trim().is_empty() {
            missing.push("body template");
        }
        if campaign.segment_id.is_none() {
            missing.push("target segment");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("campaign is not ready to launch: missing {}", missing.join(", ")).into())
        }
    }

    /// Materialize one pending message per segment lead that has none yet
    /// for this campaign. Safe to call repeatedly: already-materialized
    /// leads are skipped, so only newly added segment members get rows.
    /// Returns the number of messages actually created.
    pub async fn generate_content(&self, campaign_id: &str) -> Result<usize> {
        let campaign = database::get_campaign(&self.db_pool, campaign_id)
            .await?
            .ok_or("campaign not found")?;

        let segment_id = campaign
            .segment_id
            .as_deref()
            .ok_or("cannot generate content: campaign has no target segment")?;

        let leads = database::leads_in_segment(&self.db_pool, segment_id).await?;
        debug!(
            "Generating content for campaign '{}' over {} segment leads",
            campaign.name,
            leads.len()
        );

        let mut created = 0usize;
        for lead in &leads {
            let mut data = template::lead_context(lead, &self.workspace);
            let subject = template::render(&campaign.subject_template, &data);
            // the rendered subject is itself substitutable in the body,
            // which is how follow-up templates quote the original subject
            data.insert("subject".to_string(), subject.clone());
            let message = OutreachMessage {
                id: uuid::Uuid::new_v4().to_string(),
                campaign_id: campaign.id.clone(),
                lead_id: Some(lead.id.clone()),
                subject,
                body: template::render(&campaign.body_template, &data),
                status: MessageStatus::Pending,
                provider_message_id: None,
                error: None,
                created_at: Utc::now(),
                sent_at: None,
                delivered_at: None,
                opened_at: None,
                clicked_at: None,
                replied_at: None,
                bounced_at: None,
                failed_at: None,
            };
            if database::insert_message_if_absent(&self.db_pool, &message).await? {
                created += 1;
            }
        }

        info!(
            "Campaign '{}': generated {} new messages ({} leads in segment)",
            campaign.name,
            created,
            leads.len()
        );
        Ok(created)
    }

    /// Leave draft (or scheduled) for the sending phase. Validates required
    /// fields and refuses to enter `running` with an empty queue. A future
    /// send time parks the campaign in `scheduled` instead.
    pub async fn launch(&self, campaign_id: &str) -> Result<CampaignStatus> {
        let campaign = database::get_campaign(&self.db_pool, campaign_id)
            .await?
            .ok_or("campaign not found")?;

        Self::validate_ready(&campaign)?;

        let pending =
            database::count_messages_with_status(&self.db_pool, campaign_id, MessageStatus::Pending)
                .await?;
        if pending == 0 {
            return Err(
                "cannot launch: no pending messages exist (generate content first, \
                 and check that the target segment is not empty)"
                    .into(),
            );
        }

        let schedule_later = !campaign.send_immediately
            && campaign.scheduled_at.map(|t| t > Utc::now()).unwrap_or(false);

        let event = if schedule_later {
            CampaignEvent::Schedule
        } else {
            CampaignEvent::Launch
        };
        let next = transition(campaign.status, event)?;

        if !database::update_campaign_status(&self.db_pool, campaign_id, campaign.status, next)
            .await?
        {
            return Err("campaign status changed concurrently; launch aborted".into());
        }

        info!("Campaign '{}' → {}", campaign.name, next);
        Ok(next)
    }

    /// Promote a scheduled campaign whose send time has arrived. Reuses the
    /// launch validation: an empty queue at promotion time fails the
    /// campaign instead of letting it run with nothing to send.
    pub async fn activate_scheduled(&self, campaign_id: &str) -> Result<CampaignStatus> {
        let campaign = database::get_campaign(&self.db_pool, campaign_id)
            .await?
            .ok_or("campaign not found")?;

        if campaign.status != CampaignStatus::Scheduled {
            return Err(format!("campaign is {}, not scheduled", campaign.status).into());
        }
        if let Some(at) = campaign.scheduled_at {
            if at > Utc::now() {
                return Err(format!("campaign is scheduled for {}", at.to_rfc3339()).into());
            }
        }

        let pending =
            database::count_messages_with_status(&self.db_pool, campaign_id, MessageStatus::Pending)
                .await?;
        if pending == 0 {
            let failed = transition(campaign.status, CampaignEvent::Fail)?;
            database::update_campaign_status(&self.db_pool, campaign_id, campaign.status, failed)
                .await?;
            return Err("no messages to send at scheduled time; campaign marked failed".into());
        }

        let next = transition(campaign.status, CampaignEvent::Launch)?;
        database::update_campaign_status(&self.db_pool, campaign_id, campaign.status, next).await?;
        info!("Campaign '{}' → {}", campaign.name, next);
        Ok(next)
    }

    async fn apply_event(&self, campaign_id: &str, event: CampaignEvent) -> Result<CampaignStatus> {
        let campaign = database::get_campaign(&self.db_pool, campaign_id)
            .await?
            .ok_or("campaign not found")?;

        let next = transition(campaign.status, event)?;
        if !database::update_campaign_status(&self.db_pool, campaign_id, campaign.status, next)
            .await?
        {
            return Err(format!(
                "campaign status changed concurrently; {} aborted",
                event
            )
            .into());
        }
        info!("Campaign '{}' → {}", campaign.name, next);
        Ok(next)
    }

    /// Stop the sender from selecting further messages. Messages already
    /// dispatched are unaffected.
    pub async fn pause(&self, campaign_id: &str) -> Result<CampaignStatus> {
        self.apply_event(campaign_id, CampaignEvent::Pause).await
    }

    pub async fn resume(&self, campaign_id: &str) -> Result<CampaignStatus> {
        self.apply_event(campaign_id, CampaignEvent::Resume).await
    }

    /// Sender-detected: no pending messages remained after a drain.
    pub async fn complete(&self, campaign_id: &str) -> Result<CampaignStatus> {
        self.apply_event(campaign_id, CampaignEvent::Complete).await
    }

    pub async fn fail(&self, campaign_id: &str) -> Result<CampaignStatus> {
        self.apply_event(campaign_id, CampaignEvent::Fail).await
    }

    /// Copy configuration into a fresh draft. Messages are never copied;
    /// the duplicate starts with an empty queue.
    pub async fn duplicate(&self, campaign_id: &str) -> Result<Campaign> {
        let source = database::get_campaign(&self.db_pool, campaign_id)
            .await?
            .ok_or("campaign not found")?;

        let now = Utc::now();
        let copy = Campaign {
            id: uuid::Uuid::new_v4().to_string(),
            workspace: source.workspace.clone(),
            name: format!("{} (copy)", source.name),
            description: source.description.clone(),
            subject_template: source.subject_template.clone(),
            body_template: source.body_template.clone(),
            segment_id: source.segment_id.clone(),
            status: CampaignStatus::Draft,
            send_immediately: source.send_immediately,
            scheduled_at: None,
            policy: source.policy.clone(),
            created_at: now,
            updated_at: now,
        };
        database::upsert_campaign(&self.db_pool, &copy).await?;
        info!("Campaign '{}' duplicated as '{}'", source.name, copy.name);
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::database::create_db_pool;
    use crate::models::{Lead, LeadOrigin};
    use tempfile::TempDir;

    async fn test_pool() -> (TempDir, DbPool) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        let pool = create_db_pool(db_path.to_str().unwrap()).await.unwrap();
        (dir, pool)
    }

    fn controller(pool: &DbPool) -> CampaignController {
        CampaignController::new(Config::default().workspace, pool.clone())
    }

    async fn seed_lead(pool: &DbPool, name: &str, email: &str, segment: &str) -> Lead {
        let mut lead = Lead::new("default", name, email, LeadOrigin::Manual);
        lead.segment_id = Some(segment.to_string());
        database::upsert_lead(pool, &lead).await.unwrap();
        database::get_lead_by_email(pool, "default", email)
            .await
            .unwrap()
            .unwrap()
    }

    async fn seed_campaign(ctrl: &CampaignController, pool: &DbPool, segment: &str) -> Campaign {
        let mut campaign = ctrl.new_draft("Spring launch", &SendingPolicy::default());
        campaign.subject_template = "Hello {{name}}".to_string();
        campaign.body_template = "Hi {{name}}, {{custom_message}} — {{sender_name}}".to_string();
        campaign.segment_id = Some(segment.to_string());
        ctrl.save_draft(&campaign).await.unwrap();
        database::get_campaign(pool, &campaign.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn generation_is_idempotent() {
        let (_dir, pool) = test_pool().await;
        let ctrl = controller(&pool);

        seed_lead(&pool, "Alice", "a@x.com", "seg-1").await;
        seed_lead(&pool, "Bob", "b@x.com", "seg-1").await;
        let campaign = seed_campaign(&ctrl, &pool, "seg-1").await;

        assert_eq!(ctrl.generate_content(&campaign.id).await.unwrap(), 2);
        assert_eq!(ctrl.generate_content(&campaign.id).await.unwrap(), 0);

        let messages = database::list_campaign_messages(&pool, &campaign.id)
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn generation_picks_up_new_segment_members() {
        let (_dir, pool) = test_pool().await;
        let ctrl = controller(&pool);

        seed_lead(&pool, "Alice", "a@x.com", "seg-1").await;
        let campaign = seed_campaign(&ctrl, &pool, "seg-1").await;
        assert_eq!(ctrl.generate_content(&campaign.id).await.unwrap(), 1);

        seed_lead(&pool, "Bob", "b@x.com", "seg-1").await;
        assert_eq!(ctrl.generate_content(&campaign.id).await.unwrap(), 1);

        let messages = database::list_campaign_messages(&pool, &campaign.id)
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn generated_messages_are_rendered_per_lead() {
        let (_dir, pool) = test_pool().await;
        let ctrl = controller(&pool);

        seed_lead(&pool, "Alice", "a@x.com", "seg-1").await;
        let campaign = seed_campaign(&ctrl, &pool, "seg-1").await;
        ctrl.generate_content(&campaign.id).await.unwrap();

        let messages = database::list_campaign_messages(&pool, &campaign.id)
            .await
            .unwrap();
        assert_eq!(messages[0].subject, "Hello Alice");
        assert!(messages[0].body.contains("Hi Alice"));
        assert!(messages[0]
            .body
            .contains(crate::template::CUSTOM_MESSAGE_PLACEHOLDER));
        assert_eq!(messages[0].status, MessageStatus::Pending);
    }

    #[tokio::test]
    async fn launch_requires_pending_messages() {
        let (_dir, pool) = test_pool().await;
        let ctrl = controller(&pool);

        // segment exists but holds no leads, so generation creates nothing
        let campaign = seed_campaign(&ctrl, &pool, "empty-seg").await;
        assert_eq!(ctrl.generate_content(&campaign.id).await.unwrap(), 0);

        let err = ctrl.launch(&campaign.id).await.unwrap_err();
        assert!(err.to_string().contains("no pending messages"));

        let stored = database::get_campaign(&pool, &campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Draft);
    }

    #[tokio::test]
    async fn launch_requires_configured_fields() {
        let (_dir, pool) = test_pool().await;
        let ctrl = controller(&pool);

        let campaign = ctrl.new_draft("Bare", &SendingPolicy::default());
        ctrl.save_draft(&campaign).await.unwrap();

        let err = ctrl.launch(&campaign.id).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("subject template"));
        assert!(text.contains("target segment"));
    }

    #[tokio::test]
    async fn launch_then_pause_then_resume() {
        let (_dir, pool) = test_pool().await;
        let ctrl = controller(&pool);

        seed_lead(&pool, "Alice", "a@x.com", "seg-1").await;
        let campaign = seed_campaign(&ctrl, &pool, "seg-1").await;
        ctrl.generate_content(&campaign.id).await.unwrap();

        assert_eq!(ctrl.launch(&campaign.id).await.unwrap(), CampaignStatus::Running);
        assert_eq!(ctrl.pause(&campaign.id).await.unwrap(), CampaignStatus::Paused);
        assert_eq!(ctrl.resume(&campaign.id).await.unwrap(), CampaignStatus::Running);
    }

    #[tokio::test]
    async fn pause_resume_leaves_message_content_untouched() {
        let (_dir, pool) = test_pool().await;
        let ctrl = controller(&pool);

        seed_lead(&pool, "Alice", "a@x.com", "seg-1").await;
        let campaign = seed_campaign(&ctrl, &pool, "seg-1").await;
        ctrl.generate_content(&campaign.id).await.unwrap();
        ctrl.launch(&campaign.id).await.unwrap();

        let before = database::list_campaign_messages(&pool, &campaign.id)
            .await
            .unwrap();
        ctrl.pause(&campaign.id).await.unwrap();
        ctrl.resume(&campaign.id).await.unwrap();
        let after = database::list_campaign_messages(&pool, &campaign.id)
            .await
            .unwrap();

        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(b.id, a.id);
            assert_eq!(b.subject, a.subject);
            assert_eq!(b.body, a.body);
            assert_eq!(b.status, a.status);
        }
    }

    #[tokio::test]
    async fn non_draft_campaigns_reject_edits() {
        let (_dir, pool) = test_pool().await;
        let ctrl = controller(&pool);

        seed_lead(&pool, "Alice", "a@x.com", "seg-1").await;
        let mut campaign = seed_campaign(&ctrl, &pool, "seg-1").await;
        ctrl.generate_content(&campaign.id).await.unwrap();
        ctrl.launch(&campaign.id).await.unwrap();

        campaign.name = "Renamed".to_string();
        let err = ctrl.save_draft(&campaign).await.unwrap_err();
        assert!(err.to_string().contains("only draft campaigns"));
    }

    #[tokio::test]
    async fn duplicate_copies_config_but_not_messages() {
        let (_dir, pool) = test_pool().await;
        let ctrl = controller(&pool);

        seed_lead(&pool, "Alice", "a@x.com", "seg-1").await;
        let campaign = seed_campaign(&ctrl, &pool, "seg-1").await;
        ctrl.generate_content(&campaign.id).await.unwrap();
        ctrl.launch(&campaign.id).await.unwrap();

        let copy = ctrl.duplicate(&campaign.id).await.unwrap();
        assert_eq!(copy.status, CampaignStatus::Draft);
        assert_eq!(copy.subject_template, campaign.subject_template);
        assert_eq!(copy.segment_id, campaign.segment_id);
        assert_ne!(copy.id, campaign.id);
        assert!(copy.name.ends_with("(copy)"));

        let messages = database::list_campaign_messages(&pool, &copy.id).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn scheduled_launch_parks_until_due() {
        let (_dir, pool) = test_pool().await;
        let ctrl = controller(&pool);

        seed_lead(&pool, "Alice", "a@x.com", "seg-1").await;
        let mut campaign = seed_campaign(&ctrl, &pool, "seg-1").await;
        campaign.send_immediately = false;
        campaign.scheduled_at = Some(Utc::now() + chrono::Duration::hours(2));
        ctrl.save_draft(&campaign).await.unwrap();
        ctrl.generate_content(&campaign.id).await.unwrap();

        assert_eq!(
            ctrl.launch(&campaign.id).await.unwrap(),
            CampaignStatus::Scheduled
        );

        // not due yet
        let err = ctrl.activate_scheduled(&campaign.id).await.unwrap_err();
        assert!(err.to_string().contains("scheduled for"));
    }
}
