// src/sender/mod.rs
use chrono::Utc;
use tracing::{debug, info, warn};

pub mod provider;

pub use provider::{
    DeliveryOutcome, DeliveryProvider, DeliveryRequest, MailgunConfig, MailgunProvider,
};

use crate::campaign::{CampaignController, CampaignStatus};
use crate::config::SendingConfig;
use crate::database::{self, DbPool};
use crate::models::{MessageStatus, Result};

/// What one drain invocation did.
#[derive(Debug, Clone, Default)]
pub struct DrainReport {
    pub attempted: usize,
    pub sent: usize,
    pub bounced: usize,
    pub failed: usize,
    pub daily_cap_reached: bool,
    pub auto_paused: bool,
    pub completed: bool,
}

/// Drains one campaign's pending queue under its sending policy. Sends
/// within a campaign are strictly serialized; concurrent dispatch would
/// defeat the inter-message delay and the daily cap.
pub struct BatchSender {
    config: SendingConfig,
    db_pool: DbPool,
}

impl BatchSender {
    pub fn new(config: SendingConfig, db_pool: DbPool) -> Self {
        Self { config, db_pool }
    }

    /// Delay before the next dispatch: the campaign's configured gap plus
    /// up to a second of jitter.
    fn inter_send_delay(&self, delay_seconds: u64) -> std::time::Duration {
        let jitter_ms = fastrand::u64(0..=1000);
        std::time::Duration::from_millis(delay_seconds * 1000 + jitter_ms)
    }

    /// Dispatch up to one batch of pending messages for a running
    /// campaign, oldest first. Honors the trailing-24h daily cap, pauses
    /// the campaign when the batch's bounce rate crosses the configured
    /// threshold, and completes it when the queue is confirmed empty.
    pub async fn drain(
        &self,
        controller: &CampaignController,
        campaign_id: &str,
        provider: &dyn DeliveryProvider,
    ) -> Result<DrainReport> {
        let campaign = database::get_campaign(&self.db_pool, campaign_id)
            .await?
            .ok_or("campaign not found")?;

        if campaign.status != CampaignStatus::Running {
            return Err(format!(
                "cannot send: campaign '{}' is {}, not running",
                campaign.name, campaign.status
            )
            .into());
        }

        let mut report = DrainReport::default();
        let now = Utc::now();

        let sent_in_window =
            database::count_sent_in_window(&self.db_pool, campaign_id, now).await?;
        let cap = campaign.policy.max_emails_per_day as i64;
        let cap_remaining = (cap - sent_in_window).max(0) as usize;

        if cap_remaining == 0 {
            info!(
                "Campaign '{}': daily cap of {} reached, leaving queue untouched",
                campaign.name, cap
            );
            report.daily_cap_reached = true;
            return Ok(report);
        }

        let budget = self.config.batch_size.min(cap_remaining);
        let batch = database::pending_messages(&self.db_pool, campaign_id, budget).await?;

        if batch.is_empty() {
            // an empty selection on a running campaign confirms completion
            let pending = database::count_messages_with_status(
                &self.db_pool,
                campaign_id,
                MessageStatus::Pending,
            )
            .await?;
            if pending == 0 {
                controller.complete(campaign_id).await?;
                report.completed = true;
                info!("Campaign '{}' completed: queue drained", campaign.name);
            }
            return Ok(report);
        }

        info!(
            "Campaign '{}': draining {} of {} allowed messages",
            campaign.name,
            batch.len(),
            cap_remaining
        );

        let last_index = batch.len() - 1;
        for (i, message) in batch.iter().enumerate() {
            report.attempted += 1;

            let lead = match &message.lead_id {
                Some(lead_id) => database::get_lead(&self.db_pool, lead_id).await?,
                None => None,
            };

            let Some(lead) = lead else {
                // lead was deleted after generation; nothing to address
                database::mark_message_failed(
                    &self.db_pool,
                    &message.id,
                    "lead record no longer exists",
                    Utc::now(),
                )
                .await?;
                report.failed += 1;
                continue;
            };

            let request = DeliveryRequest {
                to_email: lead.email.clone(),
                to_name: lead.name.clone(),
                subject: message.subject.clone(),
                body: message.body.clone(),
                track_opens: campaign.policy.track_opens,
                track_clicks: campaign.policy.track_clicks,
            };

            match provider.dispatch(&request).await {
                DeliveryOutcome::Accepted {
                    provider_message_id,
                } => {
                    let at = Utc::now();
                    database::mark_message_sent(&self.db_pool, &message.id, &provider_message_id, at)
                        .await?;
                    database::mark_lead_contacted(&self.db_pool, &lead.id, at).await?;
                    report.sent += 1;
                    debug!("Sent to {} ({})", lead.email, provider_message_id);
                }
                DeliveryOutcome::Bounced { reason } => {
                    database::mark_message_bounced(&self.db_pool, &message.id, &reason, Utc::now())
                        .await?;
                    report.bounced += 1;
                    warn!("Bounce for {}: {}", lead.email, reason);
                }
                DeliveryOutcome::Failed { reason } => {
                    database::mark_message_failed(&self.db_pool, &message.id, &reason, Utc::now())
                        .await?;
                    report.failed += 1;
                    warn!("Transient failure for {}: {}", lead.email, reason);
                }
            }

            if i < last_index {
                tokio::time::sleep(self.inter_send_delay(campaign.policy.delay_between_emails))
                    .await;
            }
        }

        // Safety valve: too many bounces in one batch means a bad list.
        // Stop before sender reputation takes further damage.
        let bounce_rate = report.bounced as f64 / report.attempted as f64;
        if bounce_rate > self.config.bounce_pause_threshold {
            warn!(
                "Campaign '{}': bounce rate {:.0}% exceeds {:.0}% threshold, auto-pausing",
                campaign.name,
                bounce_rate * 100.0,
                self.config.bounce_pause_threshold * 100.0
            );
            controller.pause(campaign_id).await?;
            report.auto_paused = true;
            return Ok(report);
        }

        let pending = database::count_messages_with_status(
            &self.db_pool,
            campaign_id,
            MessageStatus::Pending,
        )
        .await?;
        if pending == 0 {
            controller.complete(campaign_id).await?;
            report.completed = true;
            info!("Campaign '{}' completed: queue drained", campaign.name);
        }

        Ok(report)
    }

    /// Re-queue transient failures for another drain. Bounced messages are
    /// permanent rejections and stay put.
    pub async fn retry_failed(&self, campaign_id: &str) -> Result<usize> {
        let requeued = database::requeue_failed_messages(&self.db_pool, campaign_id).await?;
        if requeued > 0 {
            info!("Re-queued {} failed messages for retry", requeued);
        }
        Ok(requeued)
    }
}

#[cfg(test)]
mod tests {
    use super::provider::MockProvider;
    use super::*;
    use crate::campaign::CampaignController;
    use crate::config::Config;
    use crate::database::create_db_pool;
    use crate::models::{Campaign, Lead, LeadOrigin, LeadStatus, SendingPolicy};
    use tempfile::TempDir;

    struct World {
        _dir: TempDir,
        pool: DbPool,
        controller: CampaignController,
        campaign: Campaign,
    }

    fn sender(pool: &DbPool, batch_size: usize) -> BatchSender {
        let mut config = Config::default().sending;
        config.batch_size = batch_size;
        BatchSender::new(config, pool.clone())
    }

    /// A running campaign over `lead_count` leads with a zero inter-send
    /// delay so tests do not sleep.
    async fn running_campaign(lead_count: usize, max_per_day: u32) -> World {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        let pool = create_db_pool(db_path.to_str().unwrap()).await.unwrap();
        let controller = CampaignController::new(Config::default().workspace, pool.clone());

        for i in 0..lead_count {
            let mut lead = Lead::new(
                "default",
                &format!("Lead {}", i),
                &format!("lead{}@x.com", i),
                LeadOrigin::Manual,
            );
            lead.segment_id = Some("seg-1".to_string());
            database::upsert_lead(&pool, &lead).await.unwrap();
        }

        let mut campaign = controller.new_draft("Drain test", &SendingPolicy::default());
        campaign.subject_template = "Hello {{name}}".to_string();
        campaign.body_template = "Hi {{name}}".to_string();
        campaign.segment_id = Some("seg-1".to_string());
        campaign.policy.delay_between_emails = 0;
        campaign.policy.max_emails_per_day = max_per_day;
        controller.save_draft(&campaign).await.unwrap();
        controller.generate_content(&campaign.id).await.unwrap();
        controller.launch(&campaign.id).await.unwrap();

        let campaign = database::get_campaign(&pool, &campaign.id)
            .await
            .unwrap()
            .unwrap();
        World {
            _dir: dir,
            pool,
            controller,
            campaign,
        }
    }

    async fn status_count(world: &World, status: MessageStatus) -> i64 {
        database::count_messages_with_status(&world.pool, &world.campaign.id, status)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn drain_sends_whole_queue_and_completes() {
        let world = running_campaign(3, 100).await;
        let sender = sender(&world.pool, 10);
        let provider = MockProvider::accepting();

        let report = sender
            .drain(&world.controller, &world.campaign.id, &provider)
            .await
            .unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.sent, 3);
        assert!(report.completed);
        assert_eq!(status_count(&world, MessageStatus::Sent).await, 3);

        let stored = database::get_campaign(&world.pool, &world.campaign.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, CampaignStatus::Completed);
    }

    #[tokio::test]
    async fn sent_leads_are_stamped_contacted() {
        let world = running_campaign(1, 100).await;
        let sender = sender(&world.pool, 10);
        let provider = MockProvider::accepting();

        sender
            .drain(&world.controller, &world.campaign.id, &provider)
            .await
            .unwrap();

        let lead = database::get_lead_by_email(&world.pool, "default", "lead0@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lead.status, LeadStatus::Contacted);
        assert!(lead.last_contacted_at.is_some());
    }

    #[tokio::test]
    async fn daily_cap_bounds_each_window() {
        let world = running_campaign(5, 3).await;
        let sender = sender(&world.pool, 10);
        let provider = MockProvider::accepting();

        let report = sender
            .drain(&world.controller, &world.campaign.id, &provider)
            .await
            .unwrap();
        assert_eq!(report.sent, 3);
        assert!(!report.completed);
        assert_eq!(status_count(&world, MessageStatus::Pending).await, 2);

        // a second drain inside the same 24h window sends nothing
        let report = sender
            .drain(&world.controller, &world.campaign.id, &provider)
            .await
            .unwrap();
        assert!(report.daily_cap_reached);
        assert_eq!(report.attempted, 0);
        assert_eq!(status_count(&world, MessageStatus::Sent).await, 3);
        assert_eq!(status_count(&world, MessageStatus::Pending).await, 2);
    }

    #[tokio::test]
    async fn bounce_rate_above_threshold_auto_pauses() {
        let world = running_campaign(15, 100).await;
        let sender = sender(&world.pool, 10);

        // 4 bounces in a 10-message batch = 40%, over the 20% default
        let mut outcomes = Vec::new();
        for i in 0..10 {
            if i < 4 {
                outcomes.push(DeliveryOutcome::Bounced {
                    reason: "550 mailbox unavailable".to_string(),
                });
            } else {
                outcomes.push(DeliveryOutcome::Accepted {
                    provider_message_id: format!("id-{}", i),
                });
            }
        }
        let provider = MockProvider::new(outcomes);

        let report = sender
            .drain(&world.controller, &world.campaign.id, &provider)
            .await
            .unwrap();

        assert_eq!(report.attempted, 10);
        assert_eq!(report.bounced, 4);
        assert!(report.auto_paused);
        assert!(!report.completed);

        let stored = database::get_campaign(&world.pool, &world.campaign.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, CampaignStatus::Paused);
        // the messages outside the batch were never touched
        assert_eq!(status_count(&world, MessageStatus::Pending).await, 5);
    }

    #[tokio::test]
    async fn bounces_under_threshold_keep_running() {
        let world = running_campaign(10, 100).await;
        let sender = sender(&world.pool, 10);

        let mut outcomes = vec![DeliveryOutcome::Bounced {
            reason: "550".to_string(),
        }];
        for i in 0..9 {
            outcomes.push(DeliveryOutcome::Accepted {
                provider_message_id: format!("id-{}", i),
            });
        }
        let provider = MockProvider::new(outcomes);

        let report = sender
            .drain(&world.controller, &world.campaign.id, &provider)
            .await
            .unwrap();

        assert_eq!(report.bounced, 1);
        assert!(!report.auto_paused);
        assert!(report.completed);
    }

    #[tokio::test]
    async fn transient_failures_can_be_retried_but_bounces_cannot() {
        let world = running_campaign(3, 100).await;
        let sender = sender(&world.pool, 10);

        let provider = MockProvider::new(vec![
            DeliveryOutcome::Failed {
                reason: "timeout".to_string(),
            },
            DeliveryOutcome::Bounced {
                reason: "550".to_string(),
            },
            DeliveryOutcome::Accepted {
                provider_message_id: "id-1".to_string(),
            },
        ]);

        // 2/3 bounce+fail: bounce rate is 1/3 > 20%, campaign auto-pauses
        let report = sender
            .drain(&world.controller, &world.campaign.id, &provider)
            .await
            .unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.bounced, 1);
        assert!(report.auto_paused);

        let requeued = sender.retry_failed(&world.campaign.id).await.unwrap();
        assert_eq!(requeued, 1);
        assert_eq!(status_count(&world, MessageStatus::Pending).await, 1);
        assert_eq!(status_count(&world, MessageStatus::Bounced).await, 1);
    }

    #[tokio::test]
    async fn paused_campaigns_are_not_drained() {
        let world = running_campaign(2, 100).await;
        let sender = sender(&world.pool, 10);
        let provider = MockProvider::accepting();

        world.controller.pause(&world.campaign.id).await.unwrap();

        let err = sender
            .drain(&world.controller, &world.campaign.id, &provider)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not running"));
        assert_eq!(provider.dispatch_count(), 0);
        assert_eq!(status_count(&world, MessageStatus::Pending).await, 2);
    }
}
