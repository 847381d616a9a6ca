// src/analytics.rs
use chrono::Utc;
use serde::Serialize;

use crate::database::{self, DbPool};
use crate::models::{MessageStatus, Result};

/// Read-only rates derived from a campaign's message log. Consumes the
/// engine's output; plays no part in its invariants.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignStats {
    pub total_messages: i64,
    pub pending: i64,
    pub sent: i64,
    pub delivered: i64,
    pub opened: i64,
    pub clicked: i64,
    pub replied: i64,
    pub bounced: i64,
    pub failed: i64,
    pub open_rate: f64,
    pub click_rate: f64,
    pub reply_rate: f64,
    pub bounce_rate: f64,
}

pub async fn campaign_stats(pool: &DbPool, campaign_id: &str) -> Result<CampaignStats> {
    let messages = database::list_campaign_messages(pool, campaign_id).await?;

    let mut stats = CampaignStats {
        total_messages: messages.len() as i64,
        pending: 0,
        sent: 0,
        delivered: 0,
        opened: 0,
        clicked: 0,
        replied: 0,
        bounced: 0,
        failed: 0,
        open_rate: 0.0,
        click_rate: 0.0,
        reply_rate: 0.0,
        bounce_rate: 0.0,
    };

    for message in &messages {
        match message.status {
            MessageStatus::Pending => stats.pending += 1,
            MessageStatus::Sent => stats.sent += 1,
            MessageStatus::Delivered => stats.delivered += 1,
            MessageStatus::Opened => stats.opened += 1,
            MessageStatus::Clicked => stats.clicked += 1,
            MessageStatus::Replied => stats.replied += 1,
            MessageStatus::Bounced => stats.bounced += 1,
            MessageStatus::Failed => stats.failed += 1,
        }
    }

    // A message whose status advanced past `sent` still counts as sent for
    // rate purposes; the timestamps record which milestones it reached.
    let ever_sent = messages.iter().filter(|m| m.sent_at.is_some()).count() as f64;
    if ever_sent > 0.0 {
        let opened = messages.iter().filter(|m| m.opened_at.is_some()).count() as f64;
        let clicked = messages.iter().filter(|m| m.clicked_at.is_some()).count() as f64;
        let replied = messages.iter().filter(|m| m.replied_at.is_some()).count() as f64;
        stats.open_rate = opened / ever_sent * 100.0;
        stats.click_rate = clicked / ever_sent * 100.0;
        stats.reply_rate = replied / ever_sent * 100.0;
    }
    let attempted = messages
        .iter()
        .filter(|m| m.sent_at.is_some() || m.bounced_at.is_some())
        .count() as f64;
    if attempted > 0.0 {
        let bounced = messages.iter().filter(|m| m.bounced_at.is_some()).count() as f64;
        stats.bounce_rate = bounced / attempted * 100.0;
    }

    Ok(stats)
}

/// Post-send milestones a provider can report back for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementEvent {
    Delivered,
    Opened,
    Clicked,
    Replied,
}

impl EngagementEvent {
    fn status(&self) -> MessageStatus {
        match self {
            EngagementEvent::Delivered => MessageStatus::Delivered,
            EngagementEvent::Opened => MessageStatus::Opened,
            EngagementEvent::Clicked => MessageStatus::Clicked,
            EngagementEvent::Replied => MessageStatus::Replied,
        }
    }

    fn timestamp_column(&self) -> &'static str {
        match self {
            EngagementEvent::Delivered => "delivered_at",
            EngagementEvent::Opened => "opened_at",
            EngagementEvent::Clicked => "clicked_at",
            EngagementEvent::Replied => "replied_at",
        }
    }

    /// Milestone ordering; a message only moves forward.
    fn rank(status: MessageStatus) -> Option<u8> {
        match status {
            MessageStatus::Sent => Some(0),
            MessageStatus::Delivered => Some(1),
            MessageStatus::Opened => Some(2),
            MessageStatus::Clicked => Some(3),
            MessageStatus::Replied => Some(4),
            _ => None,
        }
    }
}

/// Advance a message along the post-send milestones. Events for messages
/// that were never sent (or already regressed to bounced/failed) are
/// ignored. A late lower-ranked event never rewinds the status, though its
/// timestamp is recorded.
pub async fn record_engagement(
    pool: &DbPool,
    message_id: &str,
    event: EngagementEvent,
) -> Result<bool> {
    let message = database::get_message(pool, message_id)
        .await?
        .ok_or("message not found")?;

    let Some(current_rank) = EngagementEvent::rank(message.status) else {
        return Ok(false);
    };
    let event_rank = EngagementEvent::rank(event.status()).unwrap_or(0);

    let next_status = if event_rank > current_rank {
        event.status()
    } else {
        message.status
    };

    database::update_message_engagement(
        pool,
        message_id,
        next_status,
        event.timestamp_column(),
        Utc::now(),
    )
    .await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_db_pool;
    use crate::models::OutreachMessage;
    use tempfile::TempDir;

    async fn test_pool() -> (TempDir, DbPool) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        let pool = create_db_pool(db_path.to_str().unwrap()).await.unwrap();
        (dir, pool)
    }

    async fn seed_message(pool: &DbPool, lead: &str) -> OutreachMessage {
        let message = OutreachMessage {
            id: uuid::Uuid::new_v4().to_string(),
            campaign_id: "camp-1".to_string(),
            lead_id: Some(lead.to_string()),
            subject: "s".to_string(),
            body: "b".to_string(),
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
        database::insert_message_if_absent(pool, &message)
            .await
            .unwrap();
        message
    }

    #[tokio::test]
    async fn engagement_advances_but_never_rewinds() {
        let (_dir, pool) = test_pool().await;
        let message = seed_message(&pool, "lead-1").await;
        database::mark_message_sent(&pool, &message.id, "prov-1", Utc::now())
            .await
            .unwrap();

        assert!(record_engagement(&pool, &message.id, EngagementEvent::Opened)
            .await
            .unwrap());
        let stored = database::get_message(&pool, &message.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Opened);
        assert!(stored.opened_at.is_some());

        // delivery confirmation arriving late keeps the higher milestone
        assert!(
            record_engagement(&pool, &message.id, EngagementEvent::Delivered)
                .await
                .unwrap()
        );
        let stored = database::get_message(&pool, &message.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Opened);
        assert!(stored.delivered_at.is_some());
    }

    #[tokio::test]
    async fn engagement_for_unsent_messages_is_ignored() {
        let (_dir, pool) = test_pool().await;
        let message = seed_message(&pool, "lead-1").await;

        let applied = record_engagement(&pool, &message.id, EngagementEvent::Opened)
            .await
            .unwrap();
        assert!(!applied);
        let stored = database::get_message(&pool, &message.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Pending);
    }

    #[tokio::test]
    async fn stats_rates_use_timestamps_not_latest_status() {
        let (_dir, pool) = test_pool().await;

        let m1 = seed_message(&pool, "lead-1").await;
        let m2 = seed_message(&pool, "lead-2").await;
        let m3 = seed_message(&pool, "lead-3").await;
        let m4 = seed_message(&pool, "lead-4").await;

        let now = Utc::now();
        database::mark_message_sent(&pool, &m1.id, "p1", now).await.unwrap();
        database::mark_message_sent(&pool, &m2.id, "p2", now).await.unwrap();
        database::mark_message_sent(&pool, &m3.id, "p3", now).await.unwrap();
        database::mark_message_bounced(&pool, &m4.id, "550", now).await.unwrap();

        record_engagement(&pool, &m1.id, EngagementEvent::Opened).await.unwrap();
        record_engagement(&pool, &m1.id, EngagementEvent::Replied).await.unwrap();

        let stats = campaign_stats(&pool, "camp-1").await.unwrap();
        assert_eq!(stats.total_messages, 4);
        assert_eq!(stats.bounced, 1);
        // 3 ever sent, 1 opened, 1 replied
        assert!((stats.open_rate - 33.33).abs() < 0.5);
        assert!((stats.reply_rate - 33.33).abs() < 0.5);
        // 4 attempted, 1 bounced
        assert!((stats.bounce_rate - 25.0).abs() < 0.01);
    }
}
