use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{config::Config, database::DbPool, engine::OutreachEngine};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Where a lead entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadOrigin {
    Manual,
    CsvImport,
    Api,
    Research,
}

impl LeadOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadOrigin::Manual => "manual",
            LeadOrigin::CsvImport => "csv_import",
            LeadOrigin::Api => "api",
            LeadOrigin::Research => "research",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(LeadOrigin::Manual),
            "csv_import" => Some(LeadOrigin::CsvImport),
            "api" => Some(LeadOrigin::Api),
            "research" => Some(LeadOrigin::Research),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Responded,
    Qualified,
    Converted,
    Dead,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Responded => "responded",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
            LeadStatus::Dead => "dead",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(LeadStatus::New),
            "contacted" => Some(LeadStatus::Contacted),
            "responded" => Some(LeadStatus::Responded),
            "qualified" => Some(LeadStatus::Qualified),
            "converted" => Some(LeadStatus::Converted),
            "dead" => Some(LeadStatus::Dead),
            _ => None,
        }
    }
}

/// A contact record eligible for outreach. One type for every origin; the
/// `origin` discriminant replaces parallel per-context lead shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub workspace: String,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub position: Option<String>,
    pub industry: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub linkedin_url: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub origin: LeadOrigin,
    pub status: LeadStatus,
    pub segment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_contacted_at: Option<DateTime<Utc>>,
}

impl Lead {
    pub fn new(workspace: &str, name: &str, email: &str, origin: LeadOrigin) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workspace: workspace.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            company: None,
            position: None,
            industry: None,
            phone: None,
            website: None,
            linkedin_url: None,
            location: None,
            notes: None,
            origin,
            status: LeadStatus::New,
            segment_id: None,
            created_at: Utc::now(),
            last_contacted_at: None,
        }
    }
}

/// A named, colored grouping of leads used for campaign targeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub workspace: String,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-campaign sending policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendingPolicy {
    pub delay_between_emails: u64,
    pub max_emails_per_day: u32,
    pub track_opens: bool,
    pub track_clicks: bool,
    pub follow_up_enabled: bool,
    pub follow_up_days: u32,
    pub personalization_enabled: bool,
}

impl Default for SendingPolicy {
    fn default() -> Self {
        Self {
            delay_between_emails: 3,
            max_emails_per_day: 200,
            track_opens: true,
            track_clicks: true,
            follow_up_enabled: false,
            follow_up_days: 3,
            personalization_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub workspace: String,
    pub name: String,
    pub description: Option<String>,
    pub subject_template: String,
    pub body_template: String,
    pub segment_id: Option<String>,
    pub status: crate::campaign::CampaignStatus,
    pub send_immediately: bool,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub policy: SendingPolicy,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Sent,
    Delivered,
    Opened,
    Clicked,
    Replied,
    Bounced,
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Opened => "opened",
            MessageStatus::Clicked => "clicked",
            MessageStatus::Replied => "replied",
            MessageStatus::Bounced => "bounced",
            MessageStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MessageStatus::Pending),
            "sent" => Some(MessageStatus::Sent),
            "delivered" => Some(MessageStatus::Delivered),
            "opened" => Some(MessageStatus::Opened),
            "clicked" => Some(MessageStatus::Clicked),
            "replied" => Some(MessageStatus::Replied),
            "bounced" => Some(MessageStatus::Bounced),
            "failed" => Some(MessageStatus::Failed),
            _ => None,
        }
    }
}

/// One rendered, trackable instance of a campaign's template for one lead.
/// At most one row per (campaign, lead), enforced by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachMessage {
    pub id: String,
    pub campaign_id: String,
    pub lead_id: Option<String>,
    pub subject: String,
    pub body: String,
    pub status: MessageStatus,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub opened_at: Option<DateTime<Utc>>,
    pub clicked_at: Option<DateTime<Utc>>,
    pub replied_at: Option<DateTime<Utc>>,
    pub bounced_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
}

/// Audit record of one CSV ingestion run. Written once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub id: String,
    pub workspace: String,
    pub file_name: String,
    pub column_mapping: std::collections::HashMap<String, usize>,
    pub segment_id: Option<String>,
    pub total_rows: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub imported_at: DateTime<Utc>,
}

pub struct CliApp {
    pub config: Config,
    pub db_pool: DbPool,
    pub engine: OutreachEngine,
}
