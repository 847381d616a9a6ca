use chrono::{DateTime, Utc};
use mobc::{Manager, Pool};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::path::Path;
use tracing::{debug, error, info};

use crate::models::{
    Campaign, ImportBatch, Lead, LeadOrigin, LeadStatus, MessageStatus, OutreachMessage, Segment,
    SendingPolicy,
};

fn log_rusqlite_error(context: &str, err: &rusqlite::Error) {
    error!("SQLite error in {}: {:?}", context, err);
}

pub struct SqliteManager {
    db_path: String,
}

impl SqliteManager {
    pub fn new(db_path: String) -> Self {
        debug!("Creating SqliteManager for path: {}", db_path);
        Self { db_path }
    }
}

#[async_trait::async_trait]
impl Manager for SqliteManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        debug!("Opening database: {}", self.db_path);
        let conn = Connection::open(&self.db_path)?;

        // Some PRAGMA statements return a result row; fall back to query_row.
        let exec_pragma =
            |conn: &Connection, pragma: &str| -> Result<(), rusqlite::Error> {
                match conn.execute(pragma, []) {
                    Ok(_) => Ok(()),
                    Err(rusqlite::Error::ExecuteReturnedResults) => {
                        conn.query_row(pragma, [], |_| Ok(())).map(|_| ())
                    }
                    Err(e) => Err(e),
                }
            };

        exec_pragma(&conn, "PRAGMA journal_mode=WAL")?;
        exec_pragma(&conn, "PRAGMA synchronous=NORMAL")?;
        exec_pragma(&conn, "PRAGMA foreign_keys=OFF")?;
        exec_pragma(&conn, "PRAGMA temp_store=memory")?;

        if let Err(e) = init_database(&conn) {
            log_rusqlite_error("init_database", &e);
            return Err(e);
        }

        Ok(conn)
    }

    async fn check(&self, conn: Self::Connection) -> Result<Self::Connection, Self::Error> {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(conn)
    }
}

fn init_database(conn: &Connection) -> SqliteResult<()> {
    debug!("init_database() - creating tables and indexes...");

    create_leads_table(conn)?;
    create_segments_table(conn)?;
    create_campaigns_table(conn)?;
    create_messages_table(conn)?;
    create_import_batches_table(conn)?;
    create_indexes(conn)?;

    Ok(())
}

pub type DbPool = Pool<SqliteManager>;

pub async fn create_db_pool(
    db_path: &str,
) -> Result<DbPool, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(parent) = Path::new(db_path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let manager = SqliteManager::new(db_path.to_string());
    let pool = Pool::builder().max_open(10).max_idle(5).build(manager);

    info!("✓ SQLite connection pool created: {}", db_path);
    Ok(pool)
}

fn create_leads_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            id TEXT PRIMARY KEY,
            workspace TEXT NOT NULL,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            company TEXT,
            position TEXT,
            industry TEXT,
            phone TEXT,
            website TEXT,
            linkedin_url TEXT,
            location TEXT,
            notes TEXT,
            origin TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'new',
            segment_id TEXT,
            created_at TEXT NOT NULL,
            last_contacted_at TEXT,
            UNIQUE(email, workspace)
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_segments_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS segments (
            id TEXT PRIMARY KEY,
            workspace TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            color TEXT NOT NULL,
            created_by TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(name, workspace)
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_campaigns_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS campaigns (
            id TEXT PRIMARY KEY,
            workspace TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            subject_template TEXT NOT NULL DEFAULT '',
            body_template TEXT NOT NULL DEFAULT '',
            segment_id TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            send_immediately INTEGER NOT NULL DEFAULT 1,
            scheduled_at TEXT,
            delay_between_emails INTEGER NOT NULL DEFAULT 3,
            max_emails_per_day INTEGER NOT NULL DEFAULT 200,
            track_opens INTEGER NOT NULL DEFAULT 1,
            track_clicks INTEGER NOT NULL DEFAULT 1,
            follow_up_enabled INTEGER NOT NULL DEFAULT 0,
            follow_up_days INTEGER NOT NULL DEFAULT 3,
            personalization_enabled INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_messages_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS outreach_messages (
            id TEXT PRIMARY KEY,
            campaign_id TEXT NOT NULL,
            lead_id TEXT,
            subject TEXT NOT NULL,
            body TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            provider_message_id TEXT,
            error TEXT,
            created_at TEXT NOT NULL,
            sent_at TEXT,
            delivered_at TEXT,
            opened_at TEXT,
            clicked_at TEXT,
            replied_at TEXT,
            bounced_at TEXT,
            failed_at TEXT,
            UNIQUE(campaign_id, lead_id)
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_import_batches_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS import_batches (
            id TEXT PRIMARY KEY,
            workspace TEXT NOT NULL,
            file_name TEXT NOT NULL,
            column_mapping TEXT NOT NULL,
            segment_id TEXT,
            total_rows INTEGER NOT NULL,
            succeeded INTEGER NOT NULL,
            failed INTEGER NOT NULL,
            errors TEXT NOT NULL,
            imported_at TEXT NOT NULL
        )
        "#,
        [],
    )?;
    Ok(())
}

fn create_indexes(conn: &Connection) -> SqliteResult<()> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_leads_workspace ON leads(workspace)",
        "CREATE INDEX IF NOT EXISTS idx_leads_email ON leads(email)",
        "CREATE INDEX IF NOT EXISTS idx_leads_segment ON leads(segment_id)",
        "CREATE INDEX IF NOT EXISTS idx_leads_status ON leads(status)",
        "CREATE INDEX IF NOT EXISTS idx_segments_workspace ON segments(workspace)",
        "CREATE INDEX IF NOT EXISTS idx_campaigns_workspace ON campaigns(workspace)",
        "CREATE INDEX IF NOT EXISTS idx_campaigns_status ON campaigns(status)",
        "CREATE INDEX IF NOT EXISTS idx_messages_campaign ON outreach_messages(campaign_id)",
        "CREATE INDEX IF NOT EXISTS idx_messages_status ON outreach_messages(campaign_id, status)",
        "CREATE INDEX IF NOT EXISTS idx_messages_sent_at ON outreach_messages(campaign_id, sent_at)",
        "CREATE INDEX IF NOT EXISTS idx_import_batches_workspace ON import_batches(workspace)",
    ];

    for (i, index_sql) in indexes.iter().enumerate() {
        if let Err(e) = conn.execute(index_sql, []) {
            log_rusqlite_error(&format!("create index {}", i + 1), &e);
            return Err(e);
        }
    }

    Ok(())
}

// --- row mapping helpers ---

fn parse_dt(idx: usize, s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| rusqlite::Error::InvalidColumnType(idx, s, rusqlite::types::Type::Text))
}

fn parse_opt_dt(idx: usize, s: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_dt(idx, s)?)),
        _ => Ok(None),
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.is_empty())
}

const LEAD_COLUMNS: &str = "id, workspace, name, email, company, position, industry, phone, \
     website, linkedin_url, location, notes, origin, status, segment_id, created_at, \
     last_contacted_at";

fn lead_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Lead> {
    let origin_str: String = row.get(12)?;
    let status_str: String = row.get(13)?;
    Ok(Lead {
        id: row.get(0)?,
        workspace: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        company: non_empty(row.get(4)?),
        position: non_empty(row.get(5)?),
        industry: non_empty(row.get(6)?),
        phone: non_empty(row.get(7)?),
        website: non_empty(row.get(8)?),
        linkedin_url: non_empty(row.get(9)?),
        location: non_empty(row.get(10)?),
        notes: non_empty(row.get(11)?),
        origin: LeadOrigin::parse(&origin_str).unwrap_or(LeadOrigin::Manual),
        status: LeadStatus::parse(&status_str).unwrap_or(LeadStatus::New),
        segment_id: non_empty(row.get(14)?),
        created_at: parse_dt(15, row.get(15)?)?,
        last_contacted_at: parse_opt_dt(16, row.get(16)?)?,
    })
}

const CAMPAIGN_COLUMNS: &str = "id, workspace, name, description, subject_template, \
     body_template, segment_id, status, send_immediately, scheduled_at, delay_between_emails, \
     max_emails_per_day, track_opens, track_clicks, follow_up_enabled, follow_up_days, \
     personalization_enabled, created_at, updated_at";

fn campaign_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Campaign> {
    let status_str: String = row.get(7)?;
    Ok(Campaign {
        id: row.get(0)?,
        workspace: row.get(1)?,
        name: row.get(2)?,
        description: non_empty(row.get(3)?),
        subject_template: row.get(4)?,
        body_template: row.get(5)?,
        segment_id: non_empty(row.get(6)?),
        status: crate::campaign::CampaignStatus::parse(&status_str)
            .unwrap_or(crate::campaign::CampaignStatus::Draft),
        send_immediately: row.get(8)?,
        scheduled_at: parse_opt_dt(9, row.get(9)?)?,
        policy: SendingPolicy {
            delay_between_emails: row.get::<_, i64>(10)? as u64,
            max_emails_per_day: row.get::<_, i64>(11)? as u32,
            track_opens: row.get(12)?,
            track_clicks: row.get(13)?,
            follow_up_enabled: row.get(14)?,
            follow_up_days: row.get::<_, i64>(15)? as u32,
            personalization_enabled: row.get(16)?,
        },
        created_at: parse_dt(17, row.get(17)?)?,
        updated_at: parse_dt(18, row.get(18)?)?,
    })
}

const MESSAGE_COLUMNS: &str = "id, campaign_id, lead_id, subject, body, status, \
     provider_message_id, error, created_at, sent_at, delivered_at, opened_at, clicked_at, \
     replied_at, bounced_at, failed_at";

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<OutreachMessage> {
    let status_str: String = row.get(5)?;
    Ok(OutreachMessage {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        lead_id: non_empty(row.get(2)?),
        subject: row.get(3)?,
        body: row.get(4)?,
        status: MessageStatus::parse(&status_str).unwrap_or(MessageStatus::Pending),
        provider_message_id: non_empty(row.get(6)?),
        error: non_empty(row.get(7)?),
        created_at: parse_dt(8, row.get(8)?)?,
        sent_at: parse_opt_dt(9, row.get(9)?)?,
        delivered_at: parse_opt_dt(10, row.get(10)?)?,
        opened_at: parse_opt_dt(11, row.get(11)?)?,
        clicked_at: parse_opt_dt(12, row.get(12)?)?,
        replied_at: parse_opt_dt(13, row.get(13)?)?,
        bounced_at: parse_opt_dt(14, row.get(14)?)?,
        failed_at: parse_opt_dt(15, row.get(15)?)?,
    })
}

// --- leads ---

/// Upsert keyed on (email, workspace). Re-importing the same email updates
/// the existing lead's non-identity fields; id, origin, status and
/// created_at stay with the first record.
pub async fn upsert_lead(
    pool: &DbPool,
    lead: &Lead,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    debug!("upsert_lead() - {} ({})", lead.email, lead.workspace);

    let conn = pool.get().await?;

    match conn.execute(
        r#"
        INSERT INTO leads (
            id, workspace, name, email, company, position, industry, phone, website,
            linkedin_url, location, notes, origin, status, segment_id, created_at,
            last_contacted_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        ON CONFLICT (email, workspace) DO UPDATE SET
            name = COALESCE(NULLIF(excluded.name, ''), name),
            company = COALESCE(NULLIF(excluded.company, ''), company),
            position = COALESCE(NULLIF(excluded.position, ''), position),
            industry = COALESCE(NULLIF(excluded.industry, ''), industry),
            phone = COALESCE(NULLIF(excluded.phone, ''), phone),
            website = COALESCE(NULLIF(excluded.website, ''), website),
            linkedin_url = COALESCE(NULLIF(excluded.linkedin_url, ''), linkedin_url),
            location = COALESCE(NULLIF(excluded.location, ''), location),
            notes = COALESCE(NULLIF(excluded.notes, ''), notes),
            segment_id = COALESCE(NULLIF(excluded.segment_id, ''), segment_id)
        "#,
        params![
            lead.id,
            lead.workspace,
            lead.name,
            lead.email,
            lead.company.as_deref().unwrap_or(""),
            lead.position.as_deref().unwrap_or(""),
            lead.industry.as_deref().unwrap_or(""),
            lead.phone.as_deref().unwrap_or(""),
            lead.website.as_deref().unwrap_or(""),
            lead.linkedin_url.as_deref().unwrap_or(""),
            lead.location.as_deref().unwrap_or(""),
            lead.notes.as_deref().unwrap_or(""),
            lead.origin.as_str(),
            lead.status.as_str(),
            lead.segment_id.as_deref().unwrap_or(""),
            lead.created_at.to_rfc3339(),
            lead.last_contacted_at.map(|t| t.to_rfc3339()),
        ],
    ) {
        Ok(_) => Ok(()),
        Err(e) => {
            log_rusqlite_error("upsert_lead", &e);
            Err(Box::new(e))
        }
    }
}

pub async fn get_lead(
    pool: &DbPool,
    lead_id: &str,
) -> Result<Option<Lead>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let query = format!("SELECT {} FROM leads WHERE id = ?", LEAD_COLUMNS);
    let mut stmt = conn.prepare(&query)?;
    let mut rows = stmt.query_map([lead_id], lead_from_row)?;
    match rows.next() {
        Some(lead) => Ok(Some(lead?)),
        None => Ok(None),
    }
}

pub async fn get_lead_by_email(
    pool: &DbPool,
    workspace: &str,
    email: &str,
) -> Result<Option<Lead>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let query = format!(
        "SELECT {} FROM leads WHERE email = ? AND workspace = ?",
        LEAD_COLUMNS
    );
    let mut stmt = conn.prepare(&query)?;
    let mut rows = stmt.query_map([email, workspace], lead_from_row)?;
    match rows.next() {
        Some(lead) => Ok(Some(lead?)),
        None => Ok(None),
    }
}

pub async fn list_leads(
    pool: &DbPool,
    workspace: &str,
    limit: usize,
    offset: usize,
) -> Result<Vec<Lead>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let query = format!(
        "SELECT {} FROM leads WHERE workspace = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
        LEAD_COLUMNS
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map(
        params![workspace, limit as i64, offset as i64],
        lead_from_row,
    )?;

    let mut leads = Vec::new();
    for lead in rows {
        leads.push(lead?);
    }
    Ok(leads)
}

pub async fn count_leads(
    pool: &DbPool,
    workspace: &str,
) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM leads WHERE workspace = ?",
        [workspace],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub async fn leads_in_segment(
    pool: &DbPool,
    segment_id: &str,
) -> Result<Vec<Lead>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let query = format!(
        "SELECT {} FROM leads WHERE segment_id = ? ORDER BY created_at ASC",
        LEAD_COLUMNS
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map([segment_id], lead_from_row)?;

    let mut leads = Vec::new();
    for lead in rows {
        leads.push(lead?);
    }
    Ok(leads)
}

pub async fn update_lead_status(
    pool: &DbPool,
    lead_id: &str,
    status: LeadStatus,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    conn.execute(
        "UPDATE leads SET status = ?1 WHERE id = ?2",
        params![status.as_str(), lead_id],
    )?;
    Ok(())
}

/// Stamp the first successful send: last_contacted_at always, status only
/// if the lead was still untouched.
pub async fn mark_lead_contacted(
    pool: &DbPool,
    lead_id: &str,
    at: DateTime<Utc>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    conn.execute(
        r#"
        UPDATE leads SET
            last_contacted_at = COALESCE(last_contacted_at, ?1),
            status = CASE WHEN status = 'new' THEN 'contacted' ELSE status END
        WHERE id = ?2
        "#,
        params![at.to_rfc3339(), lead_id],
    )?;
    Ok(())
}

/// Leads are never cascaded away: dependent messages keep their row with
/// the lead reference cleared.
pub async fn delete_lead(
    pool: &DbPool,
    lead_id: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    conn.execute(
        "UPDATE outreach_messages SET lead_id = NULL WHERE lead_id = ?1",
        params![lead_id],
    )?;
    conn.execute("DELETE FROM leads WHERE id = ?1", params![lead_id])?;
    Ok(())
}

// --- segments ---

pub async fn insert_segment(
    pool: &DbPool,
    segment: &Segment,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    conn.execute(
        r#"
        INSERT INTO segments (id, workspace, name, description, color, created_by, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT (name, workspace) DO UPDATE SET
            description = COALESCE(NULLIF(excluded.description, ''), description),
            color = excluded.color,
            updated_at = excluded.updated_at
        "#,
        params![
            segment.id,
            segment.workspace,
            segment.name,
            segment.description.as_deref().unwrap_or(""),
            segment.color,
            segment.created_by.as_deref().unwrap_or(""),
            segment.created_at.to_rfc3339(),
            segment.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn segment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Segment> {
    Ok(Segment {
        id: row.get(0)?,
        workspace: row.get(1)?,
        name: row.get(2)?,
        description: non_empty(row.get(3)?),
        color: row.get(4)?,
        created_by: non_empty(row.get(5)?),
        created_at: parse_dt(6, row.get(6)?)?,
        updated_at: parse_dt(7, row.get(7)?)?,
    })
}

pub async fn get_segment(
    pool: &DbPool,
    segment_id: &str,
) -> Result<Option<Segment>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let mut stmt = conn.prepare(
        "SELECT id, workspace, name, description, color, created_by, created_at, updated_at
         FROM segments WHERE id = ?",
    )?;
    let mut rows = stmt.query_map([segment_id], segment_from_row)?;
    match rows.next() {
        Some(segment) => Ok(Some(segment?)),
        None => Ok(None),
    }
}

pub async fn list_segments(
    pool: &DbPool,
    workspace: &str,
) -> Result<Vec<Segment>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let mut stmt = conn.prepare(
        "SELECT id, workspace, name, description, color, created_by, created_at, updated_at
         FROM segments WHERE workspace = ? ORDER BY name ASC",
    )?;
    let rows = stmt.query_map([workspace], segment_from_row)?;

    let mut segments = Vec::new();
    for segment in rows {
        segments.push(segment?);
    }
    Ok(segments)
}

pub async fn count_segment_members(
    pool: &DbPool,
    segment_id: &str,
) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM leads WHERE segment_id = ?",
        [segment_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Deleting a segment clears references instead of cascading into leads or
/// campaigns.
pub async fn delete_segment(
    pool: &DbPool,
    segment_id: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    conn.execute(
        "UPDATE leads SET segment_id = NULL WHERE segment_id = ?1",
        params![segment_id],
    )?;
    conn.execute(
        "UPDATE campaigns SET segment_id = NULL WHERE segment_id = ?1",
        params![segment_id],
    )?;
    conn.execute("DELETE FROM segments WHERE id = ?1", params![segment_id])?;
    Ok(())
}

pub async fn assign_lead_to_segment(
    pool: &DbPool,
    lead_id: &str,
    segment_id: Option<&str>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    conn.execute(
        "UPDATE leads SET segment_id = ?1 WHERE id = ?2",
        params![segment_id.unwrap_or(""), lead_id],
    )?;
    Ok(())
}

// --- campaigns ---

pub async fn upsert_campaign(
    pool: &DbPool,
    campaign: &Campaign,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    debug!("upsert_campaign() - {} ({})", campaign.name, campaign.id);

    let conn = pool.get().await?;
    conn.execute(
        r#"
        INSERT INTO campaigns (
            id, workspace, name, description, subject_template, body_template, segment_id,
            status, send_immediately, scheduled_at, delay_between_emails, max_emails_per_day,
            track_opens, track_clicks, follow_up_enabled, follow_up_days,
            personalization_enabled, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
        ON CONFLICT (id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            subject_template = excluded.subject_template,
            body_template = excluded.body_template,
            segment_id = excluded.segment_id,
            send_immediately = excluded.send_immediately,
            scheduled_at = excluded.scheduled_at,
            delay_between_emails = excluded.delay_between_emails,
            max_emails_per_day = excluded.max_emails_per_day,
            track_opens = excluded.track_opens,
            track_clicks = excluded.track_clicks,
            follow_up_enabled = excluded.follow_up_enabled,
            follow_up_days = excluded.follow_up_days,
            personalization_enabled = excluded.personalization_enabled,
            updated_at = excluded.updated_at
        "#,
        params![
            campaign.id,
            campaign.workspace,
            campaign.name,
            campaign.description.as_deref().unwrap_or(""),
            campaign.subject_template,
            campaign.body_template,
            campaign.segment_id.as_deref().unwrap_or(""),
            campaign.status.as_str(),
            campaign.send_immediately,
            campaign.scheduled_at.map(|t| t.to_rfc3339()),
            campaign.policy.delay_between_emails as i64,
            campaign.policy.max_emails_per_day as i64,
            campaign.policy.track_opens,
            campaign.policy.track_clicks,
            campaign.policy.follow_up_enabled,
            campaign.policy.follow_up_days as i64,
            campaign.policy.personalization_enabled,
            campaign.created_at.to_rfc3339(),
            campaign.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub async fn get_campaign(
    pool: &DbPool,
    campaign_id: &str,
) -> Result<Option<Campaign>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let query = format!("SELECT {} FROM campaigns WHERE id = ?", CAMPAIGN_COLUMNS);
    let mut stmt = conn.prepare(&query)?;
    let mut rows = stmt.query_map([campaign_id], campaign_from_row)?;
    match rows.next() {
        Some(campaign) => Ok(Some(campaign?)),
        None => Ok(None),
    }
}

pub async fn list_campaigns(
    pool: &DbPool,
    workspace: &str,
) -> Result<Vec<Campaign>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let query = format!(
        "SELECT {} FROM campaigns WHERE workspace = ? ORDER BY created_at DESC",
        CAMPAIGN_COLUMNS
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map([workspace], campaign_from_row)?;

    let mut campaigns = Vec::new();
    for campaign in rows {
        campaigns.push(campaign?);
    }
    Ok(campaigns)
}

/// Conditional status update: succeeds only when the row is still in the
/// expected `from` state, so concurrent drains cannot double-apply a
/// transition.
pub async fn update_campaign_status(
    pool: &DbPool,
    campaign_id: &str,
    from: crate::campaign::CampaignStatus,
    to: crate::campaign::CampaignStatus,
) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let changed = conn.execute(
        "UPDATE campaigns SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![
            to.as_str(),
            Utc::now().to_rfc3339(),
            campaign_id,
            from.as_str()
        ],
    )?;
    Ok(changed > 0)
}

// --- outreach messages ---

/// Insert a rendered message unless one already exists for this
/// (campaign, lead) pair. Returns true when a row was actually created;
/// this is the generation-idempotency primitive.
pub async fn insert_message_if_absent(
    pool: &DbPool,
    message: &OutreachMessage,
) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let inserted = conn.execute(
        r#"
        INSERT INTO outreach_messages (id, campaign_id, lead_id, subject, body, status, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (campaign_id, lead_id) DO NOTHING
        "#,
        params![
            message.id,
            message.campaign_id,
            message.lead_id,
            message.subject,
            message.body,
            message.status.as_str(),
            message.created_at.to_rfc3339(),
        ],
    )?;
    Ok(inserted > 0)
}

/// Oldest-first pending slice for one campaign. The selection order
/// guarantees fairness and eventual completion.
pub async fn pending_messages(
    pool: &DbPool,
    campaign_id: &str,
    limit: usize,
) -> Result<Vec<OutreachMessage>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let query = format!(
        "SELECT {} FROM outreach_messages
         WHERE campaign_id = ? AND status = 'pending'
         ORDER BY created_at ASC LIMIT ?",
        MESSAGE_COLUMNS
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map(params![campaign_id, limit as i64], message_from_row)?;

    let mut messages = Vec::new();
    for message in rows {
        messages.push(message?);
    }
    Ok(messages)
}

pub async fn count_messages_with_status(
    pool: &DbPool,
    campaign_id: &str,
    status: MessageStatus,
) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM outreach_messages WHERE campaign_id = ? AND status = ?",
        params![campaign_id, status.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Messages sent within the trailing 24 hours, the rolling-day cap window.
pub async fn count_sent_in_window(
    pool: &DbPool,
    campaign_id: &str,
    now: DateTime<Utc>,
) -> Result<i64, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let window_start = (now - chrono::Duration::hours(24)).to_rfc3339();
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM outreach_messages
         WHERE campaign_id = ?1 AND sent_at IS NOT NULL AND sent_at >= ?2",
        params![campaign_id, window_start],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub async fn mark_message_sent(
    pool: &DbPool,
    message_id: &str,
    provider_message_id: &str,
    at: DateTime<Utc>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    conn.execute(
        "UPDATE outreach_messages
         SET status = 'sent', provider_message_id = ?1, sent_at = ?2, error = NULL
         WHERE id = ?3",
        params![provider_message_id, at.to_rfc3339(), message_id],
    )?;
    Ok(())
}

pub async fn mark_message_bounced(
    pool: &DbPool,
    message_id: &str,
    reason: &str,
    at: DateTime<Utc>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    conn.execute(
        "UPDATE outreach_messages
         SET status = 'bounced', error = ?1, bounced_at = ?2
         WHERE id = ?3",
        params![reason, at.to_rfc3339(), message_id],
    )?;
    Ok(())
}

pub async fn mark_message_failed(
    pool: &DbPool,
    message_id: &str,
    reason: &str,
    at: DateTime<Utc>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    conn.execute(
        "UPDATE outreach_messages
         SET status = 'failed', error = ?1, failed_at = ?2
         WHERE id = ?3",
        params![reason, at.to_rfc3339(), message_id],
    )?;
    Ok(())
}

/// Re-queue transient failures for another attempt. Permanent bounces stay
/// where they are.
pub async fn requeue_failed_messages(
    pool: &DbPool,
    campaign_id: &str,
) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let changed = conn.execute(
        "UPDATE outreach_messages
         SET status = 'pending', error = NULL, failed_at = NULL
         WHERE campaign_id = ?1 AND status = 'failed'",
        params![campaign_id],
    )?;
    Ok(changed)
}

pub async fn list_campaign_messages(
    pool: &DbPool,
    campaign_id: &str,
) -> Result<Vec<OutreachMessage>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let query = format!(
        "SELECT {} FROM outreach_messages WHERE campaign_id = ? ORDER BY created_at ASC",
        MESSAGE_COLUMNS
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map([campaign_id], message_from_row)?;

    let mut messages = Vec::new();
    for message in rows {
        messages.push(message?);
    }
    Ok(messages)
}

pub async fn get_message(
    pool: &DbPool,
    message_id: &str,
) -> Result<Option<OutreachMessage>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let query = format!(
        "SELECT {} FROM outreach_messages WHERE id = ?",
        MESSAGE_COLUMNS
    );
    let mut stmt = conn.prepare(&query)?;
    let mut rows = stmt.query_map([message_id], message_from_row)?;
    match rows.next() {
        Some(message) => Ok(Some(message?)),
        None => Ok(None),
    }
}

pub async fn update_message_engagement(
    pool: &DbPool,
    message_id: &str,
    status: MessageStatus,
    timestamp_column: &str,
    at: DateTime<Utc>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // timestamp_column comes from a fixed internal table, never user input
    let conn = pool.get().await?;
    let sql = format!(
        "UPDATE outreach_messages SET status = ?1, {} = ?2 WHERE id = ?3",
        timestamp_column
    );
    conn.execute(&sql, params![status.as_str(), at.to_rfc3339(), message_id])?;
    Ok(())
}

// --- import batches ---

pub async fn insert_import_batch(
    pool: &DbPool,
    batch: &ImportBatch,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    conn.execute(
        r#"
        INSERT INTO import_batches (
            id, workspace, file_name, column_mapping, segment_id, total_rows,
            succeeded, failed, errors, imported_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            batch.id,
            batch.workspace,
            batch.file_name,
            serde_json::to_string(&batch.column_mapping)?,
            batch.segment_id.as_deref().unwrap_or(""),
            batch.total_rows as i64,
            batch.succeeded as i64,
            batch.failed as i64,
            serde_json::to_string(&batch.errors)?,
            batch.imported_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub async fn list_import_batches(
    pool: &DbPool,
    workspace: &str,
) -> Result<Vec<ImportBatch>, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;
    let mut stmt = conn.prepare(
        "SELECT id, workspace, file_name, column_mapping, segment_id, total_rows,
                succeeded, failed, errors, imported_at
         FROM import_batches WHERE workspace = ? ORDER BY imported_at DESC",
    )?;

    let rows = stmt.query_map([workspace], |row| {
        let mapping_json: String = row.get(3)?;
        let errors_json: String = row.get(8)?;
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            mapping_json,
            non_empty(row.get(4)?),
            row.get::<_, i64>(5)?,
            row.get::<_, i64>(6)?,
            row.get::<_, i64>(7)?,
            errors_json,
            parse_dt(9, row.get(9)?)?,
        ))
    })?;

    let mut batches = Vec::new();
    for row in rows {
        let (id, workspace, file_name, mapping_json, segment_id, total, ok, failed, errors_json, at) =
            row?;
        batches.push(ImportBatch {
            id,
            workspace,
            file_name,
            column_mapping: serde_json::from_str(&mapping_json).unwrap_or_default(),
            segment_id,
            total_rows: total as usize,
            succeeded: ok as usize,
            failed: failed as usize,
            errors: serde_json::from_str(&errors_json).unwrap_or_default(),
            imported_at: at,
        });
    }
    Ok(batches)
}

// --- workspace stats ---

#[derive(Debug, serde::Serialize)]
pub struct WorkspaceStats {
    pub total_leads: i64,
    pub leads_contacted: i64,
    pub total_segments: i64,
    pub total_campaigns: i64,
    pub campaigns_by_status: Vec<(String, i64)>,
    pub total_messages: i64,
    pub messages_pending: i64,
    pub messages_sent_7d: i64,
    pub total_import_batches: i64,
}

pub async fn get_workspace_stats(
    pool: &DbPool,
    workspace: &str,
) -> Result<WorkspaceStats, Box<dyn std::error::Error + Send + Sync>> {
    let conn = pool.get().await?;

    let total_leads: i64 = conn.query_row(
        "SELECT COUNT(*) FROM leads WHERE workspace = ?",
        [workspace],
        |row| row.get(0),
    )?;

    let leads_contacted: i64 = conn.query_row(
        "SELECT COUNT(*) FROM leads WHERE workspace = ? AND last_contacted_at IS NOT NULL",
        [workspace],
        |row| row.get(0),
    )?;

    let total_segments: i64 = conn.query_row(
        "SELECT COUNT(*) FROM segments WHERE workspace = ?",
        [workspace],
        |row| row.get(0),
    )?;

    let total_campaigns: i64 = conn.query_row(
        "SELECT COUNT(*) FROM campaigns WHERE workspace = ?",
        [workspace],
        |row| row.get(0),
    )?;

    let mut campaigns_by_status = Vec::new();
    {
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM campaigns WHERE workspace = ?
             GROUP BY status ORDER BY status",
        )?;
        let rows = stmt.query_map([workspace], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            campaigns_by_status.push(row?);
        }
    }

    let total_messages: i64 = conn.query_row(
        "SELECT COUNT(*) FROM outreach_messages m
         JOIN campaigns c ON m.campaign_id = c.id
         WHERE c.workspace = ?",
        [workspace],
        |row| row.get(0),
    )?;

    let messages_pending: i64 = conn.query_row(
        "SELECT COUNT(*) FROM outreach_messages m
         JOIN campaigns c ON m.campaign_id = c.id
         WHERE c.workspace = ? AND m.status = 'pending'",
        [workspace],
        |row| row.get(0),
    )?;

    let week_ago = (Utc::now() - chrono::Duration::days(7)).to_rfc3339();
    let messages_sent_7d: i64 = conn.query_row(
        "SELECT COUNT(*) FROM outreach_messages m
         JOIN campaigns c ON m.campaign_id = c.id
         WHERE c.workspace = ?1 AND m.sent_at IS NOT NULL AND m.sent_at >= ?2",
        params![workspace, week_ago],
        |row| row.get(0),
    )?;

    let total_import_batches: i64 = conn.query_row(
        "SELECT COUNT(*) FROM import_batches WHERE workspace = ?",
        [workspace],
        |row| row.get(0),
    )?;

    Ok(WorkspaceStats {
        total_leads,
        leads_contacted,
        total_segments,
        total_campaigns,
        campaigns_by_status,
        total_messages,
        messages_pending,
        messages_sent_7d,
        total_import_batches,
    })
}
