// src/engine.rs
use crate::analytics::{self, CampaignStats, EngagementEvent};
use crate::campaign::{CampaignController, CampaignStatus};
use crate::config::Config;
use crate::database::DbPool;
use crate::importer::{ColumnMapping, ImportSummary, LeadImporter};
use crate::models::{Campaign, Result};
use crate::segments::SegmentRegistry;
use crate::sender::{BatchSender, DeliveryProvider, DrainReport};

/// The campaign engine for one workspace. Constructed once with explicit
/// configuration; callers reach every operation through this instance
/// instead of selecting between ambient stores.
pub struct OutreachEngine {
    config: Config,
    db_pool: DbPool,
    importer: LeadImporter,
    segments: SegmentRegistry,
    controller: CampaignController,
    sender: BatchSender,
}

impl OutreachEngine {
    pub fn new(config: Config, db_pool: DbPool) -> Self {
        let workspace_id = config.workspace.id.clone();
        let importer = LeadImporter::new(&workspace_id, config.importer.clone(), db_pool.clone());
        let segments = SegmentRegistry::new(&workspace_id, db_pool.clone());
        let controller = CampaignController::new(config.workspace.clone(), db_pool.clone());
        let sender = BatchSender::new(config.sending.clone(), db_pool.clone());
        Self {
            config,
            db_pool,
            importer,
            segments,
            controller,
            sender,
        }
    }

    pub fn workspace_id(&self) -> &str {
        &self.config.workspace.id
    }

    pub fn importer(&self) -> &LeadImporter {
        &self.importer
    }

    pub fn segments(&self) -> &SegmentRegistry {
        &self.segments
    }

    // --- §4 operations, one call each ---

    pub async fn import_csv(
        &self,
        file_name: &str,
        csv_text: &str,
        mapping: &ColumnMapping,
        segment_id: Option<&str>,
    ) -> Result<ImportSummary> {
        self.importer
            .import(file_name, csv_text, mapping, segment_id)
            .await
    }

    pub fn new_campaign_draft(&self, name: &str) -> Campaign {
        self.controller
            .new_draft(name, &self.config.sending.defaults)
    }

    pub async fn save_campaign(&self, campaign: &Campaign) -> Result<()> {
        self.controller.save_draft(campaign).await
    }

    pub async fn generate_content(&self, campaign_id: &str) -> Result<usize> {
        self.controller.generate_content(campaign_id).await
    }

    pub async fn launch(&self, campaign_id: &str) -> Result<CampaignStatus> {
        self.controller.launch(campaign_id).await
    }

    pub async fn pause(&self, campaign_id: &str) -> Result<CampaignStatus> {
        self.controller.pause(campaign_id).await
    }

    pub async fn resume(&self, campaign_id: &str) -> Result<CampaignStatus> {
        self.controller.resume(campaign_id).await
    }

    pub async fn duplicate(&self, campaign_id: &str) -> Result<Campaign> {
        self.controller.duplicate(campaign_id).await
    }

    pub async fn activate_scheduled(&self, campaign_id: &str) -> Result<CampaignStatus> {
        self.controller.activate_scheduled(campaign_id).await
    }

    /// One serialized drain of a running campaign's queue. Campaigns may be
    /// drained concurrently with each other, never within themselves.
    pub async fn run_batch(
        &self,
        campaign_id: &str,
        provider: &dyn DeliveryProvider,
    ) -> Result<DrainReport> {
        self.sender
            .drain(&self.controller, campaign_id, provider)
            .await
    }

    pub async fn retry_failed(&self, campaign_id: &str) -> Result<usize> {
        self.sender.retry_failed(campaign_id).await
    }

    pub async fn campaign_stats(&self, campaign_id: &str) -> Result<CampaignStats> {
        analytics::campaign_stats(&self.db_pool, campaign_id).await
    }

    pub async fn record_engagement(
        &self,
        message_id: &str,
        event: EngagementEvent,
    ) -> Result<bool> {
        analytics::record_engagement(&self.db_pool, message_id, event).await
    }
}
