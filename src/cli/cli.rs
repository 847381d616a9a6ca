use tracing::info;

use crate::config::Config;
use crate::database::DbPool;
use crate::engine::OutreachEngine;
use crate::models::CliApp;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone)]
pub enum MenuAction {
    ImportLeads,
    ManageLeads,
    ManageSegments,
    ManageCampaigns,
    SendBatch,
    ShowStats,
    ServeApi,
    Exit,
}

impl std::fmt::Display for MenuAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MenuAction::ImportLeads => write!(f, "📥 Import leads from CSV"),
            MenuAction::ManageLeads => write!(f, "👥 Manage leads"),
            MenuAction::ManageSegments => write!(f, "🏷️  Manage segments"),
            MenuAction::ManageCampaigns => write!(f, "📝 Manage campaigns"),
            MenuAction::SendBatch => write!(f, "📧 Send campaign batch"),
            MenuAction::ShowStats => write!(f, "📊 Show workspace statistics"),
            MenuAction::ServeApi => write!(f, "🌐 Start reporting API"),
            MenuAction::Exit => write!(f, "🚪 Exit"),
        }
    }
}

impl CliApp {
    pub async fn new(config: Config, db_pool: DbPool) -> Result<Self> {
        let engine = OutreachEngine::new(config.clone(), db_pool.clone());
        info!(
            "Outreach engine ready for workspace '{}'",
            config.workspace.id
        );

        Ok(Self {
            config,
            db_pool,
            engine,
        })
    }
}
