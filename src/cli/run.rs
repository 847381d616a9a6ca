use dialoguer::{theme::ColorfulTheme, Select};

use crate::{
    cli::cli::MenuAction,
    models::{CliApp, Result},
};
use tracing::error;

impl CliApp {
    pub async fn run(&self) -> Result<()> {
        println!("\n🚀 Welcome to the Outreach Engine!");
        println!("═══════════════════════════════════════");

        // Show initial stats
        self.show_workspace_stats().await?;

        loop {
            let actions = vec![
                MenuAction::ImportLeads,
                MenuAction::ManageLeads,
                MenuAction::ManageSegments,
                MenuAction::ManageCampaigns,
                MenuAction::SendBatch,
                MenuAction::ShowStats,
                MenuAction::ServeApi,
                MenuAction::Exit,
            ];

            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("\nSelect an action")
                .default(0)
                .items(&actions)
                .interact()?;

            match &actions[selection] {
                MenuAction::ImportLeads => {
                    if let Err(e) = self.run_import_leads().await {
                        error!("Import failed: {}", e);
                    }
                }
                MenuAction::ManageLeads => {
                    if let Err(e) = self.run_leads().await {
                        error!("Lead management failed: {}", e);
                    }
                }
                MenuAction::ManageSegments => {
                    if let Err(e) = self.run_segments().await {
                        error!("Segment management failed: {}", e);
                    }
                }
                MenuAction::ManageCampaigns => {
                    if let Err(e) = self.run_campaigns().await {
                        error!("Campaign management failed: {}", e);
                    }
                }
                MenuAction::SendBatch => {
                    if let Err(e) = self.run_send_batch().await {
                        error!("Batch send failed: {}", e);
                    }
                }
                MenuAction::ShowStats => {
                    if let Err(e) = self.show_workspace_stats().await {
                        error!("Failed to show stats: {}", e);
                    }
                }
                MenuAction::ServeApi => {
                    println!("\n🌐 Serving reporting API (Ctrl+C to stop)...");
                    let rocket = crate::server::build_rocket(
                        self.config.clone(),
                        self.db_pool.clone(),
                    );
                    if let Err(e) = rocket.launch().await {
                        error!("API server failed: {}", e);
                    }
                }
                MenuAction::Exit => {
                    println!("\n👋 Thanks for using the Outreach Engine!");
                    break;
                }
            }
        }

        Ok(())
    }
}
