// src/cli/show_stats.rs
use crate::database::get_workspace_stats;
use crate::models::CliApp;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

impl CliApp {
    pub async fn show_workspace_stats(&self) -> Result<()> {
        let stats = get_workspace_stats(&self.db_pool, self.engine.workspace_id()).await?;

        println!("\n📊 Workspace '{}'", self.engine.workspace_id());
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!("👥 Leads: {} ({} contacted)", stats.total_leads, stats.leads_contacted);
        println!("🏷️  Segments: {}", stats.total_segments);
        println!("📝 Campaigns: {}", stats.total_campaigns);
        for (status, count) in &stats.campaigns_by_status {
            println!("     {}: {}", status, count);
        }
        println!(
            "✉️  Messages: {} total, {} pending",
            stats.total_messages, stats.messages_pending
        );
        println!("🕐 Sent in last 7 days: {}", stats.messages_sent_7d);
        println!("📥 Import batches: {}", stats.total_import_batches);

        Ok(())
    }
}
