// src/api/stats.rs
use crate::database::get_workspace_stats;
use crate::server::ServerState;
use rocket::{get, serde::json::Json, State};
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Serialize)]
pub struct StatsOverview {
    pub workspace: String,
    pub total_leads: i64,
    pub leads_contacted: i64,
    pub contact_rate: f64,
    pub total_segments: i64,
    pub total_campaigns: i64,
    pub campaigns_by_status: Vec<(String, i64)>,
    pub total_messages: i64,
    pub messages_pending: i64,
    pub messages_sent_7d: i64,
    pub total_import_batches: i64,
}

#[get("/stats")]
pub async fn get_stats(state: &State<ServerState>) -> Json<ApiResponse<StatsOverview>> {
    let workspace = state.config.workspace.id.clone();
    match get_workspace_stats(&state.db_pool, &workspace).await {
        Ok(stats) => {
            let contact_rate = if stats.total_leads > 0 {
                (stats.leads_contacted as f64 / stats.total_leads as f64) * 100.0
            } else {
                0.0
            };

            let overview = StatsOverview {
                workspace,
                total_leads: stats.total_leads,
                leads_contacted: stats.leads_contacted,
                contact_rate,
                total_segments: stats.total_segments,
                total_campaigns: stats.total_campaigns,
                campaigns_by_status: stats.campaigns_by_status,
                total_messages: stats.total_messages,
                messages_pending: stats.messages_pending,
                messages_sent_7d: stats.messages_sent_7d,
                total_import_batches: stats.total_import_batches,
            };

            Json(ApiResponse::success(overview))
        }
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}
