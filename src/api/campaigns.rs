// src/api/campaigns.rs
use crate::analytics::{campaign_stats, CampaignStats};
use crate::api::stats::ApiResponse;
use crate::models::Campaign;
use crate::server::ServerState;
use rocket::{get, serde::json::Json, State};
use serde::Serialize;

#[derive(Serialize)]
pub struct CampaignSummary {
    pub campaign: Campaign,
    pub stats: CampaignStats,
}

#[get("/campaigns")]
pub async fn get_campaigns(
    state: &State<ServerState>,
) -> Json<ApiResponse<Vec<CampaignSummary>>> {
    let workspace = state.config.workspace.id.clone();

    let campaigns = match crate::database::list_campaigns(&state.db_pool, &workspace).await {
        Ok(campaigns) => campaigns,
        Err(e) => return Json(ApiResponse::error(e.to_string())),
    };

    let mut out = Vec::with_capacity(campaigns.len());
    for campaign in campaigns {
        let stats = match campaign_stats(&state.db_pool, &campaign.id).await {
            Ok(stats) => stats,
            Err(e) => return Json(ApiResponse::error(e.to_string())),
        };
        out.push(CampaignSummary { campaign, stats });
    }

    Json(ApiResponse::success(out))
}

#[get("/campaigns/<campaign_id>/stats")]
pub async fn get_campaign_stats(
    state: &State<ServerState>,
    campaign_id: String,
) -> Json<ApiResponse<CampaignStats>> {
    match crate::database::get_campaign(&state.db_pool, &campaign_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Json(ApiResponse::error("campaign not found".to_string())),
        Err(e) => return Json(ApiResponse::error(e.to_string())),
    }

    match campaign_stats(&state.db_pool, &campaign_id).await {
        Ok(stats) => Json(ApiResponse::success(stats)),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}
