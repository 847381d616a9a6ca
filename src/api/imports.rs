// src/api/imports.rs
use crate::api::stats::ApiResponse;
use crate::models::ImportBatch;
use crate::server::ServerState;
use rocket::{get, serde::json::Json, State};

/// Import audit trail, newest first. Batches are immutable once written,
/// so this is pure reporting.
#[get("/imports")]
pub async fn get_import_batches(
    state: &State<ServerState>,
) -> Json<ApiResponse<Vec<ImportBatch>>> {
    let workspace = state.config.workspace.id.clone();

    match crate::database::list_import_batches(&state.db_pool, &workspace).await {
        Ok(batches) => Json(ApiResponse::success(batches)),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}
