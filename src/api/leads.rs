// src/api/leads.rs
use crate::api::stats::ApiResponse;
use crate::server::ServerState;
use rocket::{get, serde::json::Json, State};
use serde::Serialize;

#[derive(Serialize)]
pub struct LeadRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub position: Option<String>,
    pub status: String,
    pub origin: String,
    pub segment_id: Option<String>,
    pub created_at: String,
    pub last_contacted_at: Option<String>,
}

#[derive(Serialize)]
pub struct LeadsResponse {
    pub leads: Vec<LeadRow>,
    pub total_count: usize,
    pub page: usize,
    pub per_page: usize,
}

#[get("/leads?<page>&<per_page>&<status>&<segment_id>")]
pub async fn get_leads(
    state: &State<ServerState>,
    page: Option<usize>,
    per_page: Option<usize>,
    status: Option<String>,
    segment_id: Option<String>,
) -> Json<ApiResponse<LeadsResponse>> {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(50).min(1000);
    let offset = (page - 1) * per_page;

    let conn = match state.db_pool.get().await {
        Ok(conn) => conn,
        Err(e) => return Json(ApiResponse::error(e.to_string())),
    };

    let mut where_conditions = vec!["workspace = ?".to_string()];
    let mut params = vec![state.config.workspace.id.clone()];

    if let Some(status_filter) = status {
        where_conditions.push("status = ?".to_string());
        params.push(status_filter);
    }
    if let Some(segment_filter) = segment_id {
        where_conditions.push("segment_id = ?".to_string());
        params.push(segment_filter);
    }

    let where_clause = where_conditions.join(" AND ");
    let query = format!(
        "SELECT id, name, email, company, position, status, origin, segment_id,
                created_at, last_contacted_at
         FROM leads
         WHERE {}
         ORDER BY created_at DESC
         LIMIT {} OFFSET {}",
        where_clause, per_page, offset
    );

    let mut stmt = match conn.prepare(&query) {
        Ok(stmt) => stmt,
        Err(e) => return Json(ApiResponse::error(e.to_string())),
    };

    let lead_iter = match stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        Ok(LeadRow {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            company: non_empty(row.get(3)?),
            position: non_empty(row.get(4)?),
            status: row.get(5)?,
            origin: row.get(6)?,
            segment_id: non_empty(row.get(7)?),
            created_at: row.get(8)?,
            last_contacted_at: non_empty(row.get(9)?),
        })
    }) {
        Ok(iter) => iter,
        Err(e) => return Json(ApiResponse::error(e.to_string())),
    };

    let mut leads = Vec::new();
    for result in lead_iter {
        match result {
            Ok(lead) => leads.push(lead),
            Err(e) => return Json(ApiResponse::error(e.to_string())),
        }
    }

    let total_count = leads.len();

    Json(ApiResponse::success(LeadsResponse {
        leads,
        total_count,
        page,
        per_page,
    }))
}

#[derive(Serialize)]
pub struct SegmentSummary {
    pub id: String,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub member_count: i64,
}

#[get("/segments")]
pub async fn get_segments(state: &State<ServerState>) -> Json<ApiResponse<Vec<SegmentSummary>>> {
    let workspace = state.config.workspace.id.clone();

    let segments = match crate::database::list_segments(&state.db_pool, &workspace).await {
        Ok(segments) => segments,
        Err(e) => return Json(ApiResponse::error(e.to_string())),
    };

    let mut out = Vec::with_capacity(segments.len());
    for segment in segments {
        let member_count =
            match crate::database::count_segment_members(&state.db_pool, &segment.id).await {
                Ok(count) => count,
                Err(e) => return Json(ApiResponse::error(e.to_string())),
            };
        out.push(SegmentSummary {
            id: segment.id,
            name: segment.name,
            color: segment.color,
            description: segment.description,
            member_count,
        });
    }

    Json(ApiResponse::success(out))
}
