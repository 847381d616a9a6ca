// src/server/routes.rs
pub mod health {
    use rocket::{get, serde::json::Json};
    use serde_json::{json, Value};

    #[get("/health")]
    pub async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "service": "outreach-engine-api"
        }))
    }

    #[get("/")]
    pub async fn index() -> Json<Value> {
        Json(json!({
            "name": "Outreach Engine API",
            "version": "0.1.0",
            "description": "Read-only reporting over leads, segments, campaigns and imports",
            "endpoints": {
                "health": "/api/health",
                "stats": "/api/stats",
                "leads": "/api/leads",
                "segments": "/api/segments",
                "campaigns": "/api/campaigns",
                "imports": "/api/imports"
            }
        }))
    }
}
