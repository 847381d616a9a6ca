// src/server/mod.rs
use crate::api::*;
use crate::config::Config;
use crate::database::DbPool;
use rocket::{routes, Build, Rocket};

pub mod routes;

pub struct ServerState {
    pub config: Config,
    pub db_pool: DbPool,
}

pub fn build_rocket(config: Config, db_pool: DbPool) -> Rocket<Build> {
    let state = ServerState { config, db_pool };

    rocket::build().manage(state).mount(
        "/api",
        routes![
            // Health and info endpoints
            routes::health::health_check,
            routes::health::index,
            // Stats endpoints
            get_stats,
            // Leads and segments
            get_leads,
            get_segments,
            // Campaigns
            get_campaigns,
            get_campaign_stats,
            // Import audit
            get_import_batches,
        ],
    )
}
