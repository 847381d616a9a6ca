pub mod cli;
pub mod run;
pub mod run_campaigns;
pub mod run_import_leads;
pub mod run_leads;
pub mod run_segments;
pub mod run_send_batch;
pub mod show_stats;
