use crate::models::SendingPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub workspace: WorkspaceConfig,
    pub importer: ImporterConfig,
    pub sending: SendingConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

/// Identity of the workspace this engine instance serves. Leads are
/// deduplicated per workspace, so two instances with different ids never
/// collide.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    pub id: String,
    pub sender_name: String,
    pub sender_email: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImporterConfig {
    /// Fields that must be mapped to a column before an import may run.
    pub required_fields: Vec<String>,
    /// Rows with more fields than the header are rejected instead of
    /// silently truncated.
    pub strict_row_width: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SendingConfig {
    /// Defaults applied to new campaigns; each campaign persists its own copy.
    pub defaults: SendingPolicy,
    /// Messages selected per drain invocation.
    pub batch_size: usize,
    /// Bounce share within one drain above which the campaign auto-pauses.
    pub bounce_pause_threshold: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub progress_interval: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub directory: String,
    pub database_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: WorkspaceConfig {
                id: "default".to_string(),
                sender_name: "Outreach Team".to_string(),
                sender_email: "outreach@example.com".to_string(),
            },
            importer: ImporterConfig {
                required_fields: vec!["name".to_string(), "email".to_string()],
                strict_row_width: false,
            },
            sending: SendingConfig {
                defaults: SendingPolicy::default(),
                batch_size: 25,
                bounce_pause_threshold: 0.2,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                progress_interval: 10,
            },
            output: OutputConfig {
                directory: "out".to_string(),
                database_path: "data/outreach.db".to_string(),
            },
        }
    }
}

pub async fn load_config(
    path: &str,
) -> std::result::Result<Config, Box<dyn std::error::Error + Send + Sync>> {
    let content = tokio::fs::read_to_string(path).await?;
    let config: Config = serde_yaml::from_str(&content)?;
    Ok(config)
}
