// src/sender/provider.rs
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, error};

/// One rendered message ready for dispatch.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub body: String,
    pub track_opens: bool,
    pub track_clicks: bool,
}

/// What the provider said about one dispatch attempt. Transport errors and
/// timeouts fold into `Failed` (transient, retryable); a hard rejection is
/// `Bounced` and is never retried.
#[derive(Debug, Clone)]
pub enum DeliveryOutcome {
    Accepted { provider_message_id: String },
    Bounced { reason: String },
    Failed { reason: String },
}

/// Dispatch seam between the batch sender and the outside world. Total:
/// implementations report every problem as an outcome, never as an error
/// that would halt the rest of the batch.
#[async_trait::async_trait]
pub trait DeliveryProvider: Send + Sync {
    async fn dispatch(&self, request: &DeliveryRequest) -> DeliveryOutcome;
}

#[derive(Debug, Clone)]
pub struct MailgunConfig {
    pub api_key: String,
    pub domain: String,
    pub from_email: String,
    pub from_name: String,
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl MailgunConfig {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(MailgunConfig {
            api_key: std::env::var("MAILGUN_API_KEY")
                .map_err(|_| "MAILGUN_API_KEY environment variable required")?,
            domain: std::env::var("MAILGUN_DOMAIN")
                .unwrap_or_else(|_| "mg.example.com".to_string()),
            from_email: std::env::var("FROM_EMAIL")
                .unwrap_or_else(|_| "outreach@mg.example.com".to_string()),
            from_name: std::env::var("FROM_NAME").unwrap_or_else(|_| "Outreach Team".to_string()),
            base_url: "https://api.mailgun.net/v3".to_string(),
            timeout_seconds: 15,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MailgunResponse {
    id: String,
    #[allow(dead_code)]
    message: String,
}

pub struct MailgunProvider {
    config: MailgunConfig,
    client: Client,
}

impl MailgunProvider {
    pub fn new(config: MailgunConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_else(|_| Client::new());
        debug!("Created MailgunProvider for domain: {}", config.domain);
        Self { config, client }
    }
}

#[async_trait::async_trait]
impl DeliveryProvider for MailgunProvider {
    async fn dispatch(&self, request: &DeliveryRequest) -> DeliveryOutcome {
        let url = format!("{}/{}/messages", self.config.base_url, self.config.domain);

        debug!("Dispatching to {}: {}", request.to_email, request.subject);

        let mut form_data = HashMap::new();
        form_data.insert(
            "from",
            format!("{} <{}>", self.config.from_name, self.config.from_email),
        );
        form_data.insert("to", format!("{} <{}>", request.to_name, request.to_email));
        form_data.insert("subject", request.subject.clone());
        form_data.insert("text", request.body.clone());
        form_data.insert(
            "o:tracking-opens",
            if request.track_opens { "yes" } else { "no" }.to_string(),
        );
        form_data.insert(
            "o:tracking-clicks",
            if request.track_clicks { "yes" } else { "no" }.to_string(),
        );

        let response = match self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.config.api_key))
            .form(&form_data)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                // network errors and timeouts are transient
                error!("Provider transport error for {}: {}", request.to_email, e);
                return DeliveryOutcome::Failed {
                    reason: format!("transport error: {}", e),
                };
            }
        };

        let status = response.status();
        debug!("Provider response status: {}", status);

        if status.is_success() {
            match response.json::<MailgunResponse>().await {
                Ok(parsed) => DeliveryOutcome::Accepted {
                    provider_message_id: parsed.id,
                },
                Err(e) => DeliveryOutcome::Failed {
                    reason: format!("unreadable provider response: {}", e),
                },
            }
        } else {
            let body = response.text().await.unwrap_or_default();
            error!("Provider rejected {}: {} {}", request.to_email, status, body);
            if status.is_client_error() {
                // hard rejection of this recipient/payload
                DeliveryOutcome::Bounced {
                    reason: format!("{}: {}", status, body),
                }
            } else {
                DeliveryOutcome::Failed {
                    reason: format!("{}: {}", status, body),
                }
            }
        }
    }
}

/// Scripted provider for tests: pops the next queued outcome per dispatch,
/// accepting once the script runs dry. Records every request it saw.
#[cfg(test)]
pub struct MockProvider {
    outcomes: std::sync::Mutex<std::collections::VecDeque<DeliveryOutcome>>,
    pub dispatched: std::sync::Mutex<Vec<DeliveryRequest>>,
}

#[cfg(test)]
impl MockProvider {
    pub fn new(outcomes: Vec<DeliveryOutcome>) -> Self {
        Self {
            outcomes: std::sync::Mutex::new(outcomes.into()),
            dispatched: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn accepting() -> Self {
        Self::new(Vec::new())
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatched.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl DeliveryProvider for MockProvider {
    async fn dispatch(&self, request: &DeliveryRequest) -> DeliveryOutcome {
        self.dispatched.lock().unwrap().push(request.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| DeliveryOutcome::Accepted {
                provider_message_id: format!("mock-{}", uuid::Uuid::new_v4()),
            })
    }
}
