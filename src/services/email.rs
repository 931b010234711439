use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EmailConfig;

const MAILTRAP_SEND_URL: &str = "https://send.api.mailtrap.io/api/send";

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Mailtrap API returned status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound mail. The core only produces tokens and addresses; the boundary
/// layer composes the message and hands it to one of these.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError>;
    fn name(&self) -> &'static str;
}

/// Drops every message. Selected when no provider token is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSender;

#[async_trait]
impl EmailSender for NoopSender {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), EmailError> {
        tracing::debug!(to, subject, "noop sender discarded email");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "NOOP"
    }
}

#[derive(Debug, Serialize)]
struct MailtrapAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct MailtrapRequest<'a> {
    from: MailtrapAddress<'a>,
    to: Vec<MailtrapAddress<'a>>,
    subject: &'a str,
    text: &'a str,
    category: &'a str,
}

/// Mailtrap transactional sending API
pub struct MailtrapSender {
    client: Client,
    endpoint: String,
    token: String,
    from_email: String,
    from_name: String,
    category: String,
}

impl MailtrapSender {
    pub fn new(token: impl Into<String>, from_email: impl Into<String>, from_name: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: MAILTRAP_SEND_URL.to_string(),
            token: token.into(),
            from_email: from_email.into(),
            from_name: from_name.into(),
            category: "Auth".to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn request<'a>(&'a self, to: &'a str, subject: &'a str, body: &'a str) -> MailtrapRequest<'a> {
        MailtrapRequest {
            from: MailtrapAddress {
                email: &self.from_email,
                name: Some(&self.from_name),
            },
            to: vec![MailtrapAddress { email: to, name: None }],
            subject,
            text: body,
            category: &self.category,
        }
    }
}

#[async_trait]
impl EmailSender for MailtrapSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Api-Token", &self.token)
            .json(&self.request(to, subject, body))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "mailtrap rejected email");
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "MAILTRAP"
    }
}

pub fn sender_from_config(config: &EmailConfig) -> Arc<dyn EmailSender> {
    match &config.mailtrap_token {
        Some(token) => {
            tracing::info!("using Mailtrap email sender");
            Arc::new(MailtrapSender::new(
                token.clone(),
                config.from_address.clone(),
                config.from_name.clone(),
            ))
        }
        None => {
            tracing::info!("using noop email sender (EMAIL_SENDER_TOKEN_MAILTRAP not set)");
            Arc::new(NoopSender)
        }
    }
}
