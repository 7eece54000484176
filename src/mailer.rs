use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Upper bound on one mail API round trip.
const MAIL_API_TIMEOUT: Duration = Duration::from_secs(10);

/// EmailMessage
///
/// A plain-text transactional email.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

// 1. Mailer Contract
/// Mailer
///
/// Abstract contract for outgoing email. Production sends through an HTTP mail API
/// (`HttpMailer`); local runs and tests use `MockMailer`, which keeps an outbox.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), String>;
}

// 2. The Real Implementation (HTTP mail API)
/// HttpMailer
///
/// Posts `{from, to, subject, text}` as JSON to a transactional mail API, authenticated
/// with a bearer key.
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: &str, api_key: &str, from: &str) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(MAIL_API_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "mail client builder failed, using defaults");
                reqwest::Client::new()
            });
        Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), String> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "from": self.from,
                "to": message.to,
                "subject": message.subject,
                "text": message.text,
            }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("mail API responded with {}", response.status()));
        }

        tracing::debug!(subject = %message.subject, "email handed to mail API");
        Ok(())
    }
}

// 3. The Mock Implementation (local runs and tests)
/// MockMailer
///
/// Records every message in an in-memory outbox and logs it instead of sending.
#[derive(Clone, Default)]
pub struct MockMailer {
    /// When true, every send fails.
    pub should_fail: bool,
    /// Simulated mail API latency.
    pub delay: Option<Duration>,
    outbox: Arc<Mutex<Vec<EmailMessage>>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Messages sent so far, oldest first.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err("Mock Mailer Error: Simulation requested".to_string());
        }

        tracing::info!(to = %message.to, subject = %message.subject, "mock mailer captured email");
        self.outbox
            .lock()
            .map_err(|_| "mock outbox poisoned".to_string())?
            .push(message);
        Ok(())
    }
}

/// MailerState
///
/// The concrete type used to share the mailer across the application state.
pub type MailerState = Arc<dyn Mailer>;

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            to: "driver@example.com".into(),
            subject: "Reset".into(),
            text: "link".into(),
        }
    }

    #[tokio::test]
    async fn mock_mailer_keeps_an_outbox() {
        let mailer = MockMailer::new();
        mailer.send(message()).await.unwrap();
        assert_eq!(mailer.sent(), vec![message()]);
    }

    #[tokio::test]
    async fn clones_share_the_outbox() {
        let mailer = MockMailer::new();
        let handle: MailerState = Arc::new(mailer.clone());
        handle.send(message()).await.unwrap();
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn failing_mock_reports_errors() {
        let mailer = MockMailer::new_failing();
        assert!(mailer.send(message()).await.is_err());
        assert!(mailer.sent().is_empty());
    }
}
