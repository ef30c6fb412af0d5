use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{app_error::AppError, models::QuoteStatus};

/// Payload posted to the notification function (email / messaging fan-out).
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    QuoteSubmitted {
        quote_request_id: Uuid,
    },
    StatusChanged {
        quote_request_id: Uuid,
        status: QuoteStatus,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Invokes the notification function over HTTP.
pub struct HttpNotifier {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpNotifier {
    pub fn new(client: Client, url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            url: url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let mut request = self.client.post(&self.url).json(notification);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        request
            .send()
            .await
            .map_err(|_| AppError::ServiceUnreachable("NotificationService".into()))?
            .error_for_status()
            .context("Notification function rejected the request")?;

        info!("Notification sent: {:?}", notification);
        Ok(())
    }
}

/// Used when no notification function is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        debug!("Notifications disabled, dropping {:?}", notification);
        Ok(())
    }
}

/// Sends a notification whose failure must not affect the caller.
pub async fn notify_best_effort(notifier: &dyn Notifier, notification: Notification) {
    if let Err(err) = notifier.send(&notification).await {
        warn!("Failed to send notification {:?}: {:#}", notification, err);
    }
}
