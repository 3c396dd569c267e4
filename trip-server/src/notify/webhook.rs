//! HTTP webhook notification host.
//!
//! Forwards registrations to an external notification gateway:
//!
//! - `GET {base}/permission` answers `{"granted": bool}`
//! - `POST {base}/notifications` takes a [`NotificationRequest`] and answers
//!   `{"id": "..."}`
//! - `DELETE {base}/notifications/{id}` withdraws one, 404 if unknown

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::error::HostError;
use super::host::{NotificationHandle, NotificationHost, NotificationRequest};

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Configuration for the webhook host.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Gateway base URL, without a trailing slash
    pub base_url: String,
    /// Optional bearer token
    pub token: Option<String>,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl WebhookConfig {
    /// Create a new config pointing at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 10,
        }
    }

    /// Authenticate with a bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n.max(1);
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Deserialize)]
struct PermissionResponse {
    granted: bool,
}

#[derive(Deserialize)]
struct RegisteredResponse {
    id: String,
}

/// Notification host backed by an HTTP gateway.
#[derive(Debug, Clone)]
pub struct WebhookHost {
    http: reqwest::Client,
    base_url: String,
    semaphore: Arc<Semaphore>,
}

impl WebhookHost {
    /// Create a new webhook host with the given configuration.
    pub fn new(config: WebhookConfig) -> Result<Self, HostError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                HostError::Rejected {
                    status: 0,
                    message: "invalid webhook token".to_string(),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
        })
    }

    async fn permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>, HostError> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| HostError::Rejected {
                status: 0,
                message: "semaphore closed".to_string(),
            })
    }

    /// Map a non-success status to an error.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, HostError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(HostError::PermissionDenied);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(HostError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

impl NotificationHost for WebhookHost {
    async fn check_permission(&self) -> Result<bool, HostError> {
        let _permit = self.permit().await?;
        let url = format!("{}/permission", self.base_url);

        let response = self.http.get(&url).send().await?;
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(false);
        }

        let body: PermissionResponse = Self::check_status(response).await?.json().await?;
        Ok(body.granted)
    }

    async fn register(&self, request: &NotificationRequest) -> Result<NotificationHandle, HostError> {
        let _permit = self.permit().await?;
        let url = format!("{}/notifications", self.base_url);

        let response = self.http.post(&url).json(request).send().await?;
        let body: RegisteredResponse = Self::check_status(response).await?.json().await?;

        debug!(key = %request.key, id = %body.id, "registered notification with webhook");
        Ok(NotificationHandle::new(body.id))
    }

    async fn revoke(&self, handle: &NotificationHandle) -> Result<(), HostError> {
        let _permit = self.permit().await?;
        let url = format!("{}/notifications/{}", self.base_url, handle.as_str());

        let response = self.http.delete(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            warn!(%handle, "webhook does not know notification");
            return Err(HostError::NotFound(handle.clone()));
        }
        Self::check_status(response).await?;
        Ok(())
    }
}
