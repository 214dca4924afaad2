//! Queue Store HTTP client
//!
//! The controller only needs four calls against the store; they sit behind
//! the `QueueClient` trait so the runtime can be driven by an in-memory fake.

use async_trait::async_trait;
use kq_common::api::{
    AdvanceResponse, DeleteEntryRequest, EntryResponse, ErrorResponse, QueueSnapshot,
};
use kq_common::QueueEntry;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use thiserror::Error;

pub(crate) const USER_AGENT: &str = concat!("kq-pc/", env!("CARGO_PKG_VERSION"));

/// Queue Store client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },
}

/// Operations the controller performs against the Queue Store
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// GET /queue/current
    async fn snapshot(&self) -> Result<QueueSnapshot, ClientError>;

    /// DELETE /queue/current; `None` when the queue was already empty
    async fn advance(&self) -> Result<Option<QueueEntry>, ClientError>;

    /// DELETE /queue/entry; `false` when the id was not present
    async fn delete_entry(&self, id: &str) -> Result<bool, ClientError>;

    /// POST /queue/auto
    async fn auto_fill(&self) -> Result<QueueEntry, ClientError>;
}

/// reqwest-backed client for a running kq-qs
pub struct HttpQueueClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpQueueClient {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        // Url::join replaces the last segment unless the base ends with '/'
        let normalized = if server_url.ends_with('/') {
            server_url.to_string()
        } else {
            format!("{}/", server_url)
        };
        let base_url =
            Url::parse(&normalized).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", server_url, e)))?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", path, e)))
    }
}

/// Turn a non-success response into `ClientError::Status`
async fn status_error(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => "no error body".to_string(),
    };
    ClientError::Status { status, message }
}

#[async_trait]
impl QueueClient for HttpQueueClient {
    async fn snapshot(&self) -> Result<QueueSnapshot, ClientError> {
        let response = self
            .http_client
            .get(self.endpoint("queue/current")?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn advance(&self) -> Result<Option<QueueEntry>, ClientError> {
        let response = self
            .http_client
            .delete(self.endpoint("queue/current")?)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: AdvanceResponse = response.json().await?;
                Ok(Some(body.removed))
            }
            _ => Err(status_error(response).await),
        }
    }

    async fn delete_entry(&self, id: &str) -> Result<bool, ClientError> {
        let response = self
            .http_client
            .delete(self.endpoint("queue/entry")?)
            .json(&DeleteEntryRequest {
                id: Some(id.to_string()),
            })
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(status_error(response).await),
        }
    }

    async fn auto_fill(&self) -> Result<QueueEntry, ClientError> {
        let response = self
            .http_client
            .post(self.endpoint("queue/auto")?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        let body: EntryResponse = response.json().await?;
        Ok(body.entry)
    }
}
