//! Queue event follower
//!
//! Holds a `GET /events` stream open against the Queue Store and nudges the
//! controller loop whenever the queue changes, so a new submission reaches
//! the screen before the next poll tick. Polling stays the source of truth;
//! a dropped stream only costs latency and is retried after a delay.

use futures::StreamExt;
use kq_common::events::QueueEvent;
use reqwest::header::ACCEPT;
use reqwest::Url;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::{ClientError, USER_AGENT};
use crate::runtime::QueueNotifier;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// One dispatched server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    /// `event:` field, if the server named the event
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
}

/// Incremental `text/event-stream` decoder
///
/// Chunks may split lines (or multi-byte characters) anywhere; bytes are
/// buffered until a full line is available. Comment lines such as the
/// server's keep-alive are skipped, as are `id:` and `retry:` fields.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns every message the chunk completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        self.buffer.extend_from_slice(chunk);

        let mut messages = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(message) = self.process_line(&line) {
                messages.push(message);
            }
        }
        messages
    }

    fn process_line(&mut self, line: &str) -> Option<SseMessage> {
        if line.is_empty() {
            // Blank line dispatches; a block with no data is dropped
            if self.data.is_empty() {
                self.event = None;
                return None;
            }
            let data = self.data.join("\n");
            self.data.clear();
            return Some(SseMessage {
                event: self.event.take(),
                data,
            });
        }

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            _ => {}
        }
        None
    }
}

/// Follows the Queue Store's event stream on a background task
pub struct EventFollower {
    http_client: reqwest::Client,
    url: Url,
    reconnect_delay: Duration,
}

impl EventFollower {
    /// `base_url` must end with '/', as `HttpQueueClient::base_url` does
    pub fn new(base_url: &Url) -> Result<Self, ClientError> {
        let url = base_url
            .join("events")
            .map_err(|e| ClientError::InvalidUrl(format!("{}events: {}", base_url, e)))?;

        // No overall timeout: the response body stays open indefinitely
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            url,
            reconnect_delay: RECONNECT_DELAY,
        })
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Run until the controller loop stops; abort the handle to stop sooner
    pub fn spawn(self, notifier: QueueNotifier) -> JoinHandle<()> {
        tokio::spawn(self.run(notifier))
    }

    async fn run(self, notifier: QueueNotifier) {
        info!("Following queue events at {}", self.url);

        while !notifier.is_closed() {
            match self.follow(&notifier).await {
                Ok(()) => debug!("Event stream ended"),
                Err(e) => warn!("Queue event stream unavailable: {}", e),
            }
            if notifier.is_closed() {
                break;
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }

        debug!("Event follower stopped");
    }

    /// One connection; returns when the server closes the stream or the
    /// controller loop has gone away
    async fn follow(&self, notifier: &QueueNotifier) -> Result<(), ClientError> {
        let response = self
            .http_client
            .get(self.url.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: format!("event stream refused at {}", self.url),
            });
        }
        debug!("Connected to queue event stream");

        let mut parser = SseParser::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for message in parser.push(&chunk) {
                match serde_json::from_str::<QueueEvent>(&message.data) {
                    Ok(event) => {
                        debug!(
                            "Queue event {} (length {})",
                            event.event_type(),
                            event.queue_length()
                        );
                        if !notifier.notify(event) {
                            return Ok(());
                        }
                    }
                    Err(e) => warn!("Ignoring unreadable queue event: {}", e),
                }
            }
        }

        Ok(())
    }
}
