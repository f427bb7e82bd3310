//! Live stream sources
//!
//! A [`LiveSource`] turns one platform subscription into a stream of
//! [`SourceEvent`]s. [`SourceManager`] owns the single active subscription and
//! tears the previous one down before replacing it.

mod bridge;
mod manual;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::types::ChatEvent;

pub use bridge::{BridgeSource, SseDecoder};
pub use manual::ManualSource;

/// Result type for live source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors that can occur while talking to a live source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

/// Normalized event delivered by a source subscription
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Chat(ChatEvent),
    Like { count: u64 },
    Connected,
    Disconnected { error: Option<String> },
}

/// Trait that all live stream connectors implement
#[async_trait]
pub trait LiveSource: Send + Sync {
    /// Subscribe to `username`'s stream and push events into `events` until
    /// the stream ends. `Connected` is sent once the subscription is up.
    /// Returning an error means the subscription failed or broke.
    async fn subscribe(
        &self,
        username: &str,
        events: mpsc::Sender<SourceEvent>,
    ) -> SourceResult<()>;

    /// Get the name of this source
    fn name(&self) -> &str;
}

/// Configuration for the live source
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Connector bridge endpoint (SSE)
    pub bridge_url: Option<String>,
    /// Username to subscribe to at startup
    pub default_username: Option<String>,
    pub connect_timeout: Duration,
}

impl SourceConfig {
    pub fn from_env() -> Self {
        let bridge_url = std::env::var("LIVE_BRIDGE_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let default_username = std::env::var("LIVE_DEFAULT_USERNAME")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let connect_timeout = std::env::var("LIVE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        Self {
            bridge_url,
            default_username,
            connect_timeout,
        }
    }

    /// Build the configured source
    pub fn build_source(&self) -> SourceResult<Arc<dyn LiveSource>> {
        match &self.bridge_url {
            Some(url) => Ok(Arc::new(BridgeSource::new(
                url.clone(),
                self.connect_timeout,
            )?)),
            None => Err(SourceError::ConfigError(
                "LIVE_BRIDGE_URL is not set".to_string(),
            )),
        }
    }
}

struct Subscription {
    id: String,
    username: String,
    task: JoinHandle<()>,
}

/// Holds at most one active subscription
pub struct SourceManager {
    source: Arc<dyn LiveSource>,
    current: Mutex<Option<Subscription>>,
}

impl SourceManager {
    pub fn new(source: Arc<dyn LiveSource>) -> Self {
        Self {
            source,
            current: Mutex::new(None),
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Start a subscription for `username`, replacing any previous one.
    /// Returns the new subscription id and the receiving end of its events.
    /// The stream always ends with a `Disconnected` event unless the
    /// subscription is torn down first.
    pub async fn connect(&self, username: &str) -> (String, mpsc::Receiver<SourceEvent>) {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            tracing::info!(
                "Tearing down {} subscription for {}",
                self.source.name(),
                previous.username
            );
            previous.task.abort();
        }

        let (tx, rx) = mpsc::channel(256);
        let id = ulid::Ulid::new().to_string();
        let source = self.source.clone();
        let owned_username = username.to_string();

        let task = tokio::spawn(async move {
            let error = match source.subscribe(&owned_username, tx.clone()).await {
                Ok(()) => None,
                Err(e) => {
                    tracing::warn!(
                        "{} subscription for {} ended with error: {}",
                        source.name(),
                        owned_username,
                        e
                    );
                    Some(e.to_string())
                }
            };
            let _ = tx.send(SourceEvent::Disconnected { error }).await;
        });

        tracing::info!(
            "Started {} subscription {} for {}",
            self.source.name(),
            id,
            username
        );
        *current = Some(Subscription {
            id: id.clone(),
            username: username.to_string(),
            task,
        });

        (id, rx)
    }

    /// Tear down the active subscription. Returns false if there was none.
    pub async fn disconnect(&self) -> bool {
        match self.current.lock().await.take() {
            Some(subscription) => {
                tracing::info!("Disconnecting from {}", subscription.username);
                subscription.task.abort();
                true
            }
            None => false,
        }
    }

    pub async fn is_current(&self, subscription_id: &str) -> bool {
        self.current
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| s.id == subscription_id)
    }

    pub async fn current_username(&self) -> Option<String> {
        self.current
            .lock()
            .await
            .as_ref()
            .map(|s| s.username.clone())
    }
}
