use super::AppState;
use crate::protocol::ServerMessage;
use crate::source::{SourceError, SourceEvent};
use tokio::sync::mpsc;

impl AppState {
    /// Subscribe to `username`'s live stream, replacing any current
    /// subscription. Connection progress is reported to clients through
    /// `connectionStatus` messages.
    pub async fn connect_source(&self, username: &str) -> Result<(), SourceError> {
        let Some(manager) = self.source.clone() else {
            let error = SourceError::ConfigError("No live source configured".to_string());
            self.set_source_status(false, Some(error.to_string())).await;
            return Err(error);
        };

        tracing::info!(
            "Connecting {} source to {}",
            manager.source_name(),
            username
        );
        let (subscription_id, rx) = manager.connect(username).await;
        {
            let mut engine = self.engine.lock().await;
            let was_connected = engine.connection().connected_to_source;
            engine.set_connection(false, Some(username.to_string()));
            // The previous stream is gone; viewers must not keep showing it
            if was_connected {
                self.broadcast_to_all(ServerMessage::ConnectionStatus {
                    connected: false,
                    error: None,
                });
            }
        }

        let state = self.clone();
        tokio::spawn(async move {
            state.relay_source_events(subscription_id, rx).await;
        });
        Ok(())
    }

    /// Tear down the current subscription, if any
    pub async fn disconnect_source(&self) -> bool {
        let Some(manager) = self.source.clone() else {
            return false;
        };

        let had_subscription = manager.disconnect().await;
        if had_subscription {
            self.set_source_status(false, None).await;
        }
        had_subscription
    }

    /// Relay loop for one subscription. Ends when the subscription's channel
    /// closes or the subscription has been replaced.
    async fn relay_source_events(
        &self,
        subscription_id: String,
        mut rx: mpsc::Receiver<SourceEvent>,
    ) {
        let Some(manager) = self.source.clone() else {
            return;
        };

        while let Some(event) = rx.recv().await {
            if !manager.is_current(&subscription_id).await {
                tracing::debug!("Dropping events of replaced subscription {}", subscription_id);
                break;
            }
            self.handle_source_event(event).await;
        }

        tracing::debug!("Relay for subscription {} finished", subscription_id);
    }

    pub async fn handle_source_event(&self, event: SourceEvent) {
        match event {
            SourceEvent::Chat(chat) => {
                tracing::debug!("Chat from {}: {}", chat.author_name, chat.text);
                self.handle_chat(chat).await;
            }
            SourceEvent::Like { count } => {
                self.register_likes(count).await;
            }
            SourceEvent::Connected => {
                tracing::info!("Live source connected");
                self.set_source_status(true, None).await;
            }
            SourceEvent::Disconnected { error } => {
                match &error {
                    Some(e) => tracing::warn!("Live source disconnected: {}", e),
                    None => tracing::info!("Live source disconnected"),
                }
                self.set_source_status(false, error).await;
            }
        }
    }

    async fn set_source_status(&self, connected: bool, error: Option<String>) {
        let mut engine = self.engine.lock().await;
        engine.set_connection(connected, None);
        self.broadcast_to_all(ServerMessage::ConnectionStatus { connected, error });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ManualSource;
    use crate::types::GameConfig;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast;

    async fn next_status(rx: &mut broadcast::Receiver<ServerMessage>) -> (bool, Option<String>) {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("timed out waiting for connectionStatus")
                .expect("broadcast closed");
            if let ServerMessage::ConnectionStatus { connected, error } = msg {
                return (connected, error);
            }
        }
    }

    #[tokio::test]
    async fn test_connect_without_source_reports_error() {
        let state = AppState::new();
        let mut rx = state.broadcast.subscribe();

        assert!(state.connect_source("someone").await.is_err());
        let (connected, error) = next_status(&mut rx).await;
        assert!(!connected);
        assert!(error.unwrap().contains("No live source"));
    }

    #[tokio::test]
    async fn test_connect_and_relay_events() {
        let source = Arc::new(ManualSource::new());
        let state = AppState::with_config(GameConfig::default(), Some(source.clone()));
        let mut rx = state.broadcast.subscribe();

        state.connect_source("streamer").await.unwrap();
        assert_eq!(next_status(&mut rx).await, (true, None));

        let connection = state.get_connection().await;
        assert!(connection.connected_to_source);
        assert_eq!(connection.username.as_deref(), Some("streamer"));

        assert!(source.like(3).await);
        loop {
            if let ServerMessage::Like { count, total } = rx.recv().await.unwrap() {
                assert_eq!((count, total), (3, 3));
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_reconnect_reports_disconnect_first() {
        let source = Arc::new(ManualSource::new());
        let state = AppState::with_config(GameConfig::default(), Some(source));
        let mut rx = state.broadcast.subscribe();

        state.connect_source("first").await.unwrap();
        assert_eq!(next_status(&mut rx).await, (true, None));

        state.connect_source("second").await.unwrap();
        assert_eq!(next_status(&mut rx).await, (false, None));
        assert_eq!(next_status(&mut rx).await, (true, None));
        assert_eq!(
            state.get_connection().await.username.as_deref(),
            Some("second")
        );
    }

    #[tokio::test]
    async fn test_failed_connect_is_not_fatal() {
        let source = Arc::new(ManualSource::failing("user is offline"));
        let state = AppState::with_config(GameConfig::default(), Some(source));
        let mut rx = state.broadcast.subscribe();

        state.connect_source("offline_user").await.unwrap();
        let (connected, error) = next_status(&mut rx).await;
        assert!(!connected);
        assert!(error.unwrap().contains("user is offline"));

        // The game keeps working afterwards
        state.set_secret_word("car").await.unwrap();
        assert!(state.start_game().await);
        state.stop_game().await;
    }

    #[tokio::test]
    async fn test_disconnect_source() {
        let source = Arc::new(ManualSource::new());
        let state = AppState::with_config(GameConfig::default(), Some(source));
        let mut rx = state.broadcast.subscribe();

        assert!(!state.disconnect_source().await);

        state.connect_source("streamer").await.unwrap();
        assert_eq!(next_status(&mut rx).await, (true, None));

        assert!(state.disconnect_source().await);
        assert_eq!(next_status(&mut rx).await, (false, None));
        assert!(!state.get_connection().await.connected_to_source);
    }

    #[tokio::test]
    async fn test_events_after_disconnect_are_dropped() {
        let source = Arc::new(ManualSource::new());
        let state = AppState::with_config(GameConfig::default(), Some(source.clone()));
        let mut rx = state.broadcast.subscribe();

        state.connect_source("streamer").await.unwrap();
        assert_eq!(next_status(&mut rx).await, (true, None));
        state.disconnect_source().await;

        source.like(10).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(state.get_connection().await.total_likes, 0);
    }
}
