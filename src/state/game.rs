use super::{AppState, RoundError};
use crate::protocol::ServerMessage;
use crate::types::*;

impl AppState {
    pub async fn set_secret_word(&self, word: &str) -> Result<(), RoundError> {
        let mut engine = self.engine.lock().await;
        let events = engine.set_secret_word(word)?;
        self.publish(&engine, events);
        Ok(())
    }

    pub async fn set_timer(&self, seconds: i64) -> Result<(), RoundError> {
        let mut engine = self.engine.lock().await;
        let events = engine.set_timer(seconds)?;
        self.publish(&engine, events);
        Ok(())
    }

    /// Start a round. Returns false when nothing happened (already running or
    /// no word set).
    pub async fn start_game(&self) -> bool {
        let mut engine = self.engine.lock().await;
        let events = engine.start();
        let started = !events.is_empty();
        self.publish(&engine, events);
        started
    }

    /// Stop the running round. Returns false if no round was running.
    pub async fn stop_game(&self) -> bool {
        let mut engine = self.engine.lock().await;
        let events = engine.stop();
        let stopped = !events.is_empty();
        self.publish(&engine, events);
        stopped
    }

    /// Relay a chat message to viewers, then check it as a guess
    pub async fn handle_chat(&self, chat: ChatEvent) {
        let mut engine = self.engine.lock().await;

        self.broadcast_to_all(ServerMessage::Comment {
            id: ulid::Ulid::new().to_string(),
            username: chat.author_name.clone(),
            text: chat.text.clone(),
            avatar: chat.avatar_url.clone(),
        });

        let events = engine.submit_guess(&chat.author_name, &chat.text);
        self.publish(&engine, events);
    }

    pub async fn register_likes(&self, count: u64) {
        let mut engine = self.engine.lock().await;
        let events = engine.register_likes(count);
        self.publish(&engine, events);
    }

    pub async fn set_bonus_config(
        &self,
        seconds_per_threshold: u32,
        likes_per_threshold: u64,
        enabled: Option<bool>,
    ) -> Result<BonusConfig, RoundError> {
        let mut engine = self.engine.lock().await;
        let bonus = engine.set_bonus_config(seconds_per_threshold, likes_per_threshold, enabled)?;
        tracing::info!(
            "Bonus settings: +{}s per {} likes (enabled: {})",
            bonus.seconds_per_threshold,
            bonus.likes_per_threshold,
            bonus.enabled
        );
        self.broadcast_to_operator(ServerMessage::bonus_settings(bonus));
        Ok(bonus)
    }

    pub async fn reset_stats(&self) {
        let mut engine = self.engine.lock().await;
        let events = engine.reset_stats();
        self.publish(&engine, events);
    }

    pub async fn suggest_word(&self) -> Option<String> {
        self.engine.lock().await.suggest_word()
    }
}
