use super::AppState;
use crate::types::RoundId;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Countdown granularity
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

impl AppState {
    /// Spawn the countdown for `round_id`, aborting any previous one first.
    /// Called with the engine lock held.
    pub(super) fn start_countdown(&self, round_id: RoundId) {
        let mut slot = self.countdown_slot();
        if let Some(previous) = slot.take() {
            tracing::debug!("Aborting previous countdown");
            previous.abort();
        }

        let state = self.clone();
        *slot = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if !state.tick(&round_id).await {
                    break;
                }
            }
            tracing::debug!("Countdown for round {} finished", round_id);
        }));
    }

    /// Called with the engine lock held.
    pub(super) fn cancel_countdown(&self) {
        if let Some(handle) = self.countdown_slot().take() {
            handle.abort();
        }
    }

    /// Whether a countdown task is currently registered
    pub fn has_countdown(&self) -> bool {
        self.countdown_slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// One countdown step. Returns false once the round is no longer the
    /// running one and the countdown should end.
    async fn tick(&self, round_id: &str) -> bool {
        let mut engine = self.engine.lock().await;
        let events = engine.tick(round_id);
        let still_running =
            engine.is_active() && engine.round().round_id.as_deref() == Some(round_id);

        self.publish(&engine, events);
        still_running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ServerMessage;
    use crate::types::GameConfig;

    async fn started_state(word: &str, seconds: i64) -> AppState {
        let state = AppState::with_config(GameConfig::default(), None);
        state.set_secret_word(word).await.unwrap();
        state.set_timer(seconds).await.unwrap();
        state.start_game().await;
        state
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_decrements_once_per_second() {
        let state = started_state("car", 10).await;

        tokio::time::sleep(Duration::from_millis(3500)).await;

        let round = state.get_round().await;
        assert_eq!(round.remaining_seconds, 7);
        assert!(round.active);
        state.stop_game().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_single_countdown() {
        let state = started_state("car", 10).await;
        // Second start must neither restart nor add a second countdown
        state.start_game().await;
        state.start_game().await;

        tokio::time::sleep(Duration::from_millis(4500)).await;

        assert_eq!(state.get_round().await.remaining_seconds, 6);
        state.stop_game().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_times_out_and_broadcasts_game_over() {
        let state = AppState::new();
        let mut rx = state.broadcast.subscribe();
        state.set_secret_word("car").await.unwrap();
        state.set_timer(3).await.unwrap();
        state.start_game().await;

        tokio::time::sleep(Duration::from_secs(10)).await;

        let round = state.get_round().await;
        assert!(!round.active);
        assert_eq!(round.remaining_seconds, 0);
        assert!(!state.has_countdown());

        let mut game_overs = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let ServerMessage::GameOver { word } = msg {
                game_overs.push(word);
            }
        }
        assert_eq!(game_overs, vec!["car".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_countdown() {
        let state = started_state("car", 10).await;
        tokio::time::sleep(Duration::from_millis(2500)).await;

        state.stop_game().await;
        assert!(!state.has_countdown());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(state.get_round().await.remaining_seconds, 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_countdown() {
        let state = started_state("car", 10).await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        state.stop_game().await;

        state.start_game().await;
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // 1 tick from the first round, 2 from the second
        assert_eq!(state.get_round().await.remaining_seconds, 7);
        state.stop_game().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_bonus_extends_running_countdown() {
        let state = AppState::new();
        state.set_secret_word("car").await.unwrap();
        state.set_timer(10).await.unwrap();
        state.set_bonus_config(3, 5, None).await.unwrap();
        state.start_game().await;

        state.register_likes(5).await;
        assert_eq!(state.get_round().await.remaining_seconds, 13);

        tokio::time::sleep(Duration::from_millis(12500)).await;
        assert!(state.get_round().await.active);

        tokio::time::sleep(Duration::from_secs(1)).await;
        let round = state.get_round().await;
        assert!(!round.active);
        assert_eq!(round.remaining_seconds, 0);
    }
}
