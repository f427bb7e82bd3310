//! Round lifecycle and bonus-time accrual
//!
//! `RoundEngine` is a plain state machine with two phases (Idle, Active).
//! Every operation returns the list of [`RoundEvent`]s it produced; the
//! caller (see [`super::AppState`]) turns those into broadcasts and owns the
//! countdown task. The engine itself never touches a clock.

use crate::types::*;
use rand::seq::IndexedRandom;

/// Thresholds crossed by one like event beyond which bonuses are merged
pub const MAX_BONUS_EVENTS: u64 = 100;

/// Errors for operator commands the engine refuses
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundError {
    #[error("Cannot change the secret word while a round is active")]
    RoundActive,

    #[error("Cannot change the timer while a round is active")]
    TimerLocked,

    #[error("Bonus settings must be positive (got {seconds}s per {likes} likes)")]
    InvalidBonus { seconds: u32, likes: u64 },
}

impl RoundError {
    /// Stable code sent to clients in `error` messages
    pub fn code(&self) -> &'static str {
        match self {
            RoundError::RoundActive => "ROUND_ACTIVE",
            RoundError::TimerLocked => "TIMER_LOCKED",
            RoundError::InvalidBonus { .. } => "INVALID_BONUS",
        }
    }
}

/// Something observable happened to the round or the stats
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundEvent {
    /// Word, timer or active flag changed; viewers need a fresh snapshot
    StateChanged,
    /// A round went Idle -> Active; its countdown must be started
    Started { round_id: RoundId },
    /// The operator stopped the round
    Stopped,
    /// Countdown reached zero
    TimedOut { word: String },
    /// A chat guess matched the word
    Won { winner: String, word: String },
    BonusApplied { seconds: u32, new_total: u32 },
    LikesRegistered { count: u64, total: u64 },
    StatsReset,
}

impl RoundEvent {
    /// Whether this event ends the round (Active -> Idle)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RoundEvent::Stopped | RoundEvent::TimedOut { .. } | RoundEvent::Won { .. }
        )
    }
}

pub struct RoundEngine {
    config: GameConfig,
    bonus: BonusConfig,
    round: RoundState,
    connection: ConnectionState,
}

impl RoundEngine {
    pub fn new(config: GameConfig) -> Self {
        Self {
            bonus: config.bonus,
            round: RoundState::new(config.default_timer_seconds),
            connection: ConnectionState::default(),
            config,
        }
    }

    pub fn round(&self) -> &RoundState {
        &self.round
    }

    pub fn bonus(&self) -> BonusConfig {
        self.bonus
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.round.active
    }

    /// Replace the secret word. Refused while a round is running.
    pub fn set_secret_word(&mut self, word: &str) -> Result<Vec<RoundEvent>, RoundError> {
        if self.round.active {
            return Err(RoundError::RoundActive);
        }

        self.round.secret_word = word.trim().to_string();
        self.round.like_accumulator = 0;
        Ok(vec![RoundEvent::StateChanged])
    }

    /// Set the countdown, clamped to the configured bounds
    pub fn set_timer(&mut self, seconds: i64) -> Result<Vec<RoundEvent>, RoundError> {
        if self.round.active && !self.config.allow_timer_edit_while_active {
            return Err(RoundError::TimerLocked);
        }

        self.round.remaining_seconds = self.config.clamp_timer(seconds);
        Ok(vec![RoundEvent::StateChanged])
    }

    /// Idle -> Active. No-op when already active or no word is set.
    pub fn start(&mut self) -> Vec<RoundEvent> {
        if self.round.active || self.round.secret_word.is_empty() {
            return Vec::new();
        }

        let round_id = ulid::Ulid::new().to_string();
        self.round.active = true;
        self.round.like_accumulator = 0;
        self.round.round_id = Some(round_id.clone());

        vec![RoundEvent::Started { round_id }, RoundEvent::StateChanged]
    }

    /// Active -> Idle on operator request. No-op when idle.
    pub fn stop(&mut self) -> Vec<RoundEvent> {
        if !self.round.active {
            return Vec::new();
        }

        self.round.active = false;
        vec![RoundEvent::Stopped, RoundEvent::StateChanged]
    }

    /// One countdown step for `round_id`. Ticks for any other round are stale
    /// and ignored.
    pub fn tick(&mut self, round_id: &str) -> Vec<RoundEvent> {
        if !self.round.active || self.round.round_id.as_deref() != Some(round_id) {
            return Vec::new();
        }

        self.round.remaining_seconds = self.round.remaining_seconds.saturating_sub(1);

        if self.round.remaining_seconds == 0 {
            self.round.active = false;
            vec![
                RoundEvent::StateChanged,
                RoundEvent::TimedOut {
                    word: self.round.secret_word.clone(),
                },
            ]
        } else {
            vec![RoundEvent::StateChanged]
        }
    }

    /// Check a chat message against the word (trimmed, case-insensitive)
    pub fn submit_guess(&mut self, author: &str, text: &str) -> Vec<RoundEvent> {
        if !self.round.active {
            return Vec::new();
        }

        if text.trim().to_lowercase() != self.round.secret_word.to_lowercase() {
            return Vec::new();
        }

        self.round.active = false;
        vec![
            RoundEvent::Won {
                winner: author.to_string(),
                word: self.round.secret_word.clone(),
            },
            RoundEvent::StateChanged,
        ]
    }

    /// Count likes; while a round runs, every full threshold grants bonus
    /// seconds. Leftover likes carry over to the next threshold.
    ///
    /// One `BonusApplied` is emitted per threshold crossed, up to
    /// [`MAX_BONUS_EVENTS`]. A bigger burst is reported as a single event
    /// carrying the combined seconds.
    pub fn register_likes(&mut self, count: u64) -> Vec<RoundEvent> {
        self.connection.total_likes = self.connection.total_likes.saturating_add(count);
        let mut events = vec![RoundEvent::LikesRegistered {
            count,
            total: self.connection.total_likes,
        }];

        if !self.round.active || !self.bonus.enabled {
            return events;
        }

        let threshold = self.bonus.likes_per_threshold;
        let accumulated = self.round.like_accumulator.saturating_add(count);
        let crossed = accumulated / threshold;
        self.round.like_accumulator = accumulated % threshold;

        if crossed == 0 {
            return events;
        }

        let seconds = self.bonus.seconds_per_threshold;
        if crossed <= MAX_BONUS_EVENTS {
            for _ in 0..crossed {
                self.round.remaining_seconds = self.round.remaining_seconds.saturating_add(seconds);
                events.push(RoundEvent::BonusApplied {
                    seconds,
                    new_total: self.round.remaining_seconds,
                });
            }
        } else {
            let crossed = u32::try_from(crossed).unwrap_or(u32::MAX);
            let seconds = seconds.saturating_mul(crossed);
            self.round.remaining_seconds = self.round.remaining_seconds.saturating_add(seconds);
            events.push(RoundEvent::BonusApplied {
                seconds,
                new_total: self.round.remaining_seconds,
            });
        }

        events
    }

    /// Replace the bonus settings. The running accumulator is left alone.
    pub fn set_bonus_config(
        &mut self,
        seconds_per_threshold: u32,
        likes_per_threshold: u64,
        enabled: Option<bool>,
    ) -> Result<BonusConfig, RoundError> {
        if seconds_per_threshold == 0 || likes_per_threshold == 0 {
            return Err(RoundError::InvalidBonus {
                seconds: seconds_per_threshold,
                likes: likes_per_threshold,
            });
        }

        self.bonus = BonusConfig {
            seconds_per_threshold,
            likes_per_threshold,
            enabled: enabled.unwrap_or(self.bonus.enabled),
        };
        Ok(self.bonus)
    }

    pub fn reset_stats(&mut self) -> Vec<RoundEvent> {
        self.connection.total_likes = 0;
        vec![RoundEvent::StatsReset]
    }

    pub fn set_connection(&mut self, connected: bool, username: Option<String>) {
        self.connection.connected_to_source = connected;
        if username.is_some() {
            self.connection.username = username;
        }
    }

    /// Random word from the pool for the operator to use
    pub fn suggest_word(&self) -> Option<String> {
        self.config.word_pool.choose(&mut rand::rng()).cloned()
    }
}
