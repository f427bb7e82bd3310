use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type RoundId = String;
pub type CommentId = String;

/// Shown to viewers when no secret word has been configured yet
pub const UNSET_WORD_PLACEHOLDER: &str = "_ _ _ _";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundPhase {
    Idle,
    Active,
}

/// The single round of the secret-word game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundState {
    /// Empty = no round configured
    pub secret_word: String,
    pub remaining_seconds: u32,
    pub active: bool,
    /// Likes collected towards the next bonus threshold
    pub like_accumulator: u64,
    /// Id of the round currently (or most recently) counting down
    pub round_id: Option<RoundId>,
}

impl RoundState {
    pub fn new(initial_seconds: u32) -> Self {
        Self {
            secret_word: String::new(),
            remaining_seconds: initial_seconds,
            active: false,
            like_accumulator: 0,
            round_id: None,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        if self.active {
            RoundPhase::Active
        } else {
            RoundPhase::Idle
        }
    }

    /// Viewer-visible form of the word: one underscore per character
    pub fn masked_word(&self) -> String {
        if self.secret_word.is_empty() {
            UNSET_WORD_PLACEHOLDER.to_string()
        } else {
            "_".repeat(self.secret_word.chars().count())
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BonusConfig {
    pub seconds_per_threshold: u32,
    pub likes_per_threshold: u64,
    /// When false, likes are still counted but never grant bonus time
    pub enabled: bool,
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            seconds_per_threshold: 5,
            likes_per_threshold: 10,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConnectionState {
    pub connected_to_source: bool,
    pub total_likes: u64,
    /// Platform username of the current subscription, if any
    pub username: Option<String>,
}

/// A chat message delivered by the live source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatEvent {
    pub author_name: String,
    pub text: String,
    pub avatar_url: Option<String>,
}

/// Limits and defaults for the round engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub default_timer_seconds: u32,
    pub min_timer_seconds: u32,
    pub max_timer_seconds: u32,
    /// Whether the operator may change the timer while a round is running
    pub allow_timer_edit_while_active: bool,
    pub bonus: BonusConfig,
    pub word_pool: Vec<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            default_timer_seconds: 60,
            min_timer_seconds: 0,
            max_timer_seconds: 300,
            allow_timer_edit_while_active: false,
            bonus: BonusConfig::default(),
            word_pool: DEFAULT_WORD_POOL.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl GameConfig {
    /// Load game config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_timer_seconds =
            env_parse("DEFAULT_TIMER_SECONDS").unwrap_or(defaults.default_timer_seconds);
        let max_timer_seconds =
            env_parse("TIMER_MAX_SECONDS").unwrap_or(defaults.max_timer_seconds);
        let allow_timer_edit_while_active = std::env::var("ALLOW_TIMER_EDIT_WHILE_ACTIVE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.allow_timer_edit_while_active);

        let bonus = BonusConfig {
            seconds_per_threshold: env_parse("BONUS_SECONDS")
                .filter(|s| *s > 0)
                .unwrap_or(defaults.bonus.seconds_per_threshold),
            likes_per_threshold: env_parse("BONUS_LIKES")
                .filter(|l| *l > 0)
                .unwrap_or(defaults.bonus.likes_per_threshold),
            enabled: std::env::var("BONUS_ENABLED")
                .map(|v| v != "0" && v.to_lowercase() != "false")
                .unwrap_or(defaults.bonus.enabled),
        };

        let word_pool = std::env::var("WORD_POOL")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|w| w.trim().to_string())
                    .filter(|w| !w.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|pool| !pool.is_empty())
            .unwrap_or(defaults.word_pool);

        if default_timer_seconds > max_timer_seconds {
            tracing::warn!(
                "DEFAULT_TIMER_SECONDS ({}) exceeds TIMER_MAX_SECONDS ({}), clamping",
                default_timer_seconds,
                max_timer_seconds
            );
        }

        Self {
            default_timer_seconds: default_timer_seconds.min(max_timer_seconds),
            min_timer_seconds: defaults.min_timer_seconds,
            max_timer_seconds,
            allow_timer_edit_while_active,
            bonus,
            word_pool,
        }
    }

    pub fn clamp_timer(&self, seconds: i64) -> u32 {
        seconds.clamp(self.min_timer_seconds as i64, self.max_timer_seconds as i64) as u32
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Words offered to the operator by "suggest a word"
pub const DEFAULT_WORD_POOL: &[&str] = &[
    "سيارة", "قطار", "طائرة", "دراجة", "تفاحة", "موزة", "برتقال", "عنب", "قلم", "كتاب", "مدرسة",
    "طالب", "بيت", "شقة", "غرفة", "مطبخ",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Operator,
    Viewer,
}
