use crate::types::*;
use serde::{Deserialize, Serialize};

/// Commands sent by clients. All of them are operator-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    UpdateSecretWord {
        word: String,
    },
    UpdateTimer {
        seconds: i64,
    },
    /// Ask for a random word from the pool (reply goes to the requester only)
    RequestNewWord,
    UpdateBonusSettings {
        bonus_time: u32,
        likes_required: u64,
        #[serde(default)]
        enabled: Option<bool>,
    },
    StartGame,
    StopGame,
    ResetStats,
    /// Subscribe to a live stream by platform username
    #[serde(rename = "connect-tiktok")]
    ConnectTiktok {
        username: String,
    },
    DisconnectSource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        role: Role,
        server_now: String,
    },
    /// Masked round snapshot. `connected` and `total_likes` are only filled in
    /// on the initial snapshot a client receives after connecting.
    GameState {
        secret_word: String,
        timer: u32,
        is_active: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        connected: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        total_likes: Option<u64>,
    },
    Comment {
        id: CommentId,
        username: String,
        text: String,
        avatar: Option<String>,
    },
    Like {
        count: u64,
        total: u64,
    },
    CorrectAnswer {
        username: String,
        word: String,
    },
    GameOver {
        word: String,
    },
    BonusTime {
        seconds: u32,
        new_total: u32,
    },
    StatsReset,
    ConnectionStatus {
        connected: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    NewWordSuggestion {
        word: String,
    },
    /// Operator-only: current bonus settings after a change
    BonusSettings {
        bonus_time: u32,
        likes_required: u64,
        enabled: bool,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    /// Masked snapshot of the round as seen by viewers
    pub fn game_state(round: &RoundState) -> Self {
        ServerMessage::GameState {
            secret_word: round.masked_word(),
            timer: round.remaining_seconds,
            is_active: round.active,
            connected: None,
            total_likes: None,
        }
    }

    pub fn bonus_settings(bonus: BonusConfig) -> Self {
        ServerMessage::BonusSettings {
            bonus_time: bonus.seconds_per_threshold,
            likes_required: bonus.likes_per_threshold,
            enabled: bonus.enabled,
        }
    }

    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            msg: msg.into(),
        }
    }
}

/// Body of `POST /api/connect`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectRequest {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
