//! Operator-only command handlers
//!
//! All handlers in this module require the Operator role.
//! Authorization is checked in the main dispatch layer before calling these.

use crate::protocol::ServerMessage;
use crate::state::{AppState, RoundError};
use std::sync::Arc;

fn round_error(e: RoundError) -> Option<ServerMessage> {
    Some(ServerMessage::error(e.code(), e.to_string()))
}

pub async fn handle_update_secret_word(
    state: &Arc<AppState>,
    word: String,
) -> Option<ServerMessage> {
    tracing::info!(
        "Operator setting secret word ({} chars)",
        word.trim().chars().count()
    );
    match state.set_secret_word(&word).await {
        Ok(()) => None,
        Err(e) => round_error(e),
    }
}

pub async fn handle_update_timer(state: &Arc<AppState>, seconds: i64) -> Option<ServerMessage> {
    tracing::info!("Operator setting timer to {}s", seconds);
    match state.set_timer(seconds).await {
        Ok(()) => None,
        Err(e) => round_error(e),
    }
}

pub async fn handle_request_new_word(state: &Arc<AppState>) -> Option<ServerMessage> {
    match state.suggest_word().await {
        Some(word) => Some(ServerMessage::NewWordSuggestion { word }),
        None => Some(ServerMessage::error("NO_WORDS", "The word pool is empty")),
    }
}

pub async fn handle_update_bonus_settings(
    state: &Arc<AppState>,
    bonus_time: u32,
    likes_required: u64,
    enabled: Option<bool>,
) -> Option<ServerMessage> {
    match state.set_bonus_config(bonus_time, likes_required, enabled).await {
        Ok(_) => None,
        Err(e) => round_error(e),
    }
}

pub async fn handle_start_game(state: &Arc<AppState>) -> Option<ServerMessage> {
    if !state.start_game().await {
        tracing::debug!("Start ignored: round already running or no word set");
    }
    None
}

pub async fn handle_stop_game(state: &Arc<AppState>) -> Option<ServerMessage> {
    if !state.stop_game().await {
        tracing::debug!("Stop ignored: no round running");
    }
    None
}

pub async fn handle_reset_stats(state: &Arc<AppState>) -> Option<ServerMessage> {
    tracing::info!("Operator resetting stats");
    state.reset_stats().await;
    None
}

pub async fn handle_connect_source(
    state: &Arc<AppState>,
    username: String,
) -> Option<ServerMessage> {
    let username = username.trim();
    if username.is_empty() {
        return Some(ServerMessage::error("INVALID_USERNAME", "Username is required"));
    }

    match state.connect_source(username).await {
        Ok(()) => None,
        // Already reported to everyone as connectionStatus
        Err(e) => Some(ServerMessage::error("SOURCE_UNAVAILABLE", e.to_string())),
    }
}

pub async fn handle_disconnect_source(state: &Arc<AppState>) -> Option<ServerMessage> {
    if !state.disconnect_source().await {
        tracing::debug!("Disconnect ignored: no active subscription");
    }
    None
}
