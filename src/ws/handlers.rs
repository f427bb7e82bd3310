//! WebSocket message dispatch
//!
//! Authorization is checked here, then dispatched to the operator handlers.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Role;
use std::sync::Arc;

use super::operator;

/// Macro to check operator authorization and return early if unauthorized
macro_rules! check_operator {
    ($role:expr, $action:expr) => {
        if *$role != Role::Operator {
            return Some(ServerMessage::Error {
                code: "UNAUTHORIZED".to_string(),
                msg: format!("Only the operator can {}", $action),
            });
        }
    };
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    role: &Role,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::UpdateSecretWord { word } => {
            check_operator!(role, "set the secret word");
            operator::handle_update_secret_word(state, word).await
        }

        ClientMessage::UpdateTimer { seconds } => {
            check_operator!(role, "set the timer");
            operator::handle_update_timer(state, seconds).await
        }

        ClientMessage::RequestNewWord => {
            check_operator!(role, "request words");
            operator::handle_request_new_word(state).await
        }

        ClientMessage::UpdateBonusSettings {
            bonus_time,
            likes_required,
            enabled,
        } => {
            check_operator!(role, "change bonus settings");
            operator::handle_update_bonus_settings(state, bonus_time, likes_required, enabled)
                .await
        }

        ClientMessage::StartGame => {
            check_operator!(role, "start the game");
            operator::handle_start_game(state).await
        }

        ClientMessage::StopGame => {
            check_operator!(role, "stop the game");
            operator::handle_stop_game(state).await
        }

        ClientMessage::ResetStats => {
            check_operator!(role, "reset stats");
            operator::handle_reset_stats(state).await
        }

        ClientMessage::ConnectTiktok { username } => {
            check_operator!(role, "connect the live source");
            operator::handle_connect_source(state, username).await
        }

        ClientMessage::DisconnectSource => {
            check_operator!(role, "disconnect the live source");
            operator::handle_disconnect_source(state).await
        }
    }
}
