mod countdown;
mod game;
mod live;
pub mod round;

use crate::protocol::ServerMessage;
use crate::source::{LiveSource, SourceManager};
use crate::types::*;
use round::{RoundEngine, RoundEvent};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

pub use round::RoundError;

/// Shared application state
///
/// All round mutations go through the `engine` mutex, so commands from the
/// operator, chat/like events from the live source and countdown ticks never
/// interleave.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Mutex<RoundEngine>>,
    /// The single running countdown task, if any.
    /// Only touched while the engine lock is held.
    countdown: Arc<StdMutex<Option<JoinHandle<()>>>>,
    /// Broadcast channel for sending messages to all clients
    pub broadcast: broadcast::Sender<ServerMessage>,
    /// Broadcast channel for operator-only notices
    pub operator_broadcast: broadcast::Sender<ServerMessage>,
    /// Live stream connector (None = not configured)
    pub source: Option<Arc<SourceManager>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(GameConfig::default(), None)
    }

    pub fn with_config(config: GameConfig, source: Option<Arc<dyn LiveSource>>) -> Self {
        let (tx, _rx) = broadcast::channel(256);
        let (operator_tx, _operator_rx) = broadcast::channel(64);
        Self {
            engine: Arc::new(Mutex::new(RoundEngine::new(config))),
            countdown: Arc::new(StdMutex::new(None)),
            broadcast: tx,
            operator_broadcast: operator_tx,
            source: source.map(|s| Arc::new(SourceManager::new(s))),
        }
    }

    /// Send to every connected client
    pub fn broadcast_to_all(&self, msg: ServerMessage) {
        // Ignore send errors (no receivers connected is fine)
        let _ = self.broadcast.send(msg);
    }

    /// Send to operator sessions only
    pub fn broadcast_to_operator(&self, msg: ServerMessage) {
        let _ = self.operator_broadcast.send(msg);
    }

    /// Full snapshot for a client that just connected
    pub async fn snapshot(&self) -> ServerMessage {
        let engine = self.engine.lock().await;
        let connection = engine.connection();
        ServerMessage::GameState {
            secret_word: engine.round().masked_word(),
            timer: engine.round().remaining_seconds,
            is_active: engine.round().active,
            connected: Some(connection.connected_to_source),
            total_likes: Some(connection.total_likes),
        }
    }

    pub async fn get_round(&self) -> RoundState {
        self.engine.lock().await.round().clone()
    }

    pub async fn get_connection(&self) -> ConnectionState {
        self.engine.lock().await.connection().clone()
    }

    pub async fn get_bonus(&self) -> BonusConfig {
        self.engine.lock().await.bonus()
    }

    /// Turn engine events into broadcasts and countdown changes.
    /// Must be called with the engine lock held so messages go out in
    /// mutation order.
    fn publish(&self, engine: &RoundEngine, events: Vec<RoundEvent>) {
        for event in events {
            match event {
                RoundEvent::StateChanged => {
                    self.broadcast_to_all(ServerMessage::game_state(engine.round()));
                }
                RoundEvent::Started { round_id } => {
                    tracing::info!(
                        "Round {} started with {}s on the clock",
                        round_id,
                        engine.round().remaining_seconds
                    );
                    self.start_countdown(round_id);
                }
                RoundEvent::Stopped => {
                    tracing::info!("Round stopped by operator");
                    self.cancel_countdown();
                }
                RoundEvent::TimedOut { word } => {
                    tracing::info!("Round timed out, word was {:?}", word);
                    self.cancel_countdown();
                    self.broadcast_to_all(ServerMessage::GameOver { word });
                }
                RoundEvent::Won { winner, word } => {
                    tracing::info!("{} guessed the word {:?}", winner, word);
                    self.cancel_countdown();
                    self.broadcast_to_all(ServerMessage::CorrectAnswer {
                        username: winner,
                        word,
                    });
                }
                RoundEvent::BonusApplied { seconds, new_total } => {
                    tracing::debug!("Bonus +{}s, now {}s", seconds, new_total);
                    self.broadcast_to_all(ServerMessage::BonusTime { seconds, new_total });
                }
                RoundEvent::LikesRegistered { count, total } => {
                    self.broadcast_to_all(ServerMessage::Like { count, total });
                }
                RoundEvent::StatsReset => {
                    self.broadcast_to_all(ServerMessage::StatsReset);
                }
            }
        }
    }

    fn countdown_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.countdown.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
