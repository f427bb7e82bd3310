use likeguess::protocol::{ClientMessage, ServerMessage};
use likeguess::source::ManualSource;
use likeguess::state::AppState;
use likeguess::types::{GameConfig, Role};
use likeguess::ws::handlers::handle_message;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Wait for the first broadcast matching `pred`, skipping everything else
async fn wait_for<F>(rx: &mut broadcast::Receiver<ServerMessage>, mut pred: F) -> ServerMessage
where
    F: FnMut(&ServerMessage) -> bool,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for broadcast")
            .expect("broadcast closed");
        if pred(&msg) {
            return msg;
        }
    }
}

/// End-to-end round driven by operator commands and live chat/likes
#[tokio::test]
async fn test_full_round_flow() {
    let source = Arc::new(ManualSource::new());
    let state = Arc::new(AppState::with_config(
        GameConfig::default(),
        Some(source.clone()),
    ));
    let operator = Role::Operator;
    let mut rx = state.broadcast.subscribe();
    let mut operator_rx = state.operator_broadcast.subscribe();

    // 1. Connect the live source
    let result = handle_message(
        ClientMessage::ConnectTiktok {
            username: "streamer".to_string(),
        },
        &operator,
        &state,
    )
    .await;
    assert!(result.is_none(), "connect should not reply directly");
    match wait_for(&mut rx, |m| matches!(m, ServerMessage::ConnectionStatus { .. })).await {
        ServerMessage::ConnectionStatus { connected, error } => {
            assert!(connected);
            assert!(error.is_none());
        }
        _ => unreachable!(),
    }

    // 2. Configure the round
    handle_message(
        ClientMessage::UpdateSecretWord {
            word: "  Car ".to_string(),
        },
        &operator,
        &state,
    )
    .await;
    match wait_for(&mut rx, |m| matches!(m, ServerMessage::GameState { .. })).await {
        ServerMessage::GameState {
            secret_word,
            is_active,
            ..
        } => {
            assert_eq!(secret_word, "___", "viewers only see the masked word");
            assert!(!is_active);
        }
        _ => unreachable!(),
    }

    handle_message(ClientMessage::UpdateTimer { seconds: 45 }, &operator, &state).await;
    assert_eq!(state.get_round().await.remaining_seconds, 45);

    let result = handle_message(
        ClientMessage::UpdateBonusSettings {
            bonus_time: 3,
            likes_required: 5,
            enabled: None,
        },
        &operator,
        &state,
    )
    .await;
    assert!(result.is_none());
    assert_eq!(
        operator_rx.recv().await.unwrap(),
        ServerMessage::BonusSettings {
            bonus_time: 3,
            likes_required: 5,
            enabled: true,
        }
    );

    // 3. Start the round
    handle_message(ClientMessage::StartGame, &operator, &state).await;
    assert!(state.get_round().await.active);

    // 4. A burst of likes crosses the threshold twice
    assert!(source.like(12).await);
    let mut bonuses = 0;
    while bonuses < 2 {
        if let ServerMessage::BonusTime { seconds, .. } =
            wait_for(&mut rx, |m| matches!(m, ServerMessage::BonusTime { .. })).await
        {
            assert_eq!(seconds, 3);
            bonuses += 1;
        }
    }
    assert_eq!(state.get_round().await.like_accumulator, 2);
    assert_eq!(state.get_connection().await.total_likes, 12);

    // 5. A wrong guess is relayed but does not end the round
    assert!(source.chat("alice", "bike").await);
    match wait_for(&mut rx, |m| matches!(m, ServerMessage::Comment { .. })).await {
        ServerMessage::Comment { username, text, .. } => {
            assert_eq!(username, "alice");
            assert_eq!(text, "bike");
        }
        _ => unreachable!(),
    }
    assert!(state.get_round().await.active);

    // 6. A correct guess, case-insensitive, wins
    assert!(source.chat("bob", " CAR ").await);
    match wait_for(&mut rx, |m| matches!(m, ServerMessage::CorrectAnswer { .. })).await {
        ServerMessage::CorrectAnswer { username, word } => {
            assert_eq!(username, "bob");
            assert_eq!(word, "Car");
        }
        _ => unreachable!(),
    }
    assert!(!state.get_round().await.active);

    // 7. Later guesses are ignored
    assert!(source.chat("carol", "car").await);
    wait_for(&mut rx, |m| {
        matches!(m, ServerMessage::Comment { username, .. } if username == "carol")
    })
    .await;
    assert!(!state.get_round().await.active);

    // 8. Reset stats
    handle_message(ClientMessage::ResetStats, &operator, &state).await;
    wait_for(&mut rx, |m| matches!(m, ServerMessage::StatsReset)).await;
    assert_eq!(state.get_connection().await.total_likes, 0);

    // 9. Disconnect
    handle_message(ClientMessage::DisconnectSource, &operator, &state).await;
    match wait_for(&mut rx, |m| matches!(m, ServerMessage::ConnectionStatus { .. })).await {
        ServerMessage::ConnectionStatus { connected, .. } => assert!(!connected),
        _ => unreachable!(),
    }
}

/// Viewers can watch but not steer the round
#[tokio::test]
async fn test_viewer_commands_are_rejected() {
    let state = Arc::new(AppState::new());
    let viewer = Role::Viewer;

    let commands = vec![
        ClientMessage::UpdateSecretWord {
            word: "car".to_string(),
        },
        ClientMessage::UpdateTimer { seconds: 30 },
        ClientMessage::RequestNewWord,
        ClientMessage::UpdateBonusSettings {
            bonus_time: 1,
            likes_required: 1,
            enabled: None,
        },
        ClientMessage::StartGame,
        ClientMessage::StopGame,
        ClientMessage::ResetStats,
        ClientMessage::ConnectTiktok {
            username: "x".to_string(),
        },
        ClientMessage::DisconnectSource,
    ];

    for command in commands {
        match handle_message(command, &viewer, &state).await {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "UNAUTHORIZED"),
            other => panic!("Expected UNAUTHORIZED, got {:?}", other),
        }
    }

    let round = state.get_round().await;
    assert!(round.secret_word.is_empty());
    assert!(!round.active);
}

/// Round runs out with no correct guess
#[tokio::test(start_paused = true)]
async fn test_round_times_out() {
    let state = Arc::new(AppState::new());
    let operator = Role::Operator;
    let mut rx = state.broadcast.subscribe();

    handle_message(
        ClientMessage::UpdateSecretWord {
            word: "car".to_string(),
        },
        &operator,
        &state,
    )
    .await;
    handle_message(ClientMessage::UpdateTimer { seconds: 5 }, &operator, &state).await;
    handle_message(ClientMessage::StartGame, &operator, &state).await;

    // Start again while running is a no-op
    handle_message(ClientMessage::StartGame, &operator, &state).await;

    tokio::time::sleep(Duration::from_secs(8)).await;

    let mut timers = Vec::new();
    let mut game_overs = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        match msg {
            ServerMessage::GameState {
                timer,
                is_active: true,
                ..
            } => timers.push(timer),
            ServerMessage::GameOver { word } => game_overs.push(word),
            _ => {}
        }
    }

    assert_eq!(timers, vec![5, 4, 3, 2, 1]);
    assert_eq!(game_overs, vec!["car".to_string()]);
    assert!(!state.get_round().await.active);
}

/// Operator command errors come back to the sender only
#[tokio::test]
async fn test_operator_errors() {
    let state = Arc::new(AppState::new());
    let operator = Role::Operator;

    match handle_message(
        ClientMessage::UpdateBonusSettings {
            bonus_time: 0,
            likes_required: 10,
            enabled: None,
        },
        &operator,
        &state,
    )
    .await
    {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "INVALID_BONUS"),
        other => panic!("Expected INVALID_BONUS, got {:?}", other),
    }

    match handle_message(
        ClientMessage::ConnectTiktok {
            username: "streamer".to_string(),
        },
        &operator,
        &state,
    )
    .await
    {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "SOURCE_UNAVAILABLE"),
        other => panic!("Expected SOURCE_UNAVAILABLE, got {:?}", other),
    }

    match handle_message(ClientMessage::RequestNewWord, &operator, &state).await {
        Some(ServerMessage::NewWordSuggestion { word }) => assert!(!word.is_empty()),
        other => panic!("Expected NewWordSuggestion, got {:?}", other),
    }
}
