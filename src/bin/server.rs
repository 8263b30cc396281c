use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use maze_chase_rust_server::autopilot::Autopilot;
use maze_chase_rust_server::constants::TICK_MS;
use maze_chase_rust_server::engine::{GameEngine, GameEngineOptions};
use maze_chase_rust_server::levels::LevelTable;
use maze_chase_rust_server::server_protocol::{parse_client_message, ParsedClientMessage};
use maze_chase_rust_server::server_utils::{
    normalize_level, normalize_seed, parse_port, session_id_from,
};
use maze_chase_rust_server::types::Direction;
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Clone)]
struct ClientContext {
    tx: mpsc::Sender<OutboundMessage>,
}

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

struct Session {
    id: String,
    seed: u32,
    engine: GameEngine,
    autopilot: Option<Autopilot>,
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    levels: LevelTable,
    session: Option<Session>,
}

impl ServerState {
    fn new(levels: LevelTable) -> Self {
        Self {
            clients: HashMap::new(),
            levels,
            session: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    details: Value,
}

#[tokio::main]
async fn main() {
    let port = parse_port(std::env::var("PORT").ok().as_deref());

    let levels = match std::env::var("LEVELS_PATH") {
        Ok(raw) => {
            let path = PathBuf::from(raw);
            match LevelTable::load(&path) {
                Ok(table) => table,
                Err(error) => {
                    emit_log(
                        "error",
                        "level_table_failed",
                        None,
                        json!({
                            "path": path.to_string_lossy(),
                            "message": error.to_string(),
                        }),
                    );
                    std::process::exit(2);
                }
            }
        }
        Err(_) => LevelTable::classic(),
    };

    let state = Arc::new(Mutex::new(ServerState::new(levels)));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            emit_log(
                "error",
                "bind_failed",
                None,
                json!({ "addr": bind_addr, "message": error.to_string() }),
            );
            std::process::exit(2);
        }
    };

    emit_log("info", "listening", None, json!({ "port": port }));
    if let Err(error) = axum::serve(listener, app).await {
        emit_log(
            "error",
            "server_failed",
            None,
            json!({ "message": error.to_string() }),
        );
        std::process::exit(1);
    }
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);

    {
        let mut guard = state.lock().await;
        guard
            .clients
            .insert(client_id.clone(), ClientContext { tx: tx.clone() });
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                let mut guard = state.lock().await;
                handle_client_message(&mut guard, &client_id, raw.as_str());
            }
            Message::Binary(raw) => {
                let mut guard = state.lock().await;
                match std::str::from_utf8(&raw) {
                    Ok(text) => handle_client_message(&mut guard, &client_id, text),
                    Err(_) => send_error(&mut guard, &client_id, "invalid utf8 message"),
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    {
        let mut guard = state.lock().await;
        guard.clients.remove(&client_id);
    }
    drop(tx);
    let _ = writer.await;
}

fn handle_client_message(state: &mut ServerState, client_id: &str, raw: &str) {
    let Some(message) = parse_client_message(raw) else {
        send_error(state, client_id, "invalid message");
        return;
    };

    match message {
        ParsedClientMessage::Start {
            level,
            seed,
            autopilot,
        } => {
            let fallback_seed = rand::rng().random::<u32>();
            start_session(
                state,
                normalize_level(level),
                normalize_seed(seed, fallback_seed),
                autopilot,
            );
        }
        ParsedClientMessage::Input { dir } => {
            let Some(session) = state.session.as_mut() else {
                send_error(state, client_id, "no active session");
                return;
            };
            if session.autopilot.is_none() {
                session.engine.receive_input(dir);
            }
        }
        ParsedClientMessage::Pause => {
            let Some(session) = state.session.as_mut() else {
                send_error(state, client_id, "no active session");
                return;
            };
            session.engine.pause();
        }
        ParsedClientMessage::Resume => {
            let Some(session) = state.session.as_mut() else {
                send_error(state, client_id, "no active session");
                return;
            };
            session.engine.resume();
        }
        ParsedClientMessage::Ping { t } => {
            send_to_client(
                state,
                client_id,
                &json!({
                    "type": "pong",
                    "t": t,
                    "serverTime": now_ms(),
                }),
                QueuePolicy::DropOnFull,
            );
        }
    }
}

/// Replaces any running session. The previous one is abandoned without a
/// `game_over` broadcast.
fn start_session(state: &mut ServerState, level: u32, seed: u32, autopilot: bool) {
    if let Some(previous) = state.session.take() {
        emit_log(
            "info",
            "session_abandoned",
            Some(&previous.id),
            json!({ "tick": previous.engine.tick() }),
        );
    }

    let engine = GameEngine::new(GameEngineOptions {
        seed,
        start_level: level,
        level_table: state.levels.clone(),
        ..GameEngineOptions::default()
    });
    let session = Session {
        id: session_id_from(rand::rng().random::<u64>()),
        seed,
        autopilot: autopilot.then(|| Autopilot::new(seed ^ 0x9e37_79b9)),
        engine,
    };

    emit_log(
        "info",
        "session_started",
        Some(&session.id),
        json!({
            "level": level,
            "seed": seed,
            "autopilot": autopilot,
        }),
    );
    let init = json!({
        "type": "maze_init",
        "sessionId": session.id,
        "seed": seed,
        "maze": session.engine.maze_init(),
    });
    state.session = Some(session);
    broadcast(state, &init, QueuePolicy::DisconnectOnFull);
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_game(&mut guard);
        }
    });
}

fn tick_game(state: &mut ServerState) {
    let (snapshot, summary) = {
        let Some(session) = state.session.as_mut() else {
            return;
        };
        if let Some(autopilot) = session.autopilot.as_mut() {
            let dir = autopilot.decide(&session.engine);
            if dir != Direction::None {
                session.engine.receive_input(dir);
            }
        }
        session.engine.step(TICK_MS);
        let snapshot = session.engine.build_snapshot(true);
        let summary = session
            .engine
            .is_ended()
            .then(|| session.engine.build_summary());
        (snapshot, summary)
    };

    broadcast(
        state,
        &json!({
            "type": "state",
            "snapshot": snapshot,
        }),
        QueuePolicy::DropOnFull,
    );

    let Some(summary) = summary else {
        return;
    };
    if let Some(session) = state.session.take() {
        emit_log(
            "info",
            "session_finished",
            Some(&session.id),
            json!({
                "seed": session.seed,
                "finalScore": summary.final_score,
                "levelReached": summary.level_reached,
            }),
        );
    }
    broadcast(
        state,
        &json!({
            "type": "game_over",
            "summary": summary,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = if let Some(client) = state.clients.get(client_id) {
        client
            .tx
            .try_send(OutboundMessage::Text(message.to_string()))
            .is_err()
    } else {
        false
    };
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        disconnect_client(state, client_id);
    }
}

fn broadcast(state: &mut ServerState, message: &Value, policy: QueuePolicy) {
    let payload = message.to_string();
    let mut failed_clients = Vec::new();
    for (client_id, client) in &state.clients {
        if client
            .tx
            .try_send(OutboundMessage::Text(payload.clone()))
            .is_err()
            && policy == QueuePolicy::DisconnectOnFull
        {
            failed_clients.push(client_id.clone());
        }
    }
    for client_id in failed_clients {
        disconnect_client(state, &client_id);
    }
}

fn disconnect_client(state: &mut ServerState, client_id: &str) {
    let Some(client) = state.clients.remove(client_id) else {
        return;
    };
    let _ = client.tx.try_send(OutboundMessage::Close {
        code: 1013,
        reason: "outbound queue overflow".to_string(),
    });
}

fn send_error(state: &mut ServerState, client_id: &str, message: &str) {
    send_to_client(
        state,
        client_id,
        &json!({
            "type": "error",
            "message": message,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn emit_log(level: &str, event: &str, session_id: Option<&str>, details: Value) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        session_id: session_id.map(|value| value.to_string()),
        details,
    };
    if let Ok(line) = serde_json::to_string(&log_line) {
        eprintln!("{line}");
    }
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_client(id: &str) -> (ServerState, mpsc::Receiver<OutboundMessage>) {
        let mut state = ServerState::new(LevelTable::classic());
        let (tx, rx) = mpsc::channel(64);
        state.clients.insert(id.to_string(), ClientContext { tx });
        (state, rx)
    }

    fn next_json(rx: &mut mpsc::Receiver<OutboundMessage>) -> Value {
        match rx.try_recv().expect("a queued message") {
            OutboundMessage::Text(payload) => {
                serde_json::from_str(&payload).expect("outbound payload is json")
            }
            OutboundMessage::Close { code, .. } => panic!("unexpected close {code}"),
        }
    }

    #[test]
    fn malformed_messages_get_an_error_reply() {
        let (mut state, mut rx) = state_with_client("client_a");
        handle_client_message(&mut state, "client_a", "{not json");
        let reply = next_json(&mut rx);
        assert_eq!(reply["type"], "error");
        assert!(state.session.is_none());
    }

    #[test]
    fn commands_without_a_session_are_rejected() {
        let (mut state, mut rx) = state_with_client("client_a");
        handle_client_message(&mut state, "client_a", r#"{"type":"pause"}"#);
        assert_eq!(next_json(&mut rx)["type"], "error");
        handle_client_message(&mut state, "client_a", r#"{"type":"input","dir":"left"}"#);
        assert_eq!(next_json(&mut rx)["type"], "error");
    }

    #[test]
    fn ping_is_answered_with_pong() {
        let (mut state, mut rx) = state_with_client("client_a");
        handle_client_message(&mut state, "client_a", r#"{"type":"ping","t":5}"#);
        let reply = next_json(&mut rx);
        assert_eq!(reply["type"], "pong");
        assert_eq!(reply["t"], 5.0);
    }

    #[test]
    fn start_broadcasts_maze_init_with_the_requested_seed() {
        let (mut state, mut rx) = state_with_client("client_a");
        handle_client_message(
            &mut state,
            "client_a",
            r#"{"type":"start","level":4,"seed":77}"#,
        );
        let init = next_json(&mut rx);
        assert_eq!(init["type"], "maze_init");
        assert_eq!(init["seed"], 77);
        let session = state.session.as_ref().expect("session started");
        assert_eq!(session.engine.level(), 4);
        assert!(session.autopilot.is_none());
        assert!(session.id.starts_with("session_"));
    }

    #[test]
    fn ticks_broadcast_state_snapshots() {
        let (mut state, mut rx) = state_with_client("client_a");
        start_session(&mut state, 1, 3, false);
        let _ = next_json(&mut rx);
        tick_game(&mut state);
        let update = next_json(&mut rx);
        assert_eq!(update["type"], "state");
        assert!(update["snapshot"].is_object());
        assert_eq!(state.session.as_ref().map(|s| s.engine.tick()), Some(1));
    }

    #[test]
    fn pause_holds_the_clock() {
        let (mut state, mut rx) = state_with_client("client_a");
        start_session(&mut state, 1, 3, false);
        let _ = next_json(&mut rx);
        handle_client_message(&mut state, "client_a", r#"{"type":"pause"}"#);
        tick_game(&mut state);
        let session = state.session.as_ref().expect("session started");
        assert!(session.engine.is_paused());
        assert_eq!(session.engine.elapsed_ms(), 0);
    }

    #[test]
    fn autopilot_sessions_keep_running() {
        let (mut state, mut rx) = state_with_client("client_a");
        start_session(&mut state, 1, 11, true);
        let _ = next_json(&mut rx);
        let mut updates = 0;
        for _ in 0..300 {
            tick_game(&mut state);
            while let Ok(OutboundMessage::Text(_)) = rx.try_recv() {
                updates += 1;
            }
        }
        assert_eq!(updates, 300);
        assert!(state.session.is_some());
    }
}
