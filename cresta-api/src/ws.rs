use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Keep-alive ping cadence. The reference client treats a silent socket as
/// dead and starts its reconnect backoff.
const PING_INTERVAL_SECS: u64 = 30;

/// Outbound buffer per connection before events to that client are dropped.
const OUTBOUND_BUFFER: usize = 64;

/// Client -> server frames: subscribe/unsubscribe to logical channels like
/// `reservation:<id>` or `unit:<id>`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ClientCommand {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ControlMessage {
    Subscribed { channel: String },
    Unsubscribed { channel: String },
    /// The subscriber fell behind the bounded buffer and missed `skipped`
    /// events; it should re-sync over HTTP.
    Lag { channel: String, skipped: u64 },
    Error { message: String },
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade))
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One task per connection drains an outbound queue into the socket; every
/// subscription pumps its broadcast receiver into that queue. The read loop
/// only parses subscribe/unsubscribe frames.
async fn handle_socket(socket: WebSocket, state: AppState) {
    info!("Realtime client connected");
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    let ping_tx = tx.clone();
    let pinger = tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(PING_INTERVAL_SECS));
        ticker.tick().await; // the first tick fires immediately
        loop {
            ticker.tick().await;
            if ping_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                break;
            }
        }
    });

    let mut pumps: HashMap<String, JoinHandle<()>> = HashMap::new();

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientCommand>(&text) {
                Ok(ClientCommand::Subscribe { channel }) => {
                    if !valid_channel(&channel) {
                        send_control(
                            &tx,
                            &ControlMessage::Error {
                                message: format!("Unknown channel: {}", channel),
                            },
                        )
                        .await;
                        continue;
                    }
                    if pumps.contains_key(&channel) {
                        continue;
                    }
                    debug!("Realtime subscribe to {}", channel);
                    pumps.insert(channel.clone(), spawn_pump(&state, &tx, channel.clone()));
                    send_control(&tx, &ControlMessage::Subscribed { channel }).await;
                }
                Ok(ClientCommand::Unsubscribe { channel }) => {
                    if let Some(pump) = pumps.remove(&channel) {
                        pump.abort();
                        send_control(&tx, &ControlMessage::Unsubscribed { channel }).await;
                    }
                }
                Err(e) => {
                    warn!("Unparseable realtime frame: {}", e);
                    send_control(
                        &tx,
                        &ControlMessage::Error {
                            message: "Expected {\"action\": \"subscribe\", \"channel\": ...}"
                                .to_string(),
                        },
                    )
                    .await;
                }
            },
            Message::Close(_) => break,
            // Pong and binary frames need no reply
            _ => {}
        }
    }

    for pump in pumps.into_values() {
        pump.abort();
    }
    pinger.abort();
    writer.abort();
    info!("Realtime client disconnected");
}

/// Forward one channel's broadcast stream into the connection's outbound
/// queue until either side goes away.
fn spawn_pump(state: &AppState, tx: &mpsc::Sender<Message>, channel: String) -> JoinHandle<()> {
    let mut rx = state.events.subscribe(&channel);
    let tx = tx.clone();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let frame = match serde_json::to_string(&event) {
                        Ok(frame) => frame,
                        Err(_) => continue,
                    };
                    if tx.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    send_control(
                        &tx,
                        &ControlMessage::Lag {
                            channel: channel.clone(),
                            skipped,
                        },
                    )
                    .await;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn send_control(tx: &mpsc::Sender<Message>, message: &ControlMessage) {
    let frame = serde_json::to_string(message)
        .unwrap_or_else(|_| json!({"type": "error"}).to_string());
    let _ = tx.send(Message::Text(frame.into())).await;
}

/// Channels are `unit:<uuid>` or `reservation:<uuid>`; anything else is
/// refused before it can allocate a broadcast channel.
fn valid_channel(channel: &str) -> bool {
    match channel.split_once(':') {
        Some(("unit", id)) | Some(("reservation", id)) => Uuid::parse_str(id).is_ok(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_validation() {
        let id = Uuid::new_v4();
        assert!(valid_channel(&format!("unit:{}", id)));
        assert!(valid_channel(&format!("reservation:{}", id)));

        assert!(!valid_channel("unit:not-a-uuid"));
        assert!(!valid_channel(&format!("order:{}", id)));
        assert!(!valid_channel("reservation"));
        assert!(!valid_channel(""));
    }

    #[test]
    fn test_client_command_parsing() {
        let cmd: ClientCommand =
            serde_json::from_str(r#"{"action":"subscribe","channel":"unit:abc"}"#).unwrap();
        assert!(matches!(cmd, ClientCommand::Subscribe { channel } if channel == "unit:abc"));

        assert!(serde_json::from_str::<ClientCommand>(r#"{"action":"shout"}"#).is_err());
    }

    #[test]
    fn test_control_wire_shape() {
        let frame = serde_json::to_value(&ControlMessage::Lag {
            channel: "unit:x".to_string(),
            skipped: 3,
        })
        .unwrap();
        assert_eq!(frame["type"], "lag");
        assert_eq!(frame["skipped"], 3);
    }
}
