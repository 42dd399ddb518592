//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching subscription commands and forwarding filtered change
//! events. Events carry only the channel name and a timestamp; clients
//! re-fetch over REST when one arrives.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::domain::{ChangeEvent, EntityKind};

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads subscription commands from the client and applies them.
/// - Forwards matching events from the [`broadcast::Receiver`] to the client.
pub async fn run_connection(socket: WebSocket, mut event_rx: broadcast::Receiver<ChangeEvent>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut subs);
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            // Event from EventBus
            event = event_rx.recv() => {
                match event {
                    Ok(change) => {
                        if subs.matches(change.kind) {
                            let msg = WsMessage {
                                id: uuid::Uuid::new_v4().to_string(),
                                msg_type: WsMessageType::Event,
                                timestamp: chrono::Utc::now(),
                                payload: serde_json::to_value(&change).unwrap_or_default(),
                            };
                            let json = serde_json::to_string(&msg).unwrap_or_default();
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Handles a text message from the client, returning an optional JSON response.
fn handle_text_message(text: &str, subs: &mut SubscriptionManager) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        let err = WsMessage {
            id: String::new(),
            msg_type: WsMessageType::Error,
            timestamp: chrono::Utc::now(),
            payload: serde_json::json!({
                "code": 400,
                "message": "malformed JSON"
            }),
        };
        return serde_json::to_string(&err).ok();
    };

    if let Some(channels) = msg.payload.get("channels").and_then(|v| v.as_array()) {
        let command = msg
            .payload
            .get("command")
            .and_then(|v| v.as_str())
            .unwrap_or("subscribe");

        match command {
            "subscribe" => {
                let mut kinds = Vec::new();
                let mut wildcard = false;
                for channel in channels {
                    if let Some(s) = channel.as_str() {
                        if s == "*" {
                            wildcard = true;
                        } else if let Ok(kind) = s.parse::<EntityKind>() {
                            kinds.push(kind);
                        }
                    }
                }
                subs.subscribe(&kinds, wildcard);
                let response = WsMessage {
                    id: msg.id,
                    msg_type: WsMessageType::Response,
                    timestamp: chrono::Utc::now(),
                    payload: serde_json::json!({
                        "subscribed": kinds.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
                        "count": subs.count(),
                        "wildcard": subs.is_subscribed_all(),
                    }),
                };
                return serde_json::to_string(&response).ok();
            }
            "unsubscribe" => {
                let mut kinds = Vec::new();
                for channel in channels {
                    if let Some(s) = channel.as_str()
                        && let Ok(kind) = s.parse::<EntityKind>()
                    {
                        kinds.push(kind);
                    }
                }
                subs.unsubscribe(&kinds);
                let response = WsMessage {
                    id: msg.id,
                    msg_type: WsMessageType::Response,
                    timestamp: chrono::Utc::now(),
                    payload: serde_json::json!({
                        "unsubscribed": kinds.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
                        "remaining_count": subs.count(),
                    }),
                };
                return serde_json::to_string(&response).ok();
            }
            _ => {}
        }
    }

    // Unknown command
    let err = WsMessage {
        id: msg.id,
        msg_type: WsMessageType::Error,
        timestamp: chrono::Utc::now(),
        payload: serde_json::json!({
            "code": 404,
            "message": "unknown command"
        }),
    };
    serde_json::to_string(&err).ok()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn command(payload: serde_json::Value) -> String {
        serde_json::to_string(&WsMessage {
            id: "cmd-1".to_string(),
            msg_type: WsMessageType::Command,
            timestamp: chrono::Utc::now(),
            payload,
        })
        .unwrap_or_default()
    }

    #[test]
    fn subscribe_command_updates_filter() {
        let mut subs = SubscriptionManager::new();
        let text = command(serde_json::json!({
            "command": "subscribe",
            "channels": ["deposits", "users"],
        }));
        let response = handle_text_message(&text, &mut subs);
        assert!(response.is_some_and(|r| r.contains("\"response\"")));
        assert!(subs.matches(EntityKind::Deposits));
        assert!(subs.matches(EntityKind::Users));
        assert!(!subs.matches(EntityKind::Loans));
    }

    #[test]
    fn wildcard_subscription() {
        let mut subs = SubscriptionManager::new();
        let text = command(serde_json::json!({
            "command": "subscribe",
            "channels": ["*"],
        }));
        let _ = handle_text_message(&text, &mut subs);
        assert!(subs.is_subscribed_all());
    }

    #[test]
    fn unknown_channel_names_are_ignored() {
        let mut subs = SubscriptionManager::new();
        let text = command(serde_json::json!({
            "command": "subscribe",
            "channels": ["deposits", "trades"],
        }));
        let _ = handle_text_message(&text, &mut subs);
        assert_eq!(subs.count(), 1);
    }

    #[test]
    fn unsubscribe_command_removes_channel() {
        let mut subs = SubscriptionManager::new();
        subs.subscribe(&[EntityKind::Deposits, EntityKind::Users], false);
        let text = command(serde_json::json!({
            "command": "unsubscribe",
            "channels": ["deposits"],
        }));
        let response = handle_text_message(&text, &mut subs);
        assert!(response.is_some_and(|r| r.contains("remaining_count")));
        assert!(!subs.matches(EntityKind::Deposits));
        assert!(subs.matches(EntityKind::Users));
    }

    #[test]
    fn malformed_json_yields_error_message() {
        let mut subs = SubscriptionManager::new();
        let response = handle_text_message("not json", &mut subs);
        assert!(response.is_some_and(|r| r.contains("malformed JSON")));
    }

    #[test]
    fn unknown_command_yields_error_message() {
        let mut subs = SubscriptionManager::new();
        let text = command(serde_json::json!({"command": "resubscribe"}));
        let response = handle_text_message(&text, &mut subs);
        assert!(response.is_some_and(|r| r.contains("unknown command")));
    }
}
