//! WebSocket endpoint: start/stop commands in, session events out.
//!
//! One logical scrape session per connection at a time. A session
//! spawned here keeps running through its cancellation checkpoints;
//! stop and disconnect both go through the registry's token.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use lead_scraper::browser::{HttpRobotsFetcher, RemoteBrowser};
use lead_scraper::events::{EventSink, SessionEvent};
use lead_scraper::types::QualifiedLead;
use lead_scraper::{validate_request, SessionRunner};

use crate::server::app::AppState;

/// Commands a client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start a scrape session.
    Start {
        keyword: String,
        city: String,
        #[serde(default)]
        max_pages: Option<u32>,
    },
    /// Cancel the running session.
    Stop,
}

/// Events pushed to the client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Status { message: String },
    Results { leads: Vec<QualifiedLead> },
    Error { message: String },
}

impl From<SessionEvent> for ServerMessage {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::Status { message } => ServerMessage::Status { message },
            SessionEvent::Results { leads } => ServerMessage::Results { leads },
            SessionEvent::Error { message } => ServerMessage::Error { message },
        }
    }
}

/// Forwards session events into the connection's outbound channel.
/// A closed channel (client gone) drops events; the session itself is
/// torn down by the registry's disconnect path.
#[derive(Clone)]
struct ChannelSink {
    tx: mpsc::Sender<SessionEvent>,
}

#[async_trait::async_trait]
impl EventSink for ChannelSink {
    async fn on_status(&self, message: String) {
        let _ = self.tx.send(SessionEvent::Status { message }).await;
    }

    async fn on_results(&self, leads: Vec<QualifiedLead>) {
        let _ = self.tx.send(SessionEvent::Results { leads }).await;
    }

    async fn on_error(&self, message: String) {
        let _ = self.tx.send(SessionEvent::Error { message }).await;
    }
}

/// GET /ws - WebSocket upgrade endpoint
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    tracing::info!(connection_id = %connection_id, "websocket connected");

    let (mut sender, mut receiver) = socket.split();
    let (event_tx, mut event_rx) = mpsc::channel::<SessionEvent>(64);

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) =
                            handle_command(&text, &state, connection_id, &event_tx).await
                        {
                            if send_message(&mut sender, reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong handled by axum
                    Some(Err(e)) => {
                        tracing::warn!(connection_id = %connection_id, error = %e, "websocket error");
                        break;
                    }
                }
            }
            Some(event) = event_rx.recv() => {
                if send_message(&mut sender, event.into()).await.is_err() {
                    break;
                }
            }
        }
    }

    // Orphaned sessions must not keep scraping.
    state.registry.disconnect(&connection_id).await;
    tracing::info!(connection_id = %connection_id, "websocket closed");
}

/// Process one client command. Returns an immediate reply for
/// refusals and malformed input; accepted starts answer through the
/// event channel instead.
async fn handle_command(
    text: &str,
    state: &AppState,
    connection_id: Uuid,
    event_tx: &mpsc::Sender<SessionEvent>,
) -> Option<ServerMessage> {
    let command: ClientMessage = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(e) => {
            return Some(ServerMessage::Error {
                message: format!("invalid message: {}", e),
            });
        }
    };

    match command {
        ClientMessage::Start {
            keyword,
            city,
            max_pages,
        } => start_session(state, connection_id, &keyword, &city, max_pages, event_tx).await,
        ClientMessage::Stop => {
            if state.registry.stop(&connection_id).await {
                None
            } else {
                Some(ServerMessage::Error {
                    message: "no scrape session in progress".to_string(),
                })
            }
        }
    }
}

async fn start_session(
    state: &AppState,
    connection_id: Uuid,
    keyword: &str,
    city: &str,
    max_pages: Option<u32>,
    event_tx: &mpsc::Sender<SessionEvent>,
) -> Option<ServerMessage> {
    let request = match validate_request(keyword, city, max_pages, state.scraper.max_pages_cap) {
        Ok(request) => request,
        Err(e) => {
            return Some(ServerMessage::Error {
                message: e.to_string(),
            });
        }
    };

    let browser = match RemoteBrowser::new(
        state.browser_endpoint.as_str(),
        state.scraper.user_agent.as_str(),
        state.scraper.fetch_timeout,
    ) {
        Ok(browser) => browser,
        Err(e) => return Some(wiring_error(connection_id, e)),
    };
    let robots = match HttpRobotsFetcher::new(&state.scraper.user_agent, state.scraper.fetch_timeout)
    {
        Ok(robots) => robots,
        Err(e) => return Some(wiring_error(connection_id, e)),
    };

    let cancel = CancellationToken::new();
    let runner = SessionRunner::new(
        connection_id.to_string(),
        request,
        state.scraper.clone(),
        browser,
        robots,
        state.intent.clone(),
        state.store.clone(),
        ChannelSink {
            tx: event_tx.clone(),
        },
        cancel.clone(),
    );
    let session_id = runner.session_id();

    if let Err(refusal) = state
        .registry
        .try_begin(connection_id, session_id, cancel)
        .await
    {
        tracing::warn!(
            connection_id = %connection_id,
            refusal = %refusal,
            "start command refused"
        );
        return Some(ServerMessage::Error {
            message: refusal.to_string(),
        });
    }

    let registry = state.registry.clone();
    tokio::spawn(async move {
        let outcome = runner.run().await;
        tracing::debug!(
            session_id = %outcome.session_id,
            state = ?outcome.state,
            "session task finished"
        );
        registry.finish(&connection_id, session_id).await;
    });

    None
}

fn wiring_error(connection_id: Uuid, e: impl std::fmt::Display) -> ServerMessage {
    tracing::error!(connection_id = %connection_id, error = %e, "failed to wire scrape session");
    ServerMessage::Error {
        message: "scraper backend unavailable".to_string(),
    }
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(&msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize server message");
            return Ok(());
        }
    };
    sender.send(Message::Text(json)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_command_parses() {
        let json = r#"{"type":"start","keyword":"energie","city":"paris","max_pages":3}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        let ClientMessage::Start {
            keyword,
            city,
            max_pages,
        } = msg
        else {
            panic!("expected start");
        };
        assert_eq!(keyword, "energie");
        assert_eq!(city, "paris");
        assert_eq!(max_pages, Some(3));
    }

    #[test]
    fn test_start_command_pages_optional() {
        let json = r#"{"type":"start","keyword":"energie","city":"paris"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Start {
                max_pages: None,
                ..
            }
        ));
    }

    #[test]
    fn test_stop_command_parses() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"stop"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Stop));
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        let result: Result<ClientMessage, _> = serde_json::from_str(r#"{"type":"restart"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_message_wire_format() {
        let msg = ServerMessage::Status {
            message: "Page 1/3: 4 leads committed so far".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"status""#));

        let msg = ServerMessage::Error {
            message: "a scrape session is already in progress".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"error""#));
    }

    #[test]
    fn test_session_event_converts() {
        let event = SessionEvent::Results { leads: vec![] };
        let msg: ServerMessage = event.into();
        assert!(matches!(msg, ServerMessage::Results { .. }));
    }
}
