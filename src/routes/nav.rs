//! Navigation websocket: a live route guard for one UI shell.
//!
//! DESIGN
//! ======
//! Each connection owns one [`Navigator`], seeded with the session from the
//! upgrade request's cookie. The `select!` loop relays:
//! - client `navigate` / `session` messages → navigator
//! - snapshot changes → client `state` messages
//! - redirect effects → client `redirect` messages
//!
//! PROTOCOL
//! ========
//! Client → server:
//!   `{"type":"navigate","path":"/dashboard"}`
//!   `{"type":"session","access_token":"..."}` (or `null` after sign-out)
//! Server → client:
//!   `{"type":"state","generation":3,"path":"/dashboard","state":"authorized","role":"customer"}`
//!   `{"type":"redirect","from":"/admin","to":"/dashboard"}`
//!   `{"type":"error","message":"..."}` for unparseable input

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::SessionContext;
use crate::guard::{GuardSnapshot, Navigator, RedirectEvent};
use crate::state::AppState;

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Navigate { path: String },
    Session { access_token: Option<String> },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    State(GuardSnapshot),
    Redirect(RedirectEvent),
    Error { message: String },
}

/// `GET /api/nav`
pub async fn handle_nav(State(state): State<AppState>, session: SessionContext, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_nav(socket, state, session))
}

/// Apply one client message. Returns a reply only for bad input.
pub(crate) fn apply_client_message(navigator: &Navigator, text: &str) -> Option<ServerMessage> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Navigate { path }) => {
            navigator.navigate(&path);
            None
        }
        Ok(ClientMessage::Session { access_token }) => {
            navigator.set_session(access_token.map_or_else(SessionContext::anonymous, SessionContext::with_token));
            None
        }
        Err(e) => Some(ServerMessage::Error { message: format!("invalid message: {e}") }),
    }
}

async fn run_nav(mut socket: WebSocket, state: AppState, session: SessionContext) {
    let (navigator, mut redirects) = Navigator::new(state.sessions.clone(), state.profiles.clone(), session);
    let mut snapshots = navigator.subscribe();
    info!("nav: shell connected");

    loop {
        let outbound = tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => apply_client_message(&navigator, text.as_str()),
                    Message::Close(_) => break,
                    _ => None,
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                Some(ServerMessage::State(snapshots.borrow_and_update().clone()))
            }
            Some(event) = redirects.recv() => Some(ServerMessage::Redirect(event)),
        };

        if let Some(message) = outbound {
            if send_message(&mut socket, &message).await.is_err() {
                break;
            }
        }
    }

    navigator.shutdown();
    info!("nav: shell disconnected");
}

async fn send_message(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), ()> {
    let Ok(json) = serde_json::to_string(message) else {
        debug!(?message, "nav: message did not serialize");
        return Ok(());
    };
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[path = "nav_test.rs"]
mod tests;
