//! `WebSocket` upgrade and per-connection read loop.
//!
//! Each inbound frame is dispatched on its own task through the
//! [`CommandRegistry`](crate::registry::CommandRegistry); the read loop
//! only waits when the connection already has its maximum number of
//! commands in flight. When the socket closes, the connection's region
//! subscription is removed from the grid.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::header::{HOST, ORIGIN};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt, future};
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::error::ConnectionError;
use crate::state::AppState;

/// Upgrade an HTTP request to a game `WebSocket` connection.
///
/// With origin checking enabled, a request whose `Origin` host differs
/// from its `Host` header is refused with `403 Forbidden`.
///
/// # Route
///
/// `GET <ws_path>` (default `/game`)
pub async fn ws_game(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    if state.origin_check && !origin_allowed(&headers) {
        warn!(origin = ?headers.get(ORIGIN), "websocket upgrade refused: origin mismatch");
        return StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Same-origin test: the `Origin` authority must equal the `Host` header,
/// ignoring ASCII case. Requests without `Origin` are not from a browser
/// and are allowed.
pub fn origin_allowed(headers: &HeaderMap) -> bool {
    let Some(origin) = headers.get(ORIGIN) else {
        return true;
    };
    let (Ok(origin), Some(host)) = (
        origin.to_str(),
        headers.get(HOST).and_then(|h| h.to_str().ok()),
    ) else {
        return false;
    };
    let authority = origin.split_once("://").map_or(origin, |(_, rest)| rest);
    let authority = authority.split('/').next().unwrap_or(authority);
    authority.eq_ignore_ascii_case(host)
}

/// Drive one connection until the client goes away.
async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let (sink, mut stream) = socket.split();
    let sink = sink.with(|frame: String| {
        future::ready(Ok::<_, ConnectionError>(Message::Text(frame.into())))
    });
    let conn = Arc::new(Connection::new(
        Box::pin(sink),
        Arc::clone(&state.manager),
        state.max_in_flight_commands,
    ));
    info!(connection = %conn.id(), "websocket connection established");

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => state.registry.dispatch_frame(&conn, text.as_str()).await,
            Ok(Message::Binary(bytes)) => state.registry.dispatch_bytes(&conn, &bytes).await,
            Ok(Message::Close(_)) => break,
            // Pings are answered by the websocket layer.
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(e) => {
                debug!(connection = %conn.id(), error = %e, "websocket read failed");
                break;
            }
        }
    }

    conn.close().await;
    info!(connection = %conn.id(), "websocket connection closed");
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(origin: Option<&'static str>, host: Option<&'static str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(origin) = origin {
            map.insert(ORIGIN, HeaderValue::from_static(origin));
        }
        if let Some(host) = host {
            map.insert(HOST, HeaderValue::from_static(host));
        }
        map
    }

    #[test]
    fn missing_origin_is_allowed() {
        assert!(origin_allowed(&headers(None, Some("example.com"))));
    }

    #[test]
    fn matching_origin_is_allowed() {
        assert!(origin_allowed(&headers(
            Some("http://Example.com:8080"),
            Some("example.com:8080")
        )));
        assert!(origin_allowed(&headers(
            Some("https://example.com/"),
            Some("example.com")
        )));
    }

    #[test]
    fn foreign_origin_is_refused() {
        assert!(!origin_allowed(&headers(
            Some("http://evil.test"),
            Some("example.com")
        )));
        assert!(!origin_allowed(&headers(
            Some("http://example.com:9000"),
            Some("example.com:8080")
        )));
        assert!(!origin_allowed(&headers(Some("http://example.com"), None)));
    }
}
