//! End-to-end tests for the HTTP and websocket surface.
//!
//! `/health` is exercised through the router with `tower::ServiceExt`;
//! websocket tests bind a real listener on port 0 and talk to it with
//! `tokio-tungstenite`.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::{SinkExt, Stream, StreamExt};
use lifegrid_core::config::LifegridConfig;
use lifegrid_core::manager::GameManager;
use lifegrid_grid::SparseGrid;
use lifegrid_server::{AppState, build_router, serve};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tower::ServiceExt;

fn make_state(origin_check: bool) -> Arc<AppState> {
    make_state_with(Arc::new(SparseGrid::new()), origin_check)
}

fn make_state_with(grid: Arc<SparseGrid>, origin_check: bool) -> Arc<AppState> {
    let mut config = LifegridConfig::default();
    config.server.origin_check = origin_check;
    let manager = Arc::new(GameManager::new(grid));
    Arc::new(AppState::new(manager, &config))
}

async fn wait_for_observers(grid: &SparseGrid, expected: usize) {
    for _ in 0..200 {
        if grid.observer_count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(grid.observer_count(), expected);
}

async fn spawn_server(state: Arc<AppState>) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        serve(listener, state, async move {
            let _ = stop_rx.await;
        })
        .await
        .unwrap();
    });
    (addr, stop_tx)
}

async fn next_text<S>(stream: &mut S) -> String
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let message = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    message.to_text().unwrap().to_owned()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = build_router(make_state(false));
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = build_router(make_state(false));
    let response = app
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn websocket_session_round_trip() {
    let grid = Arc::new(SparseGrid::new());
    let state = make_state_with(Arc::clone(&grid), false);
    let manager = Arc::clone(&state.manager);
    let (addr, stop) = spawn_server(state).await;

    let (socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/game"))
        .await
        .unwrap();
    let (mut tx, mut rx) = socket.split();

    tx.send(Message::text(
        r#"{"command":"set_cells","data":{"cells":[[0,0],[0,1],[0,-1]]}}"#,
    ))
    .await
    .unwrap();
    assert_eq!(next_text(&mut rx).await, "ok;{}\r\n");

    tx.send(Message::text(
        r#"{"command":"observe","data":{"bounds":[[-1,-1],[2,2]]}}"#,
    ))
    .await
    .unwrap();
    assert_eq!(
        next_text(&mut rx).await,
        "observe_ok;{\"bounds\":[[-1,-1],[2,2]]}\r\n"
    );

    // The observer registers right after the ack.
    wait_for_observers(&grid, 1).await;
    manager.tick().await;
    assert_eq!(
        next_text(&mut rx).await,
        "observe_event;{\"data\":{\"bornCells\":[[-1,0],[1,0]],\"diedCells\":[[0,-1],[0,1]]},\"event\":\"tick\"}\r\n"
    );

    tx.send(Message::binary(br#"{"command":"bogus"}"#.to_vec()))
        .await
        .unwrap();
    assert_eq!(
        next_text(&mut rx).await,
        "error;{\"error\":\"unknown command\"}\r\n"
    );

    tx.send(Message::Close(None)).await.unwrap();
    let _ = stop.send(());
}

#[tokio::test]
async fn closing_the_socket_releases_the_region() {
    let grid = Arc::new(SparseGrid::new());
    let (addr, stop) = spawn_server(make_state_with(Arc::clone(&grid), false)).await;

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/game"))
        .await
        .unwrap();
    socket
        .send(Message::text(
            r#"{"command":"observe","data":{"bounds":[[0,0],[5,5]]}}"#,
        ))
        .await
        .unwrap();
    assert!(next_text(&mut socket).await.starts_with("observe_ok;"));

    wait_for_observers(&grid, 1).await;

    socket.close(None).await.unwrap();
    wait_for_observers(&grid, 0).await;
    let _ = stop.send(());
}

#[tokio::test]
async fn foreign_origin_is_refused_when_checking() {
    let (addr, stop) = spawn_server(make_state(true)).await;

    let mut request = format!("ws://{addr}/game").into_client_request().unwrap();
    request
        .headers_mut()
        .insert("Origin", "http://evil.test".parse().unwrap());
    let err = tokio_tungstenite::connect_async(request).await.unwrap_err();
    assert!(
        matches!(
            &err,
            tokio_tungstenite::tungstenite::Error::Http(response) if response.status().as_u16() == 403
        ),
        "expected a 403 rejection, got {err:?}"
    );

    // Same-origin clients still get in.
    let mut request = format!("ws://{addr}/game").into_client_request().unwrap();
    request
        .headers_mut()
        .insert("Origin", format!("http://{addr}").parse().unwrap());
    assert!(tokio_tungstenite::connect_async(request).await.is_ok());
    let _ = stop.send(());
}
