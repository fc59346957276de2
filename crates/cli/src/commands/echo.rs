use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::WebSocketUpgrade;
use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Text that makes the server close the connection instead of echoing.
pub const CLOSE_WORD: &str = "bye";

pub fn router() -> Router {
	Router::new()
		.route("/health", get(|| async { "OK" }))
		.fallback(get(|ws: WebSocketUpgrade| async move { ws.on_upgrade(handle_socket) }))
}

pub async fn run(host: &str, port: u16) -> Result<()> {
	let addr: SocketAddr = format!("{host}:{port}")
		.parse()
		.with_context(|| format!("Invalid host/port combination: {host}:{port}"))?;

	let listener = TcpListener::bind(addr)
		.await
		.with_context(|| format!("Failed to bind echo server to {addr}"))?;
	info!(target = "wslane", %addr, "echo server listening");
	println!("listening on ws://{addr}/");

	axum::serve(listener, router().into_make_service())
		.await
		.context("Echo server error")
}

async fn handle_socket(socket: WebSocket) {
	debug!(target = "wslane", "client connected");
	let (mut tx, mut rx) = socket.split();

	while let Some(msg) = rx.next().await {
		match msg {
			Ok(Message::Text(text)) if text.as_str() == CLOSE_WORD => {
				let frame = CloseFrame {
					code: close_code::NORMAL,
					reason: CLOSE_WORD.into(),
				};
				if let Err(err) = tx.send(Message::Close(Some(frame))).await {
					warn!(target = "wslane", error = %err, "failed to send close");
					break;
				}
				// Let the client answer so both sides see a clean close.
				while let Some(Ok(msg)) = rx.next().await {
					if matches!(msg, Message::Close(_)) {
						break;
					}
				}
				break;
			}
			Ok(Message::Text(text)) => {
				if tx.send(Message::Text(text)).await.is_err() {
					break;
				}
			}
			Ok(Message::Close(_)) => break,
			Ok(_) => {}
			Err(err) => {
				warn!(target = "wslane", error = %err, "websocket error");
				break;
			}
		}
	}
	debug!(target = "wslane", "client disconnected");
}
