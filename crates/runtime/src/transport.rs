//! Transport primitives the session sequences: name resolution, TCP connect,
//! WebSocket upgrade, and single-frame read/write operations.
//!
//! Read and write are modelled as owned futures that hand the stream half
//! back on completion. Holding the half inside the future is what makes
//! "one read / one write in flight" structural rather than a convention.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpStream, lookup_host};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::USER_AGENT;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, client_async_tls_with_config};

use crate::error::{Error, Result};
use crate::target::Target;

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
pub(crate) type WsSource = SplitStream<WsStream>;

/// In-flight read; yields the source half and the next frame (`None` at end of stream).
pub(crate) type ReadFuture = BoxFuture<'static, (WsSource, Option<std::result::Result<Message, WsError>>)>;

/// In-flight write; yields the sink half and the outcome.
pub(crate) type WriteFuture = BoxFuture<'static, (WsSink, std::result::Result<(), WsError>)>;

/// Resolves the target host. An empty address list is a failure.
pub(crate) async fn resolve(target: &Target) -> Result<Vec<SocketAddr>> {
	let addrs: Vec<SocketAddr> = lookup_host(target.authority())
		.await
		.map_err(|e| Error::Resolve(e.to_string()))?
		.collect();

	if addrs.is_empty() {
		return Err(Error::Resolve(format!("no addresses found for {}", target.host)));
	}
	Ok(addrs)
}

/// Connects to the first reachable address, bounded by `timeout` overall.
pub(crate) async fn connect(addrs: &[SocketAddr], timeout: Duration) -> Result<TcpStream> {
	let attempt = async {
		let mut last_error = None;
		for addr in addrs {
			match TcpStream::connect(addr).await {
				Ok(stream) => {
					if let Err(e) = stream.set_nodelay(true) {
						tracing::debug!(%addr, error = %e, "failed to set TCP_NODELAY");
					}
					return Ok(stream);
				}
				Err(e) => {
					tracing::debug!(%addr, error = %e, "connect attempt failed");
					last_error = Some(e);
				}
			}
		}
		Err(last_error.map_or_else(|| "no addresses to try".to_string(), |e| e.to_string()))
	};

	match tokio::time::timeout(timeout, attempt).await {
		Ok(Ok(stream)) => Ok(stream),
		Ok(Err(message)) => Err(Error::Connect(message)),
		Err(_) => Err(Error::ConnectTimeout(timeout)),
	}
}

/// Performs the WebSocket upgrade (TLS first for `wss`), bounded by `timeout`.
pub(crate) async fn handshake(target: &Target, stream: TcpStream, user_agent: &str, timeout: Duration) -> Result<WsStream> {
	let mut request = target
		.request_uri()
		.into_client_request()
		.map_err(|e| Error::Handshake(e.to_string()))?;
	let agent = HeaderValue::from_str(user_agent).map_err(|e| Error::Handshake(format!("invalid user agent: {e}")))?;
	request.headers_mut().insert(USER_AGENT, agent);

	let upgrade = client_async_tls_with_config(request, stream, None, None);
	let (ws, response) = tokio::time::timeout(timeout, upgrade)
		.await
		.map_err(|_| Error::Handshake(format!("timed out after {}ms", timeout.as_millis())))?
		.map_err(|e| Error::Handshake(e.to_string()))?;
	tracing::debug!(status = %response.status(), target = %target, "upgrade accepted");
	Ok(ws)
}

pub(crate) fn read_next(mut source: WsSource) -> ReadFuture {
	Box::pin(async move {
		let frame = source.next().await;
		(source, frame)
	})
}

pub(crate) fn write_frame(mut sink: WsSink, frame: Message) -> WriteFuture {
	Box::pin(async move {
		let result = sink.send(frame).await;
		(sink, result)
	})
}

/// Close frame with status 1000.
pub(crate) fn normal_close() -> Message {
	Message::Close(Some(CloseFrame {
		code: CloseCode::Normal,
		reason: "".into(),
	}))
}

/// Errors that mean "the stream is over" rather than "the stream broke".
pub(crate) fn is_clean_end(err: &WsError) -> bool {
	matches!(err, WsError::ConnectionClosed | WsError::AlreadyClosed)
}
