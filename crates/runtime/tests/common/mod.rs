//! Shared fixtures: a local echo server and a callback recorder.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use parking_lot::{Condvar, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use wslane::{Callbacks, Handle};

pub const WAIT: Duration = Duration::from_secs(10);

/// What the server saw, keyed by request path.
#[derive(Debug, Default)]
pub struct ServerLog {
	pub user_agents: Vec<String>,
	pub messages: Vec<(String, String)>,
}

impl ServerLog {
	pub fn messages_on(&self, path: &str) -> Vec<String> {
		self.messages
			.iter()
			.filter(|(p, _)| p == path)
			.map(|(_, text)| text.clone())
			.collect()
	}
}

/// Echo server on its own thread and runtime. `bye` makes it close the
/// connection; everything else is echoed.
///
/// Two paths misbehave on purpose: on `/reset` the server drops the socket
/// right after the upgrade without a close frame, and on `/mute` it stops
/// reading so a close handshake never completes.
pub struct EchoServer {
	pub port: u16,
	pub log: Arc<Mutex<ServerLog>>,
	stop: Option<oneshot::Sender<()>>,
}

impl EchoServer {
	pub fn start() -> Self {
		let log = Arc::new(Mutex::new(ServerLog::default()));
		let (port_tx, port_rx) = std::sync::mpsc::channel();
		let (stop_tx, stop_rx) = oneshot::channel::<()>();
		let server_log = Arc::clone(&log);

		std::thread::spawn(move || {
			let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
			rt.block_on(async move {
				let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
				port_tx.send(listener.local_addr().unwrap().port()).unwrap();

				let accept_loop = async {
					loop {
						let Ok((stream, _)) = listener.accept().await else {
							break;
						};
						tokio::spawn(serve(stream, Arc::clone(&server_log)));
					}
				};
				tokio::select! {
					() = accept_loop => {}
					_ = stop_rx => {}
				}
			});
		});

		Self {
			port: port_rx.recv().unwrap(),
			log,
			stop: Some(stop_tx),
		}
	}

	pub fn url(&self, path: &str) -> String {
		format!("ws://127.0.0.1:{}{path}", self.port)
	}
}

impl Drop for EchoServer {
	fn drop(&mut self) {
		if let Some(stop) = self.stop.take() {
			let _ = stop.send(());
		}
	}
}

async fn serve(stream: TcpStream, log: Arc<Mutex<ServerLog>>) {
	let mut path = String::new();
	let mut user_agent = String::new();
	let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
		path = req.uri().path().to_string();
		user_agent = req
			.headers()
			.get("user-agent")
			.and_then(|v| v.to_str().ok())
			.unwrap_or_default()
			.to_string();
		Ok(resp)
	};
	let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
		return;
	};
	log.lock().user_agents.push(user_agent);

	match path.as_str() {
		"/reset" => {
			drop(ws);
			return;
		}
		"/mute" => {
			std::future::pending::<()>().await;
		}
		_ => {}
	}

	while let Some(Ok(msg)) = ws.next().await {
		match msg {
			Message::Text(text) if text == "bye" => {
				let frame = CloseFrame {
					code: CloseCode::Normal,
					reason: "bye".into(),
				};
				let _ = ws.close(Some(frame)).await;
				// Drain until the client's close reply ends the stream.
				while let Some(Ok(_)) = ws.next().await {}
				return;
			}
			Message::Text(text) => {
				log.lock().messages.push((path.clone(), text.clone()));
				if ws.send(Message::Text(text)).await.is_err() {
					return;
				}
			}
			_ => {}
		}
	}
}

/// Accepts TCP connections and then never says a word.
pub fn silent_listener() -> u16 {
	let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
	let port = listener.local_addr().unwrap().port();
	std::thread::spawn(move || {
		let mut held = Vec::new();
		for stream in listener.incoming() {
			match stream {
				Ok(stream) => held.push(stream),
				Err(_) => break,
			}
		}
	});
	port
}

/// Answers every upgrade request with `404 Not Found`.
pub fn rejecting_listener() -> u16 {
	use std::io::{Read, Write};

	let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
	let port = listener.local_addr().unwrap().port();
	std::thread::spawn(move || {
		for stream in listener.incoming() {
			let Ok(mut stream) = stream else {
				break;
			};
			let mut request = [0u8; 4096];
			let _ = stream.read(&mut request);
			let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
		}
	});
	port
}

/// A port nothing is listening on.
pub fn closed_port() -> u16 {
	let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
	listener.local_addr().unwrap().port()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	Fail(Handle, String),
	Disconnect(Handle),
	Data(Handle, String),
}

/// Collects callback invocations and lets tests wait on them.
#[derive(Default)]
pub struct Recorder {
	events: Mutex<Vec<Event>>,
	changed: Condvar,
}

impl Recorder {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn callbacks(self: &Arc<Self>) -> Callbacks {
		let (fail, disconnect, data) = (Arc::clone(self), Arc::clone(self), Arc::clone(self));
		Callbacks::new()
			.on_fail(move |h, msg| fail.push(Event::Fail(h, msg.to_string())))
			.on_disconnect(move |h| disconnect.push(Event::Disconnect(h)))
			.on_data(move |h, text| data.push(Event::Data(h, text.to_string())))
	}

	pub fn push(&self, event: Event) {
		self.events.lock().push(event);
		self.changed.notify_all();
	}

	pub fn events(&self) -> Vec<Event> {
		self.events.lock().clone()
	}

	/// Blocks until `done` holds for the recorded events or `WAIT` elapses.
	pub fn wait_until(&self, done: impl Fn(&[Event]) -> bool) -> bool {
		let deadline = Instant::now() + WAIT;
		let mut events = self.events.lock();
		while !done(&events) {
			if self.changed.wait_until(&mut events, deadline).timed_out() {
				return done(&events);
			}
		}
		true
	}

	pub fn data_for(&self, handle: Handle) -> Vec<String> {
		self.events
			.lock()
			.iter()
			.filter_map(|e| match e {
				Event::Data(h, text) if *h == handle => Some(text.clone()),
				_ => None,
			})
			.collect()
	}

	pub fn count(&self, wanted: impl Fn(&Event) -> bool) -> usize {
		self.events.lock().iter().filter(|e| wanted(e)).count()
	}

	pub fn disconnects(&self, handle: Handle) -> usize {
		self.count(|e| *e == Event::Disconnect(handle))
	}

	pub fn failures(&self) -> usize {
		self.count(|e| matches!(e, Event::Fail(..)))
	}
}

/// Polls `check` until it holds or `WAIT` elapses.
pub fn eventually(check: impl Fn() -> bool) -> bool {
	let deadline = Instant::now() + WAIT;
	while Instant::now() < deadline {
		if check() {
			return true;
		}
		std::thread::sleep(Duration::from_millis(10));
	}
	check()
}
