//! wslane - handle-based WebSocket client runtime
//!
//! A host opens any number of client sessions through a synchronous API and
//! receives events through per-session callbacks:
//!
//! - **Registry**: opaque [`Handle`]s mapped to non-owning session references
//! - **Session**: resolve → connect → handshake → open → close state machine
//! - **Outbound queue**: FIFO with at most one write in flight per session
//! - **Dispatcher**: callbacks delivered on the session's lane, panics contained
//! - **Lanes**: one task per session on a shared worker pool
//!
//! # Architecture
//!
//! ```text
//! host thread                       worker pool
//! ┌────────────┐  Command + oneshot  ┌──────────────────────────┐
//! │  Client    │ ─────────────────► │ lane (Session task)      │
//! │  send()    │ ◄───────────────── │  ├ OutboundQueue         │
//! │  ...       │      ack           │  ├ read / write futures  │
//! └─────┬──────┘                    │  └ Dispatcher → host cbs │
//!       │ resolve(handle)           └──────────────────────────┘
//! ┌─────▼──────┐  Weak<Lane>
//! │  Registry  │
//! └────────────┘
//! ```

mod bridge;
pub mod client;
pub mod config;
mod diag;
pub mod dispatch;
pub mod error;
mod executor;
mod lane;
pub mod outbound;
pub mod registry;
mod session;
pub mod state;
pub mod target;
mod transport;

pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_HANDSHAKE_TIMEOUT_MS};
pub use diag::Diagnostics;
pub use dispatch::Callbacks;
pub use error::{Error, Result};
pub use registry::{Handle, Registry};
pub use state::SessionState;
pub use target::{Scheme, Target};
