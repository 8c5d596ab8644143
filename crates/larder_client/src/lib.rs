//! # Larder Client
//!
//! Session, mutation and live update engine for the Larder list and recipe
//! client.
//!
//! This crate provides:
//! - An authenticated session with single-flight token refresh
//! - Encrypted credential persistence
//! - A cached entity graph fetched from the service
//! - The mutation protocol that turns dirty fields into operation batches
//! - A live channel with keepalives and bounded reconnect
//! - An update feed that tells subscribers about remote changes
//!
//! ## Architecture
//!
//! ```text
//! Client ─┬─ Session ──────── HttpTransport
//!         ├─ EntityGraph ──── Session + WireCodec
//!         ├─ MutationProtocol ─ EntityGraph + WireCodec
//!         ├─ LiveChannel ──── SocketTransport + Session
//!         └─ UpdateFeed
//! ```
//!
//! Transports are traits, so any HTTP or websocket stack can be plugged in.
//!
//! ## Key Invariants
//!
//! - Every request carries the current access token
//! - Concurrent requests that hit an expired token share one refresh
//! - Local state changes only after the server accepted a batch
//! - The live channel gives up after a bounded number of failed attempts

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod channel;
mod client;
mod config;
mod credentials;
mod error;
mod events;
mod graph;
mod mutation;
mod session;
#[cfg(test)]
mod test_support;
mod transport;

pub use channel::{ChannelCredentials, ChannelState, LiveChannel, RemoteChangeHandler};
pub use client::Client;
pub use config::{
    ChannelConfig, ClientConfig, RetryConfig, DEFAULT_API_VERSION, DEFAULT_BASE_URL,
    DEFAULT_SOCKET_URL,
};
pub use credentials::CredentialStore;
pub use error::{ClientError, ClientResult};
pub use events::{Subscription, UpdateEvent, UpdateFeed};
pub use graph::{EntityGraph, USER_DATA_PATH};
pub use mutation::MutationProtocol;
pub use session::{
    Session, API_VERSION_HEADER, AUTH_REFRESH_PATH, AUTH_TOKEN_PATH, CLIENT_ID_HEADER,
};
pub use transport::{
    FormField, FormValue, HttpRequest, HttpResponse, HttpTransport, RequestBody,
    SocketConnectRequest, SocketConnection, SocketTransport, TransportError, TransportResult,
};
