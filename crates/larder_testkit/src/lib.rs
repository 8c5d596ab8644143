//! # Larder Testkit
//!
//! Test utilities for Larder.
//!
//! This crate provides:
//! - `FakeServer`, an in-memory service with signed, rotating tokens
//! - `FakeSocket`, a scriptable live update socket
//! - Fixtures: a sample account and a client harness
//! - Property-based test generators using proptest
//! - `init_tracing` for readable logs in tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use larder_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn lists_load() {
//!     let harness = TestHarness::new();
//!     let client = harness.client();
//!     client.login().await.unwrap();
//!     assert_eq!(client.lists(false).await.unwrap().len(), 2);
//!     client.teardown().await;
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod error;
pub mod fixtures;
pub mod generators;
pub mod server;
pub mod socket;

use tracing_subscriber::EnvFilter;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_tracing;
    pub use crate::server::*;
    pub use crate::socket::*;
}

pub use auth::{TokenClaims, TokenIssuer, TokenKind};
pub use error::{ServerError, ServerResult};
pub use fixtures::*;
pub use generators::*;
pub use server::*;
pub use socket::*;

/// Installs a test subscriber honoring `RUST_LOG`, defaulting to `warn`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
