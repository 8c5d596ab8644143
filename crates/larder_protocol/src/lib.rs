//! # Larder Protocol
//!
//! Operation records, wire payloads and codecs for the Larder sync client.
//!
//! This crate provides:
//! - `HandlerId`, the closed set of server-side operation handlers
//! - `Operation` and `OperationBatch` for submitting changes
//! - Serde wire records for the bulk "user data" snapshot
//! - The `WireCodec` seam and a CBOR reference codec
//! - Live-channel frame constants
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod codec;
mod error;
mod messages;
mod operation;
pub mod wire;

pub use batch::OperationBatch;
pub use codec::{CborCodec, WireCodec};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{ChannelMessage, HEARTBEAT_FRAME, REFRESH_SHOPPING_LISTS};
pub use operation::{
    Endpoint, FieldValue, HandlerId, Operation, OperationMetadata, OperationPayload,
    OperationTarget,
};
pub use wire::{UserDataResponse, WireOperation, WireOperationList};
