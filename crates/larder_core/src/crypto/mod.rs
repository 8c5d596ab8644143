//! Identity codec.
//!
//! Credential records are persisted encrypted with a key derived from the
//! account password.
//!
//! ## Security Model
//!
//! - AES-256-GCM authenticated encryption
//! - Fresh random 12-byte IV per encryption
//! - Key derived with HKDF-SHA256 from the secret, no salt, fixed context
//! - Keys are zeroized on drop and redacted from `Debug`
//!
//! ## Usage
//!
//! ```ignore
//! use larder_core::crypto::{self, CredentialRecord};
//!
//! let blob = crypto::encrypt(&record, "password")?;
//! let back = crypto::decrypt(&blob, "password")?;
//! ```

mod encrypted;
mod identity;

pub use encrypted::{CryptoManager, EncryptionKey, Sealed, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use identity::{decrypt, encrypt, CredentialRecord};
