//! Encrypted credential records.

use super::encrypted::{CryptoManager, EncryptionKey, NONCE_SIZE};
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The persisted subset of a session.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CredentialRecord {
    /// Stable client identifier.
    pub client_id: Option<String>,
    /// Bearer access token.
    pub access_token: Option<String>,
    /// Refresh token.
    pub refresh_token: Option<String>,
}

impl CredentialRecord {
    /// Returns true if both tokens are present.
    pub fn has_tokens(&self) -> bool {
        self.access_token.is_some() && self.refresh_token.is_some()
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |token: &Option<String>| token.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("CredentialRecord")
            .field("client_id", &self.client_id)
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

#[derive(Serialize, Deserialize)]
struct EncryptedBlob {
    iv: String,
    cipher: String,
}

/// Encrypts a credential record with a key derived from `secret`.
///
/// The result is JSON `{"iv": <hex>, "cipher": <hex>}`.
pub fn encrypt(record: &CredentialRecord, secret: &str) -> CoreResult<Vec<u8>> {
    let plaintext = serde_json::to_vec(record)
        .map_err(|e| CoreError::encryption_failed(format!("serialize record: {e}")))?;

    let key = EncryptionKey::derive_from_secret(secret.as_bytes())?;
    let sealed = CryptoManager::new(&key).encrypt(&plaintext)?;

    let blob = EncryptedBlob {
        iv: hex::encode(sealed.iv),
        cipher: hex::encode(sealed.ciphertext),
    };
    serde_json::to_vec(&blob)
        .map_err(|e| CoreError::encryption_failed(format!("serialize blob: {e}")))
}

/// Decrypts a blob produced by [`encrypt`].
///
/// Fails closed: malformed input, a wrong secret and corruption all return
/// an error.
pub fn decrypt(blob: &[u8], secret: &str) -> CoreResult<CredentialRecord> {
    let blob: EncryptedBlob = serde_json::from_slice(blob)
        .map_err(|e| CoreError::invalid_format(format!("credential blob: {e}")))?;

    let iv = hex::decode(&blob.iv)
        .map_err(|e| CoreError::invalid_format(format!("credential iv: {e}")))?;
    if iv.len() != NONCE_SIZE {
        return Err(CoreError::invalid_format(format!(
            "credential iv must be {NONCE_SIZE} bytes, got {}",
            iv.len()
        )));
    }
    let ciphertext = hex::decode(&blob.cipher)
        .map_err(|e| CoreError::invalid_format(format!("credential cipher: {e}")))?;

    let key = EncryptionKey::derive_from_secret(secret.as_bytes())?;
    let plaintext = CryptoManager::new(&key).decrypt(&iv, &ciphertext)?;

    serde_json::from_slice(&plaintext)
        .map_err(|e| CoreError::decryption_failed(format!("credential record: {e}")))
}
