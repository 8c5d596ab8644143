//! AES-256-GCM cipher with a secret-derived key.

use crate::error::{CoreError, CoreResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce (IV) in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

const KEY_CONTEXT: &[u8] = b"larder-credentials-v1";

/// Encryption key for AES-256-GCM.
///
/// The key is automatically zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CoreError::invalid_key_size(bytes.len(), KEY_SIZE));
        }

        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Returns the key as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Derives a key from an account secret using HKDF-SHA256.
    ///
    /// The derivation is deterministic: the same secret always yields the
    /// same key, so credentials written by one process can be read by the
    /// next one that knows the password.
    pub fn derive_from_secret(secret: &[u8]) -> CoreResult<Self> {
        use hkdf::Hkdf;
        use sha2::Sha256;

        let hk = Hkdf::<Sha256>::new(None, secret);

        let mut bytes = [0u8; KEY_SIZE];
        hk.expand(KEY_CONTEXT, &mut bytes)
            .map_err(|_| CoreError::key_derivation_failed("HKDF expand failed"))?;

        Ok(Self { bytes })
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Ciphertext together with the IV it was sealed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Random per-encryption IV.
    pub iv: [u8; NONCE_SIZE],
    /// Ciphertext followed by the authentication tag.
    pub ciphertext: Vec<u8>,
}

/// Encrypts and decrypts with one key.
pub struct CryptoManager {
    cipher: Aes256Gcm,
}

impl CryptoManager {
    /// Creates a new crypto manager with the given key.
    #[must_use]
    pub fn new(key: &EncryptionKey) -> Self {
        let key_array = GenericArray::from_slice(key.as_bytes());
        let cipher = Aes256Gcm::new(key_array);
        Self { cipher }
    }

    /// Encrypts data under a fresh random IV.
    pub fn encrypt(&self, plaintext: &[u8]) -> CoreResult<Sealed> {
        let mut iv = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);
        let nonce = Nonce::from_slice(&iv);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CoreError::encryption_failed("encryption error"))?;

        Ok(Sealed { iv, ciphertext })
    }

    /// Decrypts data sealed by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Fails if the IV has the wrong length, the ciphertext is truncated, or
    /// authentication fails (wrong key or corrupted data).
    pub fn decrypt(&self, iv: &[u8], ciphertext: &[u8]) -> CoreResult<Vec<u8>> {
        if iv.len() != NONCE_SIZE {
            return Err(CoreError::decryption_failed(format!(
                "IV must be {NONCE_SIZE} bytes, got {}",
                iv.len()
            )));
        }
        if ciphertext.len() < TAG_SIZE {
            return Err(CoreError::decryption_failed("ciphertext too short"));
        }

        self.cipher
            .decrypt(Nonce::from_slice(iv), ciphertext)
            .map_err(|_| CoreError::decryption_failed("decryption error"))
    }
}

impl std::fmt::Debug for CryptoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoManager")
            .field("cipher", &"Aes256Gcm")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(secret: &str) -> CryptoManager {
        CryptoManager::new(&EncryptionKey::derive_from_secret(secret.as_bytes()).unwrap())
    }

    #[test]
    fn derivation_is_deterministic() {
        let key1 = EncryptionKey::derive_from_secret(b"hunter2").unwrap();
        let key2 = EncryptionKey::derive_from_secret(b"hunter2").unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes());

        let key3 = EncryptionKey::derive_from_secret(b"hunter3").unwrap();
        assert_ne!(key1.as_bytes(), key3.as_bytes());
    }

    #[test]
    fn key_wrong_size() {
        assert!(EncryptionKey::from_bytes(&[0u8; 16]).is_err());
        assert!(EncryptionKey::from_bytes(&[0u8; 64]).is_err());
        assert!(EncryptionKey::from_bytes(&[7u8; KEY_SIZE]).is_ok());
    }

    #[test]
    fn key_debug_is_redacted() {
        let key = EncryptionKey::from_bytes(&[42u8; KEY_SIZE]).unwrap();
        let debug = format!("{key:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("42"));
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let manager = manager("secret");
        let sealed = manager.encrypt(b"token material").unwrap();
        assert_eq!(
            manager.decrypt(&sealed.iv, &sealed.ciphertext).unwrap(),
            b"token material"
        );
    }

    #[test]
    fn fresh_iv_per_encryption() {
        let manager = manager("secret");
        let a = manager.encrypt(b"same").unwrap();
        let b = manager.encrypt(b"same").unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = manager("right").encrypt(b"secret").unwrap();
        assert!(manager("wrong")
            .decrypt(&sealed.iv, &sealed.ciphertext)
            .is_err());
    }

    #[test]
    fn corrupted_or_truncated_fails() {
        let manager = manager("secret");
        let mut sealed = manager.encrypt(b"data").unwrap();
        let last = sealed.ciphertext.len() - 1;
        sealed.ciphertext[last] ^= 0xFF;
        assert!(manager.decrypt(&sealed.iv, &sealed.ciphertext).is_err());

        assert!(manager.decrypt(&sealed.iv, &[0u8; 4]).is_err());
        assert!(manager.decrypt(&[0u8; 8], &sealed.ciphertext).is_err());
    }
}
