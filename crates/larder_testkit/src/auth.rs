//! Signed bearer tokens for the fake service.
//!
//! ## Token Format
//!
//! Tokens are dot-separated text:
//!
//! ```text
//! <kind>.<hex subject>.<serial>.<issued at, unix millis>.<hex HMAC-SHA256>
//! ```
//!
//! The signature covers everything before the last dot. Serials grow
//! monotonically, which lets the server expire every token issued before a
//! given point without touching the clock.

use crate::error::{ServerError, ServerResult};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// What a token grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Bearer access to the data endpoints.
    Access,
    /// One-time exchange for a new token pair.
    Refresh,
}

impl TokenKind {
    fn tag(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Decoded contents of a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Token kind.
    pub kind: TokenKind,
    /// User the token was issued to.
    pub subject: String,
    /// Issue serial.
    pub serial: u64,
    /// Issue time in unix milliseconds.
    pub issued_at: i64,
}

/// Issues and validates tokens.
pub struct TokenIssuer {
    secret: Vec<u8>,
    access_ttl: Option<Duration>,
    next_serial: AtomicU64,
}

impl TokenIssuer {
    /// Creates an issuer whose access tokens never expire on their own.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: None,
            next_serial: AtomicU64::new(1),
        }
    }

    /// Expires access tokens once they are older than `ttl`.
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = Some(ttl);
        self
    }

    /// Serial the next token will carry.
    pub fn next_serial(&self) -> u64 {
        self.next_serial.load(Ordering::SeqCst)
    }

    /// Issues a token of `kind` for `subject`.
    pub fn issue(&self, kind: TokenKind, subject: &str) -> String {
        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst);
        let payload = format!(
            "{}.{}.{}.{}",
            kind.tag(),
            hex::encode(subject),
            serial,
            Utc::now().timestamp_millis()
        );
        let signature = hex::encode(self.sign(payload.as_bytes()));
        format!("{payload}.{signature}")
    }

    /// Validates a token of the expected kind and returns its claims.
    pub fn validate(&self, token: &str, expected: TokenKind) -> ServerResult<TokenClaims> {
        let (payload, signature) = token
            .rsplit_once('.')
            .ok_or_else(|| ServerError::NotAuthorized("malformed token".into()))?;
        let signature = hex::decode(signature)
            .map_err(|_| ServerError::NotAuthorized("malformed signature".into()))?;

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| ServerError::NotAuthorized("invalid signature".into()))?;

        let claims = parse_payload(payload)?;
        if claims.kind != expected {
            return Err(ServerError::NotAuthorized(format!(
                "expected a {} token",
                expected.tag()
            )));
        }

        if let (TokenKind::Access, Some(ttl)) = (claims.kind, self.access_ttl) {
            let age = Utc::now().timestamp_millis() - claims.issued_at;
            if age > ttl.as_millis() as i64 {
                return Err(ServerError::NotAuthorized("token expired".into()));
            }
        }

        Ok(claims)
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size")
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("next_serial", &self.next_serial())
            .finish_non_exhaustive()
    }
}

fn parse_payload(payload: &str) -> ServerResult<TokenClaims> {
    let malformed = || ServerError::NotAuthorized("malformed token".into());

    let mut parts = payload.split('.');
    let kind = match parts.next() {
        Some("access") => TokenKind::Access,
        Some("refresh") => TokenKind::Refresh,
        _ => return Err(malformed()),
    };
    let subject = parts
        .next()
        .and_then(|s| hex::decode(s).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(malformed)?;
    let serial = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(malformed)?;
    let issued_at = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(malformed)?;
    if parts.next().is_some() {
        return Err(malformed());
    }

    Ok(TokenClaims {
        kind,
        subject,
        serial,
        issued_at,
    })
}
