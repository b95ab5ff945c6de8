/*
[INPUT]:  Admin username and password or SHA-256 password hash
[OUTPUT]: Serialized `auth` request frames
[POS]:    Auth layer - credential pair attached to each outbound frame
[UPDATE]: When the bot changes how it verifies websocket logins
*/

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::types::{EventType, Request};

/// Static credential pair. Fixed at client startup, never negotiated.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    principal: String,
    secret_hash: String,
}

#[derive(Serialize)]
struct AuthPayload<'a> {
    username: &'a str,
    password: &'a str,
}

impl Credential {
    /// Build from an already hashed secret (lower-case hex SHA-256)
    pub fn new(principal: impl Into<String>, secret_hash: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            secret_hash: secret_hash.into().to_ascii_lowercase(),
        }
    }

    /// Build from a plaintext password; the bot compares against its SHA-256 hex digest.
    pub fn from_password(principal: impl Into<String>, password: &str) -> Self {
        let digest = Sha256::digest(password.as_bytes());
        Self::new(principal, hex::encode(digest))
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn secret_hash(&self) -> &str {
        &self.secret_hash
    }

    pub fn auth_request(&self) -> Result<Request> {
        let payload = AuthPayload {
            username: &self.principal,
            password: &self.secret_hash,
        };
        Ok(Request::new(EventType::Auth, serde_json::to_value(payload)?))
    }

    /// Serialized `auth` frame, ready to precede a request on the wire
    pub fn auth_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.auth_request()?)?)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("principal", &self.principal)
            .field("secret_hash", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_from_password_hashes_sha256_hex() {
        let credential = Credential::from_password("admin", "Password");
        assert_eq!(
            credential.secret_hash(),
            "e7cf3ef4f17c3999a94f2c6f612e8a888e5b1026878e4e19398b23bd38ec221a"
        );
    }

    #[test]
    fn test_auth_frame_shape() {
        let credential = Credential::new("admin", "ABCDEF");
        let frame: Value = serde_json::from_str(&credential.auth_frame().unwrap()).unwrap();
        assert_eq!(
            frame,
            json!({ "Event": "auth", "data": { "username": "admin", "password": "abcdef" } })
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let credential = Credential::new("admin", "deadbeef");
        let rendered = format!("{credential:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("deadbeef"));
    }
}
