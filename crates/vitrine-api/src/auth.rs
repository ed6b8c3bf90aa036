//! HS256 token validation for WebSocket authentication.
//!
//! Tokens are issued by the back office's login flow; this module only
//! checks them. [`TokenValidator::issue`] exists for development and tests.

use base64::prelude::*;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Token validation is not configured")]
    NotConfigured,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AuthError {
    /// Error code reported to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidToken(_) | Self::NotConfigured => "INVALID_TOKEN",
            Self::ExpiredToken => "TOKEN_EXPIRED",
            Self::InvalidInput(_) => "BAD_REQUEST",
        }
    }
}

/// Identity carried by a valid token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub user_id: String,
    pub role: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl TokenClaims {
    /// Every role tag of this identity, primary role first.
    pub fn all_roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = self.role.iter().cloned().collect();
        for role in &self.roles {
            if !roles.contains(role) {
                roles.push(role.clone());
            }
        }
        roles
    }
}

/// Validates HS256 tokens against a shared secret.
#[derive(Clone)]
pub struct TokenValidator {
    secret: Option<String>,
}

fn create_hmac(key: &[u8]) -> Result<HmacSha256, AuthError> {
    HmacSha256::new_from_slice(key)
        .map_err(|_| AuthError::InvalidInput("Invalid JWT secret length".to_string()))
}

impl TokenValidator {
    /// Without a secret every token is rejected.
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    fn mac(&self, data: &str) -> Result<HmacSha256, AuthError> {
        let secret = self.secret.as_ref().ok_or(AuthError::NotConfigured)?;
        let mut mac = create_hmac(secret.as_bytes())?;
        mac.update(data.as_bytes());
        Ok(mac)
    }

    fn sign(&self, data: &str) -> Result<String, AuthError> {
        let mac = self.mac(data)?;
        Ok(BASE64_URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    /// Mint a token for `user_id`, valid for `ttl_secs` seconds.
    pub fn issue(&self, user_id: &str, role: Option<&str>, ttl_secs: i64) -> Result<String, AuthError> {
        if user_id.is_empty() {
            return Err(AuthError::InvalidInput("user id is required".to_string()));
        }
        let now = chrono::Utc::now().timestamp();

        let header = BASE64_URL_SAFE_NO_PAD.encode(json!({"alg": "HS256", "typ": "JWT"}).to_string());
        let payload = BASE64_URL_SAFE_NO_PAD.encode(
            json!({
                "sub": user_id,
                "role": role,
                "iat": now,
                "exp": now + ttl_secs,
            })
            .to_string(),
        );
        let signature = self.sign(&format!("{}.{}", header, payload))?;

        Ok(format!("{}.{}.{}", header, payload, signature))
    }

    /// Validate `token` and return its claims.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(AuthError::InvalidToken("Invalid token format".into()));
        }

        let signature = BASE64_URL_SAFE_NO_PAD
            .decode(parts[2])
            .map_err(|_| AuthError::InvalidToken("Invalid signature encoding".into()))?;
        // Constant-time comparison.
        self.mac(&format!("{}.{}", parts[0], parts[1]))?
            .verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken("Invalid signature".into()))?;

        let payload_bytes = BASE64_URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|_| AuthError::InvalidToken("Invalid payload encoding".into()))?;
        let payload: serde_json::Value = serde_json::from_slice(&payload_bytes)
            .map_err(|_| AuthError::InvalidToken("Invalid payload JSON".into()))?;

        let exp = payload["exp"].as_i64().unwrap_or(0);
        if exp < chrono::Utc::now().timestamp() {
            return Err(AuthError::ExpiredToken);
        }

        // Tokens from the back office carry `userId`; ours carry `sub`.
        let user_id = payload["sub"]
            .as_str()
            .or_else(|| payload["userId"].as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::InvalidToken("Missing subject".into()))?;

        let roles = payload["roles"]
            .as_array()
            .map(|roles| {
                roles
                    .iter()
                    .filter_map(|r| r.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Ok(TokenClaims {
            user_id: user_id.to_string(),
            role: payload["role"].as_str().map(str::to_string),
            roles,
            issued_at: payload["iat"].as_i64().unwrap_or(0),
            expires_at: exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> TokenValidator {
        TokenValidator::new(Some("test-secret".to_string()))
    }

    #[test]
    fn test_issue_then_validate() {
        let v = validator();
        let token = v.issue("u42", Some("admin"), 3600).unwrap();
        let claims = v.validate(&token).unwrap();
        assert_eq!(claims.user_id, "u42");
        assert_eq!(claims.role.as_deref(), Some("admin"));
        assert_eq!(claims.all_roles(), vec!["admin".to_string()]);
    }

    #[test]
    fn test_rejects_bad_tokens() {
        let v = validator();
        assert!(matches!(v.validate("nope"), Err(AuthError::InvalidToken(_))));

        let other = TokenValidator::new(Some("other".to_string()));
        let token = other.issue("u1", None, 3600).unwrap();
        assert!(matches!(v.validate(&token), Err(AuthError::InvalidToken(_))));

        let expired = v.issue("u1", None, -10).unwrap();
        assert_eq!(v.validate(&expired), Err(AuthError::ExpiredToken));
    }

    #[test]
    fn test_rejects_tampered_signature() {
        let v = validator();
        let token = v.issue("u1", Some("admin"), 3600).unwrap();
        let (unsigned, signature) = token.rsplit_once('.').unwrap();

        let mut bytes = BASE64_URL_SAFE_NO_PAD.decode(signature).unwrap();
        bytes[0] ^= 0x01;
        let flipped = format!("{}.{}", unsigned, BASE64_URL_SAFE_NO_PAD.encode(&bytes));
        assert_eq!(
            v.validate(&flipped),
            Err(AuthError::InvalidToken("Invalid signature".into()))
        );

        let truncated = format!("{}.{}", unsigned, BASE64_URL_SAFE_NO_PAD.encode(&bytes[..16]));
        assert!(matches!(v.validate(&truncated), Err(AuthError::InvalidToken(_))));

        let garbled = format!("{}.not*base64", unsigned);
        assert_eq!(
            v.validate(&garbled),
            Err(AuthError::InvalidToken("Invalid signature encoding".into()))
        );
    }

    #[test]
    fn test_unconfigured_rejects_everything() {
        let v = TokenValidator::new(None);
        assert!(!v.is_configured());
        let token = validator().issue("u1", None, 3600).unwrap();
        assert_eq!(v.validate(&token), Err(AuthError::NotConfigured));
        assert_eq!(AuthError::NotConfigured.code(), "INVALID_TOKEN");
    }
}
