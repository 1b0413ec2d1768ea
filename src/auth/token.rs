//! Signed bearer tokens.
//!
//! A token is `base64url(claims-json) . base64url(hmac-sha256)`. The wire
//! format is private to this server; clients treat tokens as opaque.

use crate::db::now_ms;
use crate::error::{ApiError, ApiResult};
use crate::types::UserId;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Owning user id.
    sub: UserId,
    /// Expiry, epoch ms.
    exp: i64,
}

/// Issues and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    ttl_ms: i64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl_ms: ttl_hours * 3_600_000,
        }
    }

    /// Issue a token for the given user, valid for the configured TTL.
    pub fn issue(&self, user_id: UserId) -> ApiResult<String> {
        let claims = Claims {
            sub: user_id,
            exp: now_ms() + self.ttl_ms,
        };
        let payload = serde_json::to_vec(&claims).map_err(ApiError::internal)?;
        let sig = self.sign(&payload)?;

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(sig)
        ))
    }

    /// Verify a token and return the caller's user id.
    ///
    /// Malformed tokens, bad signatures, and expired claims all map to the
    /// same credential error; nothing about the failure mode is leaked.
    pub fn verify(&self, token: &str) -> ApiResult<UserId> {
        let (payload_b64, sig_b64) = token
            .split_once('.')
            .ok_or_else(ApiError::invalid_credentials)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| ApiError::invalid_credentials())?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| ApiError::invalid_credentials())?;

        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(ApiError::internal)?;
        mac.update(&payload);
        mac.verify_slice(&sig)
            .map_err(|_| ApiError::invalid_credentials())?;

        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| ApiError::invalid_credentials())?;

        if claims.exp < now_ms() {
            return Err(ApiError::invalid_credentials());
        }

        Ok(claims.sub)
    }

    fn sign(&self, payload: &[u8]) -> ApiResult<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(ApiError::internal)?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn service() -> TokenService {
        TokenService::new("test-secret", 2)
    }

    #[test]
    fn test_round_trip() {
        let svc = service();
        let token = svc.issue(42).unwrap();
        assert_eq!(svc.verify(&token).unwrap(), 42);
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let svc = service();
        let token = svc.issue(42).unwrap();
        let (_, sig) = token.split_once('.').unwrap();
        let forged_claims = URL_SAFE_NO_PAD.encode(br#"{"sub":1,"exp":9999999999999}"#);
        let forged = format!("{}.{}", forged_claims, sig);

        let err = svc.verify(&forged).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCredentials);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = service().issue(42).unwrap();
        let other = TokenService::new("other-secret", 2);
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let svc = TokenService::new("test-secret", -1);
        let token = svc.issue(42).unwrap();
        let err = svc.verify(&token).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCredentials);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let svc = service();
        assert!(svc.verify("nonsense").is_err());
        assert!(svc.verify("a.b").is_err());
        assert!(svc.verify("").is_err());
    }
}
