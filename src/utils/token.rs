use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::models::UserRole;

/// Claims carried by a session token.
///
/// `sub` is the user id, `contact` the phone or email the user logged in with,
/// `jti` a fresh UUID per issuance so two tokens minted in the same second are
/// still distinguishable.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    pub sub: String,
    pub contact: String,
    pub role: UserRole,
    pub jti: String,
    pub iat: usize,
    pub exp: usize,
}

pub fn create_token(
    user_id: &str,
    contact: &str,
    role: UserRole,
    secret: &[u8],
    expires_in_seconds: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    if user_id.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    let now = Utc::now();
    let iat = now.timestamp() as usize;
    let exp = (now + Duration::seconds(expires_in_seconds)).timestamp() as usize;
    let claims = TokenClaims {
        sub: user_id.to_string(),
        contact: contact.to_string(),
        role,
        jti: uuid::Uuid::new_v4().to_string(),
        iat,
        exp,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

/// Verify signature and expiry, returning the claims.
///
/// Returns None on any verification failure; callers treat that as
/// "unauthenticated", never as a fatal error. The token's signed expiry is the
/// sole validity authority — cookie max-age is transport, not truth.
pub fn resolve_token<T: Into<String>>(token: T, secret: &[u8]) -> Option<TokenClaims> {
    decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn round_trip_preserves_claims() {
        let token =
            create_token("user-1", "0911000000", UserRole::Reader, SECRET, 7200).unwrap();
        let claims = resolve_token(token, SECRET).expect("token should verify");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.contact, "0911000000");
        assert_eq!(claims.role, UserRole::Reader);
    }

    #[test]
    fn expired_token_resolves_to_none() {
        let token =
            create_token("user-1", "0911000000", UserRole::Reader, SECRET, -3600).unwrap();
        assert!(resolve_token(token, SECRET).is_none());
    }

    #[test]
    fn wrong_secret_resolves_to_none() {
        let token =
            create_token("user-1", "0911000000", UserRole::Admin, SECRET, 7200).unwrap();
        assert!(resolve_token(token, b"other-secret").is_none());
    }

    #[test]
    fn tampered_token_resolves_to_none() {
        let token =
            create_token("user-1", "0911000000", UserRole::Admin, SECRET, 7200).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(resolve_token(tampered, SECRET).is_none());
    }

    #[test]
    fn each_issuance_gets_unique_jti() {
        let a = create_token("user-1", "0911000000", UserRole::Reader, SECRET, 7200).unwrap();
        let b = create_token("user-1", "0911000000", UserRole::Reader, SECRET, 7200).unwrap();
        let ca = resolve_token(a, SECRET).unwrap();
        let cb = resolve_token(b, SECRET).unwrap();
        assert_ne!(ca.jti, cb.jti);
    }

    #[test]
    fn empty_user_id_rejected() {
        assert!(create_token("", "0911000000", UserRole::Reader, SECRET, 7200).is_err());
    }
}
