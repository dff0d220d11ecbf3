//! Signed session tokens for the user API.
//!
//! A session token is issued on registration or login and carried either in
//! the `session` cookie or in an `Authorization: Bearer` header:
//!
//! ```text
//! {user_id}.{expires_at}.{base64_signature}
//! ```
//!
//! The signature is `HMAC-SHA256("{user_id}.{expires_at}", key)`, with
//! `expires_at` a unix timestamp in seconds.

/// Name of the cookie that carries the session token.
pub const SESSION_COOKIE: &str = "session";

/// Errors produced by session token verification.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid token format")]
    InvalidFormat,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("session expired")]
    Expired,
}

impl From<ring::error::Unspecified> for SessionError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

/// The authenticated claims carried by a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: i64,
    pub expires_at: i64,
}

/// Issue a token for `user_id` that stays valid for `ttl_secs` seconds.
pub fn issue(user_id: i64, ttl_secs: i64, key: &[u8]) -> String {
    let expires_at = time::OffsetDateTime::now_utc().unix_timestamp() + ttl_secs;
    let claims = SessionClaims {
        user_id,
        expires_at,
    };
    sign(claims, key)
}

/// Format and sign the given claims.
pub fn sign(claims: SessionClaims, key: &[u8]) -> String {
    let data = format!("{}.{}", claims.user_id, claims.expires_at);
    let signature = ring::hmac::sign(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        data.as_bytes(),
    );
    format!(
        "{}.{}",
        data,
        fast32::base64::RFC4648_NOPAD.encode(signature.as_ref())
    )
}

/// Verify a token's signature and expiry and return its claims.
pub fn verify(token: &str, key: &[u8]) -> Result<SessionClaims, SessionError> {
    let (data, encoded_signature) = token.rsplit_once('.').ok_or(SessionError::InvalidFormat)?;
    let (user_id, expires_at) = data.split_once('.').ok_or(SessionError::InvalidFormat)?;
    let user_id: i64 = user_id.parse().map_err(|_| SessionError::InvalidFormat)?;
    let expires_at: i64 = expires_at
        .parse()
        .map_err(|_| SessionError::InvalidFormat)?;

    let signature = fast32::base64::RFC4648_NOPAD
        .decode_str(encoded_signature)
        .map_err(|_| SessionError::InvalidBase64)?;

    ring::hmac::verify(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        data.as_bytes(),
        &signature,
    )?;

    if time::OffsetDateTime::now_utc().unix_timestamp() >= expires_at {
        return Err(SessionError::Expired);
    }

    Ok(SessionClaims {
        user_id,
        expires_at,
    })
}
