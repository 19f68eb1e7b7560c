//! Signed session cookies.
//!
//! The session boundary supplies `creator_id` for every authenticated call:
//! a cookie of the form `creator_id.hmac_sha256_hex(creator_id)` signed with
//! the configured session secret, verified in constant time.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::db::AppState;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "rg_session";
pub const STATE_COOKIE: &str = "rg_oauth_state";

const SESSION_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;
const STATE_MAX_AGE_SECS: i64 = 10 * 60;

#[derive(Clone)]
pub struct SessionKeys {
    secret: Vec<u8>,
}

impl SessionKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    fn mac_hex(&self, value: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC can take key of any size");
        mac.update(value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Produce a signed cookie value: `value.signature`.
    pub fn sign(&self, value: &str) -> String {
        format!("{}.{}", value, self.mac_hex(value))
    }

    /// Verify a signed cookie value, returning the embedded value.
    pub fn verify(&self, cookie_value: &str) -> Option<String> {
        let (value, signature) = cookie_value.rsplit_once('.')?;
        let expected = self.mac_hex(value);
        if expected.len() != signature.len() {
            return None;
        }
        if bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            Some(value.to_string())
        } else {
            None
        }
    }
}

/// Build a Set-Cookie header value for the session cookie.
pub fn session_cookie(signed_value: &str, secure: bool) -> String {
    cookie(SESSION_COOKIE, signed_value, SESSION_MAX_AGE_SECS, secure)
}

/// Short-lived cookie carrying the OAuth state nonce across the redirect.
pub fn state_cookie(signed_value: &str, secure: bool) -> String {
    cookie(STATE_COOKIE, signed_value, STATE_MAX_AGE_SECS, secure)
}

pub fn clear_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

fn cookie(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let mut header = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, value, max_age
    );
    if secure {
        header.push_str("; Secure");
    }
    header
}

/// Read a cookie value from request headers.
pub fn cookie_from_headers(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Authenticated creator session, extracted from the signed session cookie.
pub struct CreatorSession(pub String);

impl FromRequestParts<AppState> for CreatorSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookie = cookie_from_headers(&parts.headers, SESSION_COOKIE)
            .ok_or(AppError::Unauthorized)?;
        let creator_id = state
            .session
            .verify(&cookie)
            .ok_or(AppError::Unauthorized)?;
        Ok(CreatorSession(creator_id))
    }
}

/// Like [`CreatorSession`] but optional: anonymous requests extract `None`.
pub struct MaybeCreatorSession(pub Option<String>);

impl FromRequestParts<AppState> for MaybeCreatorSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let creator_id = cookie_from_headers(&parts.headers, SESSION_COOKIE)
            .and_then(|cookie| state.session.verify(&cookie));
        Ok(MaybeCreatorSession(creator_id))
    }
}
