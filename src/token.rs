//! Token lifecycle management.
//!
//! Owns all mutation of the stored OAuth credential pair: the initial
//! authorization-code exchange and transparent refresh of expiring access
//! tokens. Every successful refresh persists the new credential before the
//! access token is handed to the caller, so the system never uses a token
//! it could not later refresh from.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use crate::db::{queries, DbPool};
use crate::error::{AppError, Result};
use crate::models::SaveTokens;
use crate::transport::{HttpRequest, Transport};

/// Refresh proactively when the token expires within this window.
pub const REFRESH_WINDOW_SECS: i64 = 5 * 60;

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Token endpoint response for both grant types.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Refresh tokens are not always rotated; absence means keep the old one.
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

pub struct TokenManager<T: Transport> {
    pool: DbPool,
    transport: Arc<T>,
    oauth: OAuthConfig,
}

impl<T: Transport> Clone for TokenManager<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            transport: self.transport.clone(),
            oauth: self.oauth.clone(),
        }
    }
}

impl<T: Transport> TokenManager<T> {
    pub fn new(pool: DbPool, transport: Arc<T>, oauth: OAuthConfig) -> Self {
        Self {
            pool,
            transport,
            oauth,
        }
    }

    /// Return a valid access token for the creator, refreshing first when
    /// the stored one expires within [`REFRESH_WINDOW_SECS`].
    pub async fn valid_access_token(&self, creator_id: &str) -> Result<String> {
        let credential = {
            let conn = self.pool.get()?;
            queries::get_tokens(&conn, creator_id)?.ok_or(AppError::NoCredential)?
        };

        if let Some(expires_at) = credential.expires_at {
            if expires_at <= Utc::now().timestamp() + REFRESH_WINDOW_SECS {
                tracing::debug!("access token for {} expiring soon, refreshing", creator_id);
                return self
                    .refresh(creator_id, credential.refresh_token.as_deref())
                    .await;
            }
        }

        Ok(credential.access_token)
    }

    /// Refresh regardless of the stored expiry. Used after the gateway saw
    /// a 401 with a token we believed valid.
    pub async fn force_refresh(&self, creator_id: &str) -> Result<String> {
        let credential = {
            let conn = self.pool.get()?;
            queries::get_tokens(&conn, creator_id)?.ok_or(AppError::NoCredential)?
        };
        self.refresh(creator_id, credential.refresh_token.as_deref())
            .await
    }

    async fn refresh(&self, creator_id: &str, refresh_token: Option<&str>) -> Result<String> {
        let refresh_token = refresh_token.ok_or_else(|| AppError::RefreshFailed {
            status: 0,
            body: "no refresh token on file".to_string(),
        })?;

        let mut form = vec![
            ("grant_type".to_string(), "refresh_token".to_string()),
            ("refresh_token".to_string(), refresh_token.to_string()),
        ];
        if let Some(id) = &self.oauth.client_id {
            form.push(("client_id".to_string(), id.clone()));
        }
        if let Some(secret) = &self.oauth.client_secret {
            form.push(("client_secret".to_string(), secret.clone()));
        }

        let response = self
            .transport
            .send(HttpRequest::post_form(&self.oauth.token_url, form))
            .await
            .map_err(|e| AppError::GatewayUnavailable(e.to_string()))?;

        if !response.is_success() {
            return Err(AppError::RefreshFailed {
                status: response.status,
                body: response.body,
            });
        }

        let data: TokenResponse = serde_json::from_str(&response.body)?;
        let expires_at = data
            .expires_in
            .map(|secs| Utc::now().timestamp() + secs);

        // Persist before returning the token to the caller.
        let conn = self.pool.get()?;
        queries::save_tokens(
            &conn,
            &SaveTokens {
                creator_id: creator_id.to_string(),
                access_token: data.access_token.clone(),
                refresh_token: data
                    .refresh_token
                    .or_else(|| Some(refresh_token.to_string())),
                expires_at,
            },
        )?;

        tracing::info!("refreshed access token for creator {}", creator_id);
        Ok(data.access_token)
    }

    /// Exchange an authorization code during the OAuth callback.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenResponse> {
        let mut form = vec![
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("code".to_string(), code.to_string()),
            ("redirect_uri".to_string(), redirect_uri.to_string()),
        ];
        if let Some(id) = &self.oauth.client_id {
            form.push(("client_id".to_string(), id.clone()));
        }
        if let Some(secret) = &self.oauth.client_secret {
            form.push(("client_secret".to_string(), secret.clone()));
        }

        let response = self
            .transport
            .send(HttpRequest::post_form(&self.oauth.token_url, form))
            .await
            .map_err(|e| AppError::GatewayUnavailable(e.to_string()))?;

        if !response.is_success() {
            return Err(AppError::RefreshFailed {
                status: response.status,
                body: response.body,
            });
        }

        serde_json::from_str(&response.body).map_err(Into::into)
    }

    /// Persist a credential pair obtained from an exchange.
    pub fn store(&self, creator_id: &str, tokens: &TokenResponse) -> Result<()> {
        let conn = self.pool.get()?;
        queries::save_tokens(
            &conn,
            &SaveTokens {
                creator_id: creator_id.to_string(),
                access_token: tokens.access_token.clone(),
                refresh_token: tokens.refresh_token.clone(),
                expires_at: tokens
                    .expires_in
                    .map(|secs| Utc::now().timestamp() + secs),
            },
        )?;
        Ok(())
    }
}
