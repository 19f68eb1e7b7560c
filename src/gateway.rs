//! Authenticated client for the Whop payment API.
//!
//! Wraps every call in a bounded retry loop: rate limiting honors
//! `Retry-After` or falls back to exponential backoff, a 401 forces a token
//! refresh and retries immediately, other 4xx responses fail fast, and
//! 5xx/network failures back off until the attempt budget is spent.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::token::TokenManager;
use crate::transport::{HttpRequest, Transport};

/// Bounded retry configuration consumed by [`WhopClient::request`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff: `base_delay * 2^(attempt-1)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

pub struct WhopClient<T: Transport> {
    api_base: String,
    transport: Arc<T>,
    tokens: TokenManager<T>,
    retry: RetryPolicy,
}

impl<T: Transport> Clone for WhopClient<T> {
    fn clone(&self) -> Self {
        Self {
            api_base: self.api_base.clone(),
            transport: self.transport.clone(),
            tokens: self.tokens.clone(),
            retry: self.retry,
        }
    }
}

impl<T: Transport> WhopClient<T> {
    pub fn new(
        api_base: String,
        transport: Arc<T>,
        tokens: TokenManager<T>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            api_base,
            transport,
            tokens,
            retry,
        }
    }

    pub fn tokens(&self) -> &TokenManager<T> {
        &self.tokens
    }

    /// Issue an authenticated request with retry/backoff and token refresh.
    ///
    /// Credential problems (`NoCredential`, `RefreshFailed`) propagate
    /// immediately - retrying the same rejected token would be pointless.
    pub async fn request(
        &self,
        creator_id: &str,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.api_base, endpoint);
        let max = self.retry.max_attempts;
        let mut last_err: Option<AppError> = None;
        let mut attempt = 1u32;

        while attempt <= max {
            let token = self.tokens.valid_access_token(creator_id).await?;

            tracing::debug!("{} {} (attempt {}/{})", method, url, attempt, max);

            let mut request = HttpRequest::new(method.clone(), &url).with_bearer(token);
            if let Some(body) = &body {
                request = request.with_json(body.clone());
            }

            let response = match self.transport.send(request).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("network error calling {}: {}", url, e);
                    last_err = Some(AppError::GatewayUnavailable(e.to_string()));
                    if attempt < max {
                        tokio::time::sleep(self.retry.backoff_delay(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    break;
                }
            };

            match response.status {
                429 => {
                    last_err = Some(AppError::GatewayUnavailable(format!(
                        "rate limited: {}",
                        response.body
                    )));
                    if attempt < max {
                        let wait = response
                            .retry_after
                            .map(Duration::from_secs)
                            .unwrap_or_else(|| self.retry.backoff_delay(attempt));
                        tracing::warn!("rate limited, retrying after {:?}", wait);
                        tokio::time::sleep(wait).await;
                        attempt += 1;
                        continue;
                    }
                    break;
                }
                401 if attempt < max => {
                    // Token may have been revoked out from under us; refresh
                    // and retry without consuming a backoff delay.
                    tracing::warn!("unauthorized from gateway, forcing token refresh");
                    self.tokens.force_refresh(creator_id).await?;
                    attempt += 1;
                    continue;
                }
                status if (400..500).contains(&status) => {
                    return Err(AppError::GatewayRejected {
                        status,
                        body: response.body,
                    });
                }
                status if status >= 500 => {
                    last_err = Some(AppError::GatewayUnavailable(format!(
                        "{}: {}",
                        status, response.body
                    )));
                    if attempt < max {
                        tokio::time::sleep(self.retry.backoff_delay(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    break;
                }
                _ => {
                    if response.body.trim().is_empty() {
                        return Ok(Value::Null);
                    }
                    return serde_json::from_str(&response.body).map_err(Into::into);
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| AppError::GatewayUnavailable("request failed after retries".into())))
    }

    /// Paginated purchase listing.
    pub async fn fetch_purchases(
        &self,
        creator_id: &str,
        page: u32,
        per_page: u32,
        filters: &[(String, String)],
    ) -> Result<Value> {
        let mut endpoint = format!("/purchases?page={}&per_page={}", page, per_page);
        for (key, value) in filters {
            endpoint.push_str(&format!("&{}={}", key, value));
        }
        self.request(creator_id, Method::GET, &endpoint, None).await
    }

    /// Execute a refund. `amount_cents` is in minor currency units;
    /// None means a full refund.
    pub async fn create_refund(
        &self,
        creator_id: &str,
        purchase_id: &str,
        amount_cents: Option<i64>,
    ) -> Result<Value> {
        self.request(
            creator_id,
            Method::POST,
            &format!("/purchases/{}/refund", purchase_id),
            Some(json!({ "amount": amount_cents })),
        )
        .await
    }

    /// Revoke a membership after a refund. Best-effort: callers log
    /// failures but never roll back a refund that already succeeded.
    pub async fn revoke_access(&self, creator_id: &str, membership_id: &str) -> Result<Value> {
        self.request(
            creator_id,
            Method::DELETE,
            &format!("/memberships/{}", membership_id),
            None,
        )
        .await
    }

    /// Fetch the creator profile with a token that is not yet stored.
    /// Used during the OAuth callback, before a creator row exists.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<Value> {
        let url = format!("{}/me", self.api_base);
        let response = self
            .transport
            .send(HttpRequest::get(&url).with_bearer(access_token))
            .await
            .map_err(|e| AppError::GatewayUnavailable(e.to_string()))?;

        if !response.is_success() {
            return Err(AppError::GatewayRejected {
                status: response.status,
                body: response.body,
            });
        }
        serde_json::from_str(&response.body).map_err(Into::into)
    }
}
