//! OAuth connect flow: authorize-URL construction, the authorization-code
//! callback, session introspection and logout.

use axum::{
    extract::{Query, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::models::UpsertCreator;
use crate::session::{
    clear_cookie, cookie_from_headers, session_cookie, state_cookie, MaybeCreatorSession,
    SESSION_COOKIE, STATE_COOKIE,
};

const OAUTH_SCOPES: &[&str] = &[
    "purchases.read",
    "purchases.write",
    "members.read",
    "members.write",
    "apps.read",
];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", get(login))
        .route("/api/auth/callback", get(callback))
        .route("/api/auth/logout", get(logout))
        .route("/api/session", get(session_info))
}

/// Build the authorize URL and stash the state nonce in a signed cookie.
async fn login(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let client_id = state
        .config
        .whop_client_id
        .as_deref()
        .ok_or_else(|| AppError::Internal("WHOP_CLIENT_ID is not configured".into()))?;
    let redirect_uri = state
        .config
        .whop_redirect_uri
        .as_deref()
        .ok_or_else(|| AppError::Internal("WHOP_REDIRECT_URI is not configured".into()))?;

    let nonce = Uuid::new_v4().to_string();
    let url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
        state.config.whop_authorize_url,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&OAUTH_SCOPES.join(" ")),
        urlencoding::encode(&nonce),
    );

    let cookie = state_cookie(&state.session.sign(&nonce), !state.config.dev_mode);
    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Json(json!({ "url": url }))))
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Finish the OAuth handshake: verify state, exchange the code, fetch the
/// profile, upsert creator + credentials, and open a session.
async fn callback(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse> {
    if let Some(error) = query.error {
        return Err(AppError::BadRequest(format!("authorization failed: {}", error)));
    }
    let (code, nonce) = match (query.code, query.state) {
        (Some(code), Some(state)) => (code, state),
        _ => return Err(AppError::BadRequest("invalid callback payload".into())),
    };

    let stored_nonce = cookie_from_headers(&headers, STATE_COOKIE)
        .and_then(|cookie| state.session.verify(&cookie));
    if stored_nonce.as_deref() != Some(nonce.as_str()) {
        return Err(AppError::BadRequest(
            "state mismatch - please restart the install".into(),
        ));
    }

    let redirect_uri = state
        .config
        .whop_redirect_uri
        .as_deref()
        .ok_or_else(|| AppError::Internal("WHOP_REDIRECT_URI is not configured".into()))?;

    let tokens = state.orchestrator.gateway().tokens();
    let exchanged = tokens.exchange_code(&code, redirect_uri).await?;

    let profile: Value = state
        .orchestrator
        .gateway()
        .fetch_profile(&exchanged.access_token)
        .await?;

    let whop_id = profile.get("id").and_then(Value::as_str).map(str::to_string);
    let email = profile
        .get("email")
        .and_then(Value::as_str)
        .map(str::to_string);
    let name = profile
        .get("name")
        .and_then(Value::as_str)
        .or_else(|| profile.get("email").and_then(Value::as_str))
        .unwrap_or("Whop Creator")
        .to_string();
    let creator_id = whop_id.clone().unwrap_or_else(queries::gen_id);

    {
        let conn = state.db.get()?;
        queries::upsert_creator(
            &conn,
            &UpsertCreator {
                id: creator_id.clone(),
                whop_id,
                name,
                email,
            },
        )?;
    }
    tokens.store(&creator_id, &exchanged)?;

    tracing::info!("creator {} connected via OAuth", creator_id);

    let secure = !state.config.dev_mode;
    let cookies = AppendHeaders([
        (SET_COOKIE, session_cookie(&state.session.sign(&creator_id), secure)),
        (SET_COOKIE, clear_cookie(STATE_COOKIE)),
    ]);
    Ok((
        cookies,
        Html(
            "<html><body style=\"font-family: sans-serif; text-align: center; padding: 40px;\">\
             <h2>RefundGuard connected to Whop</h2>\
             <p>You can close this window and return to the app.</p>\
             </body></html>"
                .to_string(),
        ),
    ))
}

async fn logout() -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, clear_cookie(SESSION_COOKIE))]),
        Json(json!({ "status": "ok" })),
    )
}

async fn session_info(
    State(state): State<AppState>,
    MaybeCreatorSession(creator_id): MaybeCreatorSession,
) -> Result<Json<Value>> {
    let Some(creator_id) = creator_id else {
        return Ok(Json(json!({ "connected": false })));
    };

    let conn = state.db.get()?;
    let policy = queries::get_policy(&conn, &creator_id)?;
    Ok(Json(json!({
        "connected": true,
        "creator_id": creator_id,
        "policy": policy,
    })))
}
