//! Read flow: consent, callback, then data retrieval.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Redirect;
use serde::Deserialize;

use crate::constants::ERR_MISSING_USER_ID;
use crate::error::{AppError, Result};
use crate::flow::auth::{AuthStart, CallbackQuery};
use crate::routes::request_origin;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FetchParams {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// Read-flow entry point.
///
/// A stored access token is tried first: if the platform still honors it, a
/// token-authenticated session is opened and consent is skipped entirely.
/// Any failure on that path falls back to a fresh authorization.
pub async fn begin_fetch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<FetchParams>,
) -> Result<Redirect> {
    let user_id = params
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidInput(ERR_MISSING_USER_ID.to_string()))?;
    let origin = request_origin(&state.config, &headers);

    let record = state.store.get(&user_id).await?.unwrap_or_default();
    if let Some(token) = record.access_token.as_deref() {
        match state
            .platform
            .read_session(&state.config.contract(), token)
            .await
        {
            Ok(session) => {
                return Ok(Redirect::to(&format!(
                    "{origin}/preparing?sessionKey={}&userId={}",
                    session.key, user_id
                )));
            }
            Err(e) => {
                tracing::error!(
                    "Stored token for user {} rejected, reauthorizing: {}",
                    user_id,
                    e
                );
            }
        }
    }

    let flow = state.auth_flow();
    let start = flow
        .begin_authorization(
            &user_id,
            &format!("{origin}/return"),
            record.access_token.as_deref(),
        )
        .await?;

    match start {
        AuthStart::Authorized { session } => Ok(Redirect::to(&format!(
            "{origin}/preparing?sessionKey={}&userId={}",
            session.key, user_id
        ))),
        AuthStart::Redirect { url } => Ok(Redirect::to(&url)),
    }
}

/// Consent callback for the read flow: exchange the code, then move on to
/// the preparing page with a usable session.
pub async fn return_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect> {
    let origin = request_origin(&state.config, &headers);

    let flow = state.auth_flow();
    let outcome = flow
        .handle_callback(&query, &format!("{origin}/return"))
        .await?;

    // The session stored at authorization time is reused; if none survived,
    // open a fresh one with the token we just obtained.
    let session_key = match outcome.session_key {
        Some(key) => key,
        None => {
            state
                .platform
                .read_session(&state.config.contract(), &outcome.access_token)
                .await
                .map_err(AppError::Platform)?
                .key
        }
    };

    Ok(Redirect::to(&format!(
        "{origin}/preparing?sessionKey={}&userId={}",
        session_key, outcome.user_id
    )))
}
