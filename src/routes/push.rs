//! Write flow: consent with postbox creation, then receipt delivery.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, Redirect};
use chrono::Utc;
use serde::Deserialize;

use crate::constants::{ERR_MISSING_USER_ID, ERR_NO_POSTBOX, ERR_UNKNOWN_USER};
use crate::error::{AppError, Result};
use crate::flow::auth::{AuthStart, CallbackQuery};
use crate::flow::PushDispatcher;
use crate::models::{DeliveryStatus, PushDescriptor};
use crate::platform::PushRequest;
use crate::routes::pages::{error_page, page};
use crate::routes::request_origin;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UserParams {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// Write-flow entry point.
///
/// When a token and postbox are already on file the consent step is skipped
/// and the user goes straight to the push. Otherwise consent is forced
/// (no stored token is offered) so the platform issues fresh postbox
/// coordinates with the callback.
pub async fn send_receipt(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<UserParams>,
) -> Result<Redirect> {
    let user_id = params
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidInput(ERR_MISSING_USER_ID.to_string()))?;
    let origin = request_origin(&state.config, &headers);

    let record = state.store.get(&user_id).await?.unwrap_or_default();
    if record.is_authorized() && record.postbox_id.is_some() && record.public_key.is_some() {
        return Ok(Redirect::to(&format!("{origin}/push?userId={user_id}")));
    }

    let flow = state.auth_flow();
    let start = flow
        .begin_authorization(&user_id, &format!("{origin}/exchange-token"), None)
        .await?;

    match start {
        AuthStart::Redirect { url } => Ok(Redirect::to(&url)),
        // Authorized without postbox coordinates: nothing to deliver into.
        AuthStart::Authorized { .. } => {
            Err(AppError::InvalidInput(ERR_NO_POSTBOX.to_string()))
        }
    }
}

/// Consent callback for the write flow. The redirect must carry postbox
/// coordinates on top of the usual code/state pair, or there is nothing to
/// push into.
pub async fn exchange_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect> {
    if query.postbox_id.is_none() || query.public_key.is_none() {
        return Err(AppError::InvalidCallback(
            "callback carried no postbox details".to_string(),
        ));
    }

    let origin = request_origin(&state.config, &headers);
    let flow = state.auth_flow();
    let outcome = flow
        .handle_callback(&query, &format!("{origin}/exchange-token"))
        .await?;

    Ok(Redirect::to(&format!(
        "{origin}/push?userId={}",
        outcome.user_id
    )))
}

/// Deliver the configured receipt file to the user's postbox.
pub async fn push_receipt(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<UserParams>,
) -> Result<Html<String>> {
    let user_id = params
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidInput(ERR_MISSING_USER_ID.to_string()))?;

    let record = state
        .store
        .get(&user_id)
        .await?
        .ok_or_else(|| AppError::InvalidInput(ERR_UNKNOWN_USER.to_string()))?;

    let (Some(access_token), Some(postbox_id), Some(public_key)) = (
        record.access_token,
        record.postbox_id,
        record.public_key,
    ) else {
        return Err(AppError::InvalidInput(ERR_NO_POSTBOX.to_string()));
    };

    // Postbox writes ride on a live session of their own.
    let session = state
        .platform
        .establish_session(&state.config.contract())
        .await
        .map_err(AppError::Platform)?;

    let data = tokio::fs::read(&state.config.push_file_path).await?;
    let reference = format!("Receipt {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));

    let request = PushRequest {
        contract: state.config.contract(),
        access_token,
        session_key: session.key,
        postbox_id,
        public_key,
        file_name: reference.clone(),
        descriptor: PushDescriptor {
            mime_type: "application/json".to_string(),
            tags: vec!["receipt".to_string()],
            reference: vec![reference.clone()],
        },
        data,
    };

    let dispatcher = PushDispatcher::new(state.platform.clone());
    let origin = request_origin(&state.config, &headers);

    match dispatcher.push(&request).await? {
        DeliveryStatus::Delivered => Ok(Html(page(
            "Receipt delivered",
            &format!(
                "<p>{reference} was delivered to your vault.</p>\n\
                 <p><a href=\"{origin}/push?userId={user_id}\">Push another</a></p>"
            ),
        ))),
        DeliveryStatus::Failed => Ok(Html(error_page("The receipt could not be delivered."))),
    }
}
