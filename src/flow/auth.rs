//! Authorization flow controller.
//!
//! Drives a user through NoToken -> AwaitingConsent -> AwaitingCallback ->
//! TokenExchanged against the platform, persisting flow state in the user
//! store between HTTP round-trips. The PKCE verifier is saved before the
//! consent redirect is handed out: losing it strands the flow, because the
//! callback cannot complete the exchange without it.

use std::sync::Arc;

use serde::Deserialize;
use url::form_urlencoded;

use crate::error::{AppError, Result};
use crate::platform::{
    AuthorizeOutcome, AuthorizeRequest, ContractConfig, PlatformClient, Session,
};
use crate::store::UserStore;

pub struct AuthFlow {
    store: Arc<dyn UserStore>,
    platform: Arc<dyn PlatformClient>,
    contract: ContractConfig,
    service_id: Option<u32>,
}

/// Where to send the user after [`AuthFlow::begin_authorization`].
#[derive(Debug)]
pub enum AuthStart {
    /// The supplied token still grants access; data can be read right away.
    Authorized { session: Session },
    /// The user must complete the consent step at this URL.
    Redirect { url: String },
}

/// Query parameters the platform appends to the callback redirect.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub success: Option<String>,
    pub code: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "postboxId")]
    pub postbox_id: Option<String>,
    #[serde(rename = "publicKey")]
    pub public_key: Option<String>,
}

/// Result of a completed callback: the token is already persisted.
#[derive(Debug)]
pub struct CallbackOutcome {
    pub user_id: String,
    pub session_key: Option<String>,
    pub access_token: String,
}

impl AuthFlow {
    pub fn new(
        store: Arc<dyn UserStore>,
        platform: Arc<dyn PlatformClient>,
        contract: ContractConfig,
        service_id: Option<u32>,
    ) -> Self {
        Self {
            store,
            platform,
            contract,
            service_id,
        }
    }

    /// Encode the state value that round-trips through the platform.
    pub fn encode_state(user_id: &str, session_key: Option<&str>) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("userId", user_id);
        if let Some(key) = session_key {
            serializer.append_pair("sessionKey", key);
        }
        serializer.finish()
    }

    fn decode_state(state: &str) -> (Option<String>, Option<String>) {
        let mut user_id = None;
        let mut session_key = None;
        for (key, value) in form_urlencoded::parse(state.as_bytes()) {
            match key.as_ref() {
                "userId" => user_id = Some(value.into_owned()),
                "sessionKey" => session_key = Some(value.into_owned()),
                _ => {}
            }
        }
        (user_id, session_key)
    }

    /// Ask the platform whether consent is needed for this user.
    ///
    /// Passing `existing_access_token` lets the platform honor a previous
    /// consent and skip the redirect; passing `None` forces the consent
    /// step (the write flow does this to have a postbox issued). When
    /// consent is required, the verifier and session key are persisted
    /// against the user before the redirect URL is returned.
    pub async fn begin_authorization(
        &self,
        user_id: &str,
        redirect_uri: &str,
        existing_access_token: Option<&str>,
    ) -> Result<AuthStart> {
        let mut record = self.store.get(user_id).await?.unwrap_or_default();

        let request = AuthorizeRequest {
            contract: self.contract.clone(),
            redirect_uri: redirect_uri.to_string(),
            state: Self::encode_state(user_id, None),
            access_token: existing_access_token.map(str::to_string),
            service_id: self.service_id,
        };

        match self
            .platform
            .get_authorize_url(&request)
            .await
            .map_err(AppError::Platform)?
        {
            AuthorizeOutcome::DataAuthorized {
                updated_access_token,
                session,
            } => {
                // The refreshed token replaces whatever we held before.
                record.access_token = Some(updated_access_token);
                record.session_key = Some(session.key.clone());
                self.store.save(user_id, record).await?;

                tracing::info!("User {} already authorized, reusing consent", user_id);
                Ok(AuthStart::Authorized { session })
            }
            AuthorizeOutcome::ConsentRequired {
                authorization_url,
                code_verifier,
                session,
            } => {
                record.code_verifier = Some(code_verifier);
                record.session_key = Some(session.key.clone());
                self.store.save(user_id, record).await?;

                tracing::info!("User {} sent to consent step", user_id);
                Ok(AuthStart::Redirect {
                    url: authorization_url,
                })
            }
        }
    }

    /// Complete a consent callback: validate the query, redeem the pending
    /// verifier and persist the issued token (clearing the verifier).
    ///
    /// Rejection paths never reach the platform: a missing code, missing
    /// state or a non-affirmative result flag fails before any exchange
    /// call is issued.
    pub async fn handle_callback(
        &self,
        query: &CallbackQuery,
        redirect_uri: &str,
    ) -> Result<CallbackOutcome> {
        if query.success.as_deref() != Some("true") {
            return Err(AppError::InvalidCallback(
                "consent was not granted".to_string(),
            ));
        }
        let code = query
            .code
            .as_deref()
            .ok_or_else(|| AppError::InvalidCallback("missing authorization code".to_string()))?;
        let state = query
            .state
            .as_deref()
            .ok_or_else(|| AppError::InvalidCallback("missing state".to_string()))?;

        let (user_id, state_session_key) = Self::decode_state(state);
        let user_id = user_id.ok_or_else(|| {
            AppError::InvalidCallback("state does not identify a user".to_string())
        })?;

        let mut record = self.store.get(&user_id).await?.unwrap_or_default();
        let code_verifier = record.code_verifier.take().ok_or_else(|| {
            AppError::InvalidCallback(format!("no authorization pending for user {user_id}"))
        })?;

        let access_token = self
            .platform
            .exchange_code_for_token(&self.contract, redirect_uri, code, &code_verifier)
            .await
            .map_err(AppError::TokenExchange)?;

        record.access_token = Some(access_token.clone());
        if let Some(postbox_id) = &query.postbox_id {
            record.postbox_id = Some(postbox_id.clone());
        }
        if let Some(public_key) = &query.public_key {
            record.public_key = Some(public_key.clone());
        }
        let session_key = state_session_key.or_else(|| record.session_key.clone());
        self.store.save(&user_id, record).await?;

        tracing::info!("Token exchanged for user {}", user_id);
        Ok(CallbackOutcome {
            user_id,
            session_key,
            access_token,
        })
    }
}
