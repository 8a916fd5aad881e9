//! Client surface for the external consent/data platform.
//!
//! The platform is a black box: session establishment, consent
//! authorization, token exchange and file transfer are remote calls whose
//! internals (request signing, payload encryption) belong to the platform
//! side. Flows depend on the [`PlatformClient`] trait so tests can script
//! the collaborator.

pub mod http;

pub use http::HttpPlatformClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{DeliveryStatus, FileList, PushDescriptor, RetrievedFile};

/// Errors raised by platform calls.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Platform API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected platform response: {0}")]
    InvalidResponse(String),
}

/// Handle of a data-retrieval session with the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
}

/// Contract identity presented on every platform call.
#[derive(Debug, Clone)]
pub struct ContractConfig {
    pub application_id: String,
    pub contract_id: String,
}

/// Parameters for building a consent redirect.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub contract: ContractConfig,
    pub redirect_uri: String,
    /// Opaque value echoed back on the callback; carries the user id.
    pub state: String,
    /// Token from a previous consent, if any. The platform may honor it and
    /// skip the consent step entirely.
    pub access_token: Option<String>,
    /// Service to onboard during consent, when the contract scopes one.
    pub service_id: Option<u32>,
}

/// Result of an authorize call: either the stored token still grants access,
/// or the user must be sent through the consent step.
#[derive(Debug, Clone)]
pub enum AuthorizeOutcome {
    DataAuthorized {
        updated_access_token: String,
        session: Session,
    },
    ConsentRequired {
        authorization_url: String,
        code_verifier: String,
        session: Session,
    },
}

/// Everything needed to deliver one file to a postbox.
#[derive(Debug, Clone)]
pub struct PushRequest {
    pub contract: ContractConfig,
    pub access_token: String,
    pub session_key: String,
    pub postbox_id: String,
    pub public_key: String,
    pub file_name: String,
    pub descriptor: PushDescriptor,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Establish a fresh retrieval session for the contract.
    async fn establish_session(&self, contract: &ContractConfig)
        -> Result<Session, PlatformError>;

    /// Establish a session authenticated by a stored access token.
    async fn read_session(
        &self,
        contract: &ContractConfig,
        access_token: &str,
    ) -> Result<Session, PlatformError>;

    /// Build the consent redirect. When consent is needed the outcome carries
    /// the PKCE verifier that must be redeemed at token exchange.
    async fn get_authorize_url(
        &self,
        request: &AuthorizeRequest,
    ) -> Result<AuthorizeOutcome, PlatformError>;

    /// Exchange an authorization code plus its PKCE verifier for an access
    /// token.
    async fn exchange_code_for_token(
        &self,
        contract: &ContractConfig,
        redirect_uri: &str,
        code: &str,
        code_verifier: &str,
    ) -> Result<String, PlatformError>;

    /// Query the file list for a session.
    async fn read_file_list(&self, session_key: &str) -> Result<FileList, PlatformError>;

    /// Fetch one file's content.
    async fn read_file(
        &self,
        session_key: &str,
        file_name: &str,
    ) -> Result<RetrievedFile, PlatformError>;

    /// Deliver one file to a postbox.
    async fn push_file(&self, request: &PushRequest) -> Result<DeliveryStatus, PlatformError>;
}
