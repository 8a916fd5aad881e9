//! reqwest implementation of [`PlatformClient`].
//!
//! Wire shapes mirror the platform's JSON API: camelCase fields, file bytes
//! base64-encoded inside JSON envelopes, bearer tokens on authenticated
//! calls. The PKCE verifier is generated here and only its S256 challenge
//! leaves the process.

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{
    AuthorizeOutcome, AuthorizeRequest, ContractConfig, PlatformClient, PlatformError, PushRequest,
    Session,
};
use crate::models::{
    DeliveryStatus, FileDescriptor, FileList, PushDescriptor, RetrievedFile, SessionFileStatus,
};

pub struct HttpPlatformClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPlatformClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionBody<'a> {
    application_id: &'a str,
    contract_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionPayload {
    session_key: String,
    #[serde(default)]
    expiry: Option<i64>,
}

impl From<SessionPayload> for Session {
    fn from(payload: SessionPayload) -> Self {
        Session {
            key: payload.session_key,
            expiry: payload.expiry,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeBody<'a> {
    application_id: &'a str,
    contract_id: &'a str,
    redirect_uri: &'a str,
    state: &'a str,
    code_challenge: &'a str,
    code_challenge_method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service_id: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizePayload {
    data_authorized: bool,
    #[serde(default)]
    updated_access_token: Option<String>,
    #[serde(default)]
    authorization_url: Option<String>,
    session: SessionPayload,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenExchangeBody<'a> {
    application_id: &'a str,
    contract_id: &'a str,
    redirect_uri: &'a str,
    authorization_code: &'a str,
    code_verifier: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenExchangePayload {
    access_token: String,
}

#[derive(Deserialize)]
struct FileListStatusPayload {
    state: SessionFileStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListPayload {
    status: FileListStatusPayload,
    #[serde(default)]
    file_list: Vec<FileDescriptor>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilePayload {
    #[serde(default)]
    mime_type: Option<String>,
    file_data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PushBody<'a> {
    session_key: &'a str,
    public_key: &'a str,
    file_name: &'a str,
    file_descriptor: &'a PushDescriptor,
    file_data: String,
}

#[derive(Deserialize)]
struct PushPayload {
    status: DeliveryStatus,
}

// ---------------------------------------------------------------------------
// PKCE helpers
// ---------------------------------------------------------------------------

fn generate_code_verifier() -> String {
    let mut buf = [0u8; 32];
    for chunk in buf.chunks_mut(16) {
        let id = uuid::Uuid::new_v4();
        let len = chunk.len().min(16);
        chunk[..len].copy_from_slice(&id.as_bytes()[..len]);
    }
    URL_SAFE_NO_PAD.encode(buf)
}

fn compute_code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, PlatformError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(PlatformError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn establish_session(
        &self,
        contract: &ContractConfig,
    ) -> Result<Session, PlatformError> {
        let resp = self
            .client
            .post(self.url("/session"))
            .json(&SessionBody {
                application_id: &contract.application_id,
                contract_id: &contract.contract_id,
                access_token: None,
            })
            .send()
            .await?;
        let payload: SessionPayload = check(resp).await?.json().await?;
        Ok(payload.into())
    }

    async fn read_session(
        &self,
        contract: &ContractConfig,
        access_token: &str,
    ) -> Result<Session, PlatformError> {
        let resp = self
            .client
            .post(self.url("/session"))
            .json(&SessionBody {
                application_id: &contract.application_id,
                contract_id: &contract.contract_id,
                access_token: Some(access_token),
            })
            .send()
            .await?;
        let payload: SessionPayload = check(resp).await?.json().await?;
        Ok(payload.into())
    }

    async fn get_authorize_url(
        &self,
        request: &AuthorizeRequest,
    ) -> Result<AuthorizeOutcome, PlatformError> {
        let code_verifier = generate_code_verifier();
        let code_challenge = compute_code_challenge(&code_verifier);

        let resp = self
            .client
            .post(self.url("/authorize"))
            .json(&AuthorizeBody {
                application_id: &request.contract.application_id,
                contract_id: &request.contract.contract_id,
                redirect_uri: &request.redirect_uri,
                state: &request.state,
                code_challenge: &code_challenge,
                code_challenge_method: "S256",
                access_token: request.access_token.as_deref(),
                service_id: request.service_id,
            })
            .send()
            .await?;
        let payload: AuthorizePayload = check(resp).await?.json().await?;

        if payload.data_authorized {
            let updated_access_token = payload.updated_access_token.ok_or_else(|| {
                PlatformError::InvalidResponse(
                    "authorized response carried no access token".to_string(),
                )
            })?;
            Ok(AuthorizeOutcome::DataAuthorized {
                updated_access_token,
                session: payload.session.into(),
            })
        } else {
            let authorization_url = payload.authorization_url.ok_or_else(|| {
                PlatformError::InvalidResponse(
                    "consent response carried no authorization URL".to_string(),
                )
            })?;
            Ok(AuthorizeOutcome::ConsentRequired {
                authorization_url,
                code_verifier,
                session: payload.session.into(),
            })
        }
    }

    async fn exchange_code_for_token(
        &self,
        contract: &ContractConfig,
        redirect_uri: &str,
        code: &str,
        code_verifier: &str,
    ) -> Result<String, PlatformError> {
        let resp = self
            .client
            .post(self.url("/oauth/token"))
            .json(&TokenExchangeBody {
                application_id: &contract.application_id,
                contract_id: &contract.contract_id,
                redirect_uri,
                authorization_code: code,
                code_verifier,
            })
            .send()
            .await?;
        let payload: TokenExchangePayload = check(resp).await?.json().await?;
        Ok(payload.access_token)
    }

    async fn read_file_list(&self, session_key: &str) -> Result<FileList, PlatformError> {
        let resp = self
            .client
            .get(self.url(&format!("/sessions/{session_key}/files")))
            .send()
            .await?;
        let payload: FileListPayload = check(resp).await?.json().await?;
        Ok(FileList {
            status: payload.status.state,
            files: payload.file_list,
        })
    }

    async fn read_file(
        &self,
        session_key: &str,
        file_name: &str,
    ) -> Result<RetrievedFile, PlatformError> {
        let resp = self
            .client
            .get(self.url(&format!("/sessions/{session_key}/files/{file_name}")))
            .send()
            .await?;
        let payload: FilePayload = check(resp).await?.json().await?;
        let data = STANDARD.decode(&payload.file_data).map_err(|e| {
            PlatformError::InvalidResponse(format!("file data is not valid base64: {e}"))
        })?;
        Ok(RetrievedFile {
            name: file_name.to_string(),
            mime_type: payload.mime_type,
            data,
        })
    }

    async fn push_file(&self, request: &PushRequest) -> Result<DeliveryStatus, PlatformError> {
        let resp = self
            .client
            .post(self.url(&format!("/postbox/{}", request.postbox_id)))
            .bearer_auth(&request.access_token)
            .json(&PushBody {
                session_key: &request.session_key,
                public_key: &request.public_key,
                file_name: &request.file_name,
                file_descriptor: &request.descriptor,
                file_data: STANDARD.encode(&request.data),
            })
            .send()
            .await?;
        let payload: PushPayload = check(resp).await?.json().await?;
        Ok(payload.status)
    }
}
