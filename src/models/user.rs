use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-user attribute bag persisted in the user store.
///
/// Every field is optional and filled in incrementally as a user moves
/// through the consent flow. Saving a record replaces the stored object for
/// that user in full, so callers read-modify-write the whole record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserRecord {
    /// Opaque credential issued by the platform after token exchange.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// PKCE verifier pending redemption. Transient: set when a consent
    /// redirect is issued, cleared by the token exchange that consumes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,
    /// Handle of the retrieval session opened at authorization time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    /// Postbox destination handle, persisted once a write flow completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postbox_id: Option<String>,
    /// Postbox encryption key delivered alongside the postbox id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Attributes this server does not interpret. Kept so a read-modify-write
    /// cycle does not drop fields written by other tooling.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl UserRecord {
    /// Whether a token exchange has completed for this user.
    pub fn is_authorized(&self) -> bool {
        self.access_token.is_some()
    }
}

/// Generate a short opaque id for a first-time visitor.
pub fn generate_user_id() -> String {
    hex::encode(&uuid::Uuid::new_v4().as_bytes()[..8])
}
