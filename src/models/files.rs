use serde::{Deserialize, Serialize};

/// State reported by the platform's file-list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionFileStatus {
    Pending,
    Running,
    Partial,
    Completed,
}

impl SessionFileStatus {
    /// Terminal states: the platform will not list further files for the
    /// session once one of these is reported.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionFileStatus::Partial | SessionFileStatus::Completed)
    }
}

/// Snapshot of a session's file list.
///
/// The sequence only ever grows across polls for the same session: new
/// entries are appended, never reordered or removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileList {
    pub status: SessionFileStatus,
    #[serde(default)]
    pub files: Vec<FileDescriptor>,
}

/// One entry of a session file list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A file fetched from the platform, decoded from its wire envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub data: Vec<u8>,
}

/// Descriptor attached to a pushed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushDescriptor {
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference: Vec<String>,
}

/// Outcome of a postbox delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
    Failed,
}
