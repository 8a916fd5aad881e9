//! Session file retrieval.
//!
//! Polls the platform file list until it reports a terminal state, fetching
//! newly listed files within the tick they appear. Single task, no
//! concurrency between ticks; the only suspension point is the sleep
//! between polls.

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;

use crate::error::{AppError, Result};
use crate::models::RetrievedFile;
use crate::platform::PlatformClient;

pub struct FileRetriever {
    platform: Arc<dyn PlatformClient>,
    poll_interval: Duration,
}

impl FileRetriever {
    pub fn new(platform: Arc<dyn PlatformClient>, poll_interval: Duration) -> Self {
        Self {
            platform,
            poll_interval,
        }
    }

    /// Drain the files a session produces, up to the first terminal tick.
    ///
    /// Each tick queries the list once and fetches every file past the
    /// offset cursor concurrently before the next poll. The list is only
    /// consulted at the top of a tick: entries the platform appends after
    /// the terminal status first appears are not observed.
    ///
    /// The first failed list or fetch call aborts the whole retrieval; no
    /// retries, no partial-failure classification.
    pub async fn retrieve_all(&self, session_key: &str) -> Result<Vec<RetrievedFile>> {
        let mut retrieved = Vec::new();
        let mut offset = 0usize;

        loop {
            let list = self
                .platform
                .read_file_list(session_key)
                .await
                .map_err(AppError::Retrieval)?;

            let new_files = list.files.get(offset..).unwrap_or(&[]);
            if !new_files.is_empty() {
                let fetched = try_join_all(
                    new_files
                        .iter()
                        .map(|file| self.platform.read_file(session_key, &file.name)),
                )
                .await
                .map_err(AppError::Retrieval)?;

                tracing::debug!(
                    "Fetched {} new file(s) for session {}",
                    fetched.len(),
                    session_key
                );
                retrieved.extend(fetched);
            }
            offset = list.files.len();

            if list.status.is_terminal() {
                tracing::info!(
                    "Session {} reached {:?}, {} file(s) retrieved",
                    session_key,
                    list.status,
                    retrieved.len()
                );
                return Ok(retrieved);
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
