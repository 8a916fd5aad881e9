//! Postbox push dispatch.
//!
//! One file, one shot: no retry, no chunking. A `failed` delivery status is
//! a result the caller inspects, not an error; only transport and API
//! failures from the platform raise.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::DeliveryStatus;
use crate::platform::{PlatformClient, PushRequest};

pub struct PushDispatcher {
    platform: Arc<dyn PlatformClient>,
}

impl PushDispatcher {
    pub fn new(platform: Arc<dyn PlatformClient>) -> Self {
        Self { platform }
    }

    pub async fn push(&self, request: &PushRequest) -> Result<DeliveryStatus> {
        let status = self
            .platform
            .push_file(request)
            .await
            .map_err(AppError::Platform)?;

        match status {
            DeliveryStatus::Delivered => tracing::info!(
                "Delivered {} ({} bytes) to postbox {}",
                request.file_name,
                request.data.len(),
                request.postbox_id
            ),
            DeliveryStatus::Failed => tracing::warn!(
                "Delivery of {} to postbox {} reported failed",
                request.file_name,
                request.postbox_id
            ),
        }

        Ok(status)
    }
}
