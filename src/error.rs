use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::platform::PlatformError;
use crate::store::StoreError;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid callback: {0}")]
    InvalidCallback(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(#[source] PlatformError),

    #[error("File retrieval failed: {0}")]
    Retrieval(#[source] PlatformError),

    #[error("Platform call failed: {0}")]
    Platform(#[from] PlatformError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Every failure is scoped to a single request and answers with the generic
/// error page; there is no fatal/process-level class.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidCallback(ref msg) => {
                tracing::warn!("Invalid callback: {}", msg);
                (StatusCode::BAD_REQUEST, "The consent flow did not complete")
            }
            AppError::TokenExchange(ref e) => {
                tracing::error!("Token exchange error: {:?}", e);
                (StatusCode::BAD_GATEWAY, "Could not complete authorization")
            }
            AppError::Retrieval(ref e) => {
                tracing::error!("Retrieval error: {:?}", e);
                (StatusCode::BAD_GATEWAY, "Could not retrieve shared data")
            }
            AppError::Platform(ref e) => {
                tracing::error!("Platform error: {:?}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "The data platform could not be reached",
                )
            }
            AppError::Store(ref e) => {
                tracing::error!("Store error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::Io(ref e) => {
                tracing::error!("I/O error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::InvalidInput(ref msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
        };

        let body = Html(crate::routes::pages::error_page(message));

        (status, body).into_response()
    }
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;
