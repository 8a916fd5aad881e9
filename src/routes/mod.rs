pub mod files;
pub mod health;
pub mod pages;
pub mod push;
pub mod share;

pub use files::{file_list, results};
pub use health::health_check;
pub use pages::{home, preparing, show_error};
pub use push::{exchange_token, push_receipt, send_receipt};
pub use share::{begin_fetch, return_callback};

use axum::http::{header, HeaderMap};

use crate::config::Config;

/// Origin for absolute redirect/callback URLs: the configured public base
/// URL when set, otherwise the request's Host header.
pub fn request_origin(config: &Config, headers: &HeaderMap) -> String {
    if let Some(base) = &config.public_base_url {
        return base.trim_end_matches('/').to_string();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}
