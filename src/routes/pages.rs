//! Inline page rendering for the demo flows.
//!
//! Templating is deliberately minimal: each page is a small HTML string, as
//! close to static as the flow allows.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Html;
use serde::Deserialize;

use crate::models::generate_user_id;
use crate::routes::request_origin;
use crate::AppState;

pub fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n"
    )
}

pub fn error_page(message: &str) -> String {
    page(
        "Something went wrong",
        &format!("<p>{message}</p>\n<p><a href=\"/\">Start over</a></p>"),
    )
}

#[derive(Debug, Deserialize)]
pub struct HomeParams {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// Landing page. Every visitor gets a fresh user id unless one is given,
/// the way the demo assigns ids on first contact.
pub async fn home(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HomeParams>,
) -> Html<String> {
    let user_id = params.user_id.unwrap_or_else(generate_user_id);
    let origin = request_origin(&state.config, &headers);

    Html(page(
        "Share your data",
        &format!(
            "<p><a href=\"{origin}/fetch?userId={user_id}\">Share data with this application</a></p>\n\
             <p><a href=\"{origin}/send-receipt?userId={user_id}\">Receive a receipt into your vault</a></p>"
        ),
    ))
}

/// Generic error page, linked by flows that bail out client-side.
pub async fn show_error() -> Html<String> {
    Html(error_page("Something went wrong with the consent flow."))
}

#[derive(Debug, Deserialize)]
pub struct PreparingParams {
    #[serde(rename = "sessionKey")]
    pub session_key: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Interstitial shown while the platform prepares files. Polls the file
/// list and forwards to the results page once a terminal state shows up.
pub async fn preparing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<PreparingParams>,
) -> Html<String> {
    let origin = request_origin(&state.config, &headers);
    let file_list_url = format!("{origin}/file-list?sessionKey={}", params.session_key);
    let results_url = format!(
        "{origin}/results?userId={}&sessionKey={}",
        params.user_id, params.session_key
    );
    let error_url = format!("{origin}/error");
    let poll_ms = state.config.poll_interval_ms;

    let body = format!(
        r#"<p>Hang tight, your data is being prepared...</p>
<script>
function checkFileList() {{
    fetch("{file_list_url}", {{ method: "POST" }})
        .then(function (res) {{
            if (!res.ok) {{ throw new Error("status " + res.status); }}
            return res.json();
        }})
        .then(function (data) {{
            if (data.status === "partial" || data.status === "completed") {{
                window.location.href = "{results_url}";
            }}
        }})
        .catch(function () {{
            window.location.href = "{error_url}";
        }});
}}
setInterval(checkFileList, {poll_ms});
</script>"#
    );

    Html(page("Preparing your data", &body))
}
