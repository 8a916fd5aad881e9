//! File-list proxy and the results page that drains a session.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Html;
use axum::Json;
use serde::Deserialize;

use crate::error::Result;
use crate::flow::FileRetriever;
use crate::models::FileList;
use crate::routes::pages::page;
use crate::routes::request_origin;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FileListParams {
    #[serde(rename = "sessionKey")]
    pub session_key: String,
}

/// Proxy the platform file-list query for the preparing page's poll.
/// Failures answer 404 with an empty body.
pub async fn file_list(
    State(state): State<AppState>,
    Query(params): Query<FileListParams>,
) -> std::result::Result<Json<FileList>, StatusCode> {
    match state.platform.read_file_list(&params.session_key).await {
        Ok(list) => Ok(Json(list)),
        Err(e) => {
            tracing::error!(
                "File list query failed for session {}: {}",
                params.session_key,
                e
            );
            Err(StatusCode::NOT_FOUND)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResultsParams {
    #[serde(rename = "sessionKey")]
    pub session_key: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Drain every file the session produced and render a summary.
///
/// The poll loop runs inside this handler to completion or failure; a
/// client disconnect does not interrupt it.
pub async fn results(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ResultsParams>,
) -> Result<Html<String>> {
    let retriever = FileRetriever::new(state.platform.clone(), state.config.poll_interval());
    let files = retriever.retrieve_all(&params.session_key).await?;

    for file in &files {
        tracing::info!("Retrieved {} ({} bytes)", file.name, file.data.len());
    }

    let origin = request_origin(&state.config, &headers);
    let listing = if files.is_empty() {
        "<p>The session completed without any files.</p>".to_string()
    } else {
        let items: String = files
            .iter()
            .map(|file| format!("<li>{} ({} bytes)</li>\n", file.name, file.data.len()))
            .collect();
        format!("<ul>\n{items}</ul>")
    };

    let body = format!(
        "<p>Thank you for sharing your data! {count} file(s) were retrieved.</p>\n{listing}\n\
         <p><a href=\"{origin}/?userId={user_id}\">Start over</a></p>",
        count = files.len(),
        user_id = params.user_id,
    );

    Ok(Html(page("Data received", &body)))
}
