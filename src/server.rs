//! HTTP entry surface
//!
//! `GET /?chatQuery=...` and `POST /?chatQuery=...` both run one agent-loop
//! invocation and answer with an HTML page. `GET /health` answers `ok`.
//!
//! The credential comes from an `Authorization: Bearer` header when present,
//! otherwise from the server configuration.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Config;
use crate::entry::{Entry, QueryRequest};
use crate::error::{classify, Result, ToolloopError};

/// Query string of the chat endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ChatParams {
    /// The user's query
    #[serde(rename = "chatQuery")]
    pub chat_query: Option<String>,
}

/// Build the router over a shared entry
pub fn router(entry: Entry) -> Router {
    Router::new()
        .route("/", get(chat_handler).post(chat_handler))
        .route("/health", get(health_handler))
        .with_state(Arc::new(entry))
}

/// Bind the configured address and serve until the process exits
///
/// # Errors
///
/// Returns error if the address is invalid, cannot be bound, or the server fails
pub async fn serve(config: Config) -> Result<()> {
    let addr: SocketAddr = config.server.addr.parse().map_err(|e| {
        ToolloopError::Config(format!("Invalid server address '{}': {}", config.server.addr, e))
    })?;

    let entry = Entry::new(config)?;
    let app = router(entry);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server ready to accept connections");

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

async fn health_handler() -> &'static str {
    "ok"
}

// GET and POST behave identically; tools may have side effects, so neither
// is safe to retry blindly.
async fn chat_handler(
    State(entry): State<Arc<Entry>>,
    headers: HeaderMap,
    Query(params): Query<ChatParams>,
) -> Response {
    let query = params.chat_query.unwrap_or_default();
    if query.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Missing chatQuery parameter");
    }

    let mut request = QueryRequest::new(query);
    if let Some(token) = bearer_token(&headers) {
        request = request.with_credential(token);
    }

    info!(
        header_credential = request.credential.is_some(),
        "Received chat query"
    );

    match entry.handle(request).await {
        Ok(outcome) => {
            info!(
                rounds = outcome.rounds,
                exhausted = outcome.result.is_exhausted(),
                "Chat query completed"
            );
            (StatusCode::OK, Html(render_answer(outcome.result.text()))).into_response()
        }
        Err(e) => {
            let status = status_for(&e);
            error!(status = status.as_u16(), "Chat query failed: {:#}", e);
            error_response(status, &e.to_string())
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// HTTP status for a failed invocation
pub fn status_for(error: &anyhow::Error) -> StatusCode {
    match classify(error) {
        Some(ToolloopError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
        Some(ToolloopError::MissingCredentials(_)) | Some(ToolloopError::Authentication(_)) => {
            StatusCode::UNAUTHORIZED
        }
        Some(ToolloopError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        Some(ToolloopError::Provider(_))
        | Some(ToolloopError::Http(_))
        | Some(ToolloopError::UnsupportedFinishReason(_))
        | Some(ToolloopError::UnknownTool(_))
        | Some(ToolloopError::ToolExecution { .. }) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Html(render_error(status, message))).into_response()
}

/// Render the answer page
pub fn render_answer(answer: &str) -> String {
    render_page("Answer", &format!("<p>{}</p>", escape_html(answer)))
}

/// Render an error page
pub fn render_error(status: StatusCode, message: &str) -> String {
    let title = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    render_page(
        &title,
        &format!(
            "<h1>{}</h1>\n<p>{}</p>",
            escape_html(&title),
            escape_html(message)
        ),
    )
}

fn render_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(title),
        body
    )
}

/// Escape text for inclusion in HTML element content or attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '\n' => escaped.push_str("<br>\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}
