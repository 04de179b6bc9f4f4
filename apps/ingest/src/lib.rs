#![forbid(unsafe_code)]

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod receiver;
pub mod store;
pub mod transport;
mod web;


use crate::config::Config;
use crate::store::Message;
use crate::transport::MessageSender;

pub const SERVICE_NAME: &str = "formrelay-ingest-service";

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    sender: Arc<MessageSender>,
}

/// Builds the HTTP front end: two HTML pages, the two fixed static assets,
/// and the form endpoint that relays submissions onto the ingest link.
pub fn build_router(config: Config, sender: MessageSender) -> Router {
    let state = AppState {
        config: Arc::new(config),
        sender: Arc::new(sender),
    };

    Router::new()
        .route("/", get(index_page))
        .route("/message", get(message_page).post(submit_message))
        .route("/style.css", get(style_asset))
        .route("/logo.png", get(logo_asset))
        .fallback(not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http()),
        )
}

async fn index_page() -> Response {
    html_response(web::render_index())
}

async fn message_page() -> Response {
    html_response(web::render_message_form())
}

/// Accepts a urlencoded form body, relays it as a single datagram, and
/// redirects home. The redirect does not depend on the relay outcome: the
/// submission acknowledgment is deliberately decoupled from persistence.
async fn submit_message(State(state): State<AppState>, body: Bytes) -> Response {
    let message = decode_form_body(&body);
    if let Err(error) = state.sender.send(&message).await {
        tracing::warn!(
            target: "formrelay.http",
            error = %error,
            "failed to relay submission to ingest endpoint",
        );
    }
    (StatusCode::FOUND, [(LOCATION, HeaderValue::from_static("/"))]).into_response()
}

fn decode_form_body(body: &[u8]) -> Message {
    let mut message = Message::new();
    for (field, value) in url::form_urlencoded::parse(body) {
        message.push_value(field.into_owned(), value.into_owned());
    }
    message
}

async fn style_asset(State(state): State<AppState>) -> Response {
    serve_fixed_asset(&state, "style.css").await
}

async fn logo_asset(State(state): State<AppState>) -> Response {
    serve_fixed_asset(&state, "logo.png").await
}

async fn serve_fixed_asset(state: &AppState, file_name: &str) -> Response {
    let file_path = state.config.static_dir.join(file_name);
    match build_static_response(&file_path).await {
        Ok(response) => response,
        Err(StaticResponseError::NotFound(message)) => {
            tracing::debug!(target: "formrelay.http", "{message}");
            not_found().await.into_response()
        }
        Err(error) => {
            tracing::error!(
                target: "formrelay.http",
                error = %error,
                "failed to serve static asset",
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

async fn build_static_response(file_path: &FsPath) -> Result<Response, StaticResponseError> {
    let bytes = tokio::fs::read(file_path).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            StaticResponseError::NotFound(format!(
                "Static file '{}' was not found.",
                file_path.display()
            ))
        } else {
            StaticResponseError::Io(source)
        }
    })?;

    let content_type = mime_guess::from_path(file_path).first_or_octet_stream();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_str(content_type.as_ref())
            .map_err(|_| StaticResponseError::InvalidHeader(content_type.to_string()))?,
    );
    Ok(response)
}

#[derive(Debug, thiserror::Error)]
enum StaticResponseError {
    #[error("{0}")]
    NotFound(String),
    #[error("static file read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid header value '{0}'")]
    InvalidHeader(String),
}

fn html_response(html: String) -> Response {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
        .into_response()
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "File Not Found")
}
