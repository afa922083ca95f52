// In crates/web-server/src/error.rs

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to bind server address: {0}")]
    ServerBindError(#[source] std::io::Error),
    #[error("Server stopped unexpectedly: {0}")]
    ServeError(#[source] std::io::Error),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Engine(#[from] engine::Error),
}

impl From<core_types::Error> for Error {
    fn from(e: core_types::Error) -> Self {
        Error::BadRequest(e.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Engine(engine::Error::UnknownInstrument(_)) => StatusCode::BAD_REQUEST,
            Error::Engine(_) | Error::ServerBindError(_) | Error::ServeError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed.");
        }

        let body = axum::Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
