use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{credentials::CredentialError, repository::RepoError, views};

/// AppError
///
/// Terminal failures of a request. Validation problems never reach this type;
/// handlers turn those into a flash message and a redirect back to the form.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Repository(#[from] RepoError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("session encoding failed: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Forbidden => (StatusCode::FORBIDDEN, views::forbidden()).into_response(),
            AppError::NotFound => (StatusCode::NOT_FOUND, views::not_found()).into_response(),
            err => {
                tracing::error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, views::server_error()).into_response()
            }
        }
    }
}
