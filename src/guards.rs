//! Role guards.
//!
//! Route-layer middleware that resolves the [`Principal`] once, rejects
//! principals of the wrong role with the 403 page, and stores the principal in
//! the request extensions for the handler.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{AppState, auth::Principal, error::AppError, models::Role};

/// Restricts a router to learner accounts.
pub async fn require_learner(State(state): State<AppState>, request: Request, next: Next) -> Response {
    require_role(&state, request, next, Role::Learner).await
}

/// Restricts a router to instructor accounts.
pub async fn require_instructor(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    require_role(&state, request, next, Role::Instructor).await
}

async fn require_role(state: &AppState, request: Request, next: Next, required: Role) -> Response {
    let (mut parts, body) = request.into_parts();

    let principal = match Principal::from_request_parts(&mut parts, state).await {
        Ok(principal) => principal,
        Err(rejection) => return rejection,
    };

    if principal.role() != required {
        tracing::warn!(
            account_id = %principal.id(),
            role = %principal.role(),
            required = %required,
            path = %parts.uri.path(),
            "role guard rejected request"
        );
        return AppError::Forbidden.into_response();
    }

    parts.extensions.insert(principal);
    next.run(Request::from_parts(parts, body)).await
}
