use crate::{AppState, guards, handlers};
use axum::{Router, middleware, routing::get};

/// Instructor Router Module
///
/// Every route here sits behind `guards::require_instructor`.
pub fn teacher_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/teacher/index", get(handlers::teacher_index))
        .route(
            "/teacher/create",
            get(handlers::create_course_form).post(handlers::create_course),
        )
        .route_layer(middleware::from_fn_with_state(state, guards::require_instructor))
}
