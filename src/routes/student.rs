use crate::{AppState, guards, handlers};
use axum::{Router, middleware, routing::get};

/// Learner Router Module
///
/// Every route here sits behind `guards::require_learner`: anonymous visitors
/// are redirected to `/login`, instructors get the 403 page.
pub fn student_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/student/index", get(handlers::student_index))
        .route("/student/find", get(handlers::student_find))
        // GET /courses/find?key=...
        // Static segment wins over the `{id}` capture below.
        .route("/courses/find", get(handlers::find_courses))
        // GET /courses/{id}
        // Enrolls the learner. Kept as GET to match the links on the search page.
        .route("/courses/{id}", get(handlers::enroll))
        .route_layer(middleware::from_fn_with_state(state, guards::require_learner))
}
