use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use std::any::Any;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod credentials;
pub mod enrollment;
pub mod error;
pub mod guards;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod repository;
pub mod views;

// Routers grouped by access level (public, learner, instructor).
pub mod routes;
use routes::{public, student, teacher};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use credentials::CredentialStore;
pub use memory::InMemoryRepository;
pub use repository::{AccountRepositoryState, CourseRepositoryState, PostgresRepository};

/// ApiDoc
///
/// OpenAPI description of the HTTP surface, served at `/api-docs/openapi.json`
/// and browsable under `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::landing, handlers::login_form, handlers::login, handlers::logout,
        handlers::register_form, handlers::register,
        handlers::student_index, handlers::student_find, handlers::find_courses, handlers::enroll,
        handlers::teacher_index, handlers::create_course_form, handlers::create_course,
    ),
    components(schemas(models::Role, models::LoginForm, models::RegisterForm, models::CreateCourseForm)),
    tags((name = "course-portal", description = "Course enrollment portal"))
)]
pub struct ApiDoc;

/// AppState
///
/// Shared, cheaply clonable container for the stores and configuration. Built
/// once at startup; the only process-wide state besides the connection pool.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountRepositoryState,
    pub courses: CourseRepositoryState,
    pub config: AppConfig,
}

impl AppState {
    /// Wires a single repository object that backs both stores.
    pub fn with_repository<R>(repo: std::sync::Arc<R>, config: AppConfig) -> Self
    where
        R: repository::AccountRepository + repository::CourseRepository + 'static,
    {
        Self {
            accounts: repo.clone(),
            courses: repo,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for AccountRepositoryState {
    fn from_ref(app_state: &AppState) -> AccountRepositoryState {
        app_state.accounts.clone()
    }
}

impl FromRef<AppState> for CourseRepositoryState {
    fn from_ref(app_state: &AppState) -> CourseRepositoryState {
        app_state.courses.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for CredentialStore {
    fn from_ref(app_state: &AppState) -> CredentialStore {
        CredentialStore::new(app_state.accounts.clone(), app_state.config.bcrypt_cost)
    }
}

/// create_router
///
/// Assembles the routing tree and the 404 fallback, then wraps it in the
/// observability layers.
pub fn create_router(state: AppState) -> Router {
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(student::student_routes(state.clone()))
        .merge(teacher::teacher_routes(state.clone()))
        .fallback(handlers::not_found)
        .with_state(state);

    with_observability(base_router)
}

/// with_observability
///
/// Request ids, tracing spans and panic recovery for any router.
pub fn with_observability(router: Router) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            .layer(PropagateRequestIdLayer::new(x_request_id))
            // Innermost, so a panicking handler still gets a traced 500 response.
            .layer(CatchPanicLayer::custom(panic_response)),
    )
}

/// trace_span_logger
///
/// Span for every request, correlated by the `x-request-id` header.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, views::server_error()).into_response()
}
