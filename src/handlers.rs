use crate::{
    AppState,
    auth::{Principal, Session},
    credentials::{CredentialError, CredentialStore},
    enrollment,
    error::AppError,
    models::{Account, Course, CreateCourseForm, FindQuery, LoginForm, RegisterForm},
    repository::{CourseRepositoryState, RepoError},
    views,
};
use axum::{
    Form,
    extract::{Path, Query, State, rejection::FormRejection},
    response::{Html, Redirect},
};
use uuid::Uuid;
use validator::Validate;

const MSG_PASSWORD_MISMATCH: &str = "Passwords don't match. Please check.";
const MSG_DUPLICATE_HANDLE: &str = "Email has been registered. Please check.";
const MSG_REGISTERED: &str = "Account has been created. You can login now.";
const MSG_REGISTER_FAILED: &str = "Registration failed. Please try again later.";
const MSG_BAD_LOGIN: &str = "Password or username is incorrect.";
const MSG_CREATE_FAILED: &str = "Error with creating new course. Please contact with admin.";

// --- Public Handlers ---

/// landing
///
/// [Public Route] Landing page.
#[utoipa::path(get, path = "/", responses((status = 200, description = "Landing page")))]
pub async fn landing(mut session: Session) -> (Session, Html<String>) {
    let flashes = session.take_flashes();
    (session, views::landing(&flashes))
}

/// login_form
///
/// [Public Route] Renders the login form along with any pending flashes.
#[utoipa::path(get, path = "/login", responses((status = 200, description = "Login form")))]
pub async fn login_form(mut session: Session) -> (Session, Html<String>) {
    let flashes = session.take_flashes();
    (session, views::login(&flashes))
}

/// login
///
/// [Public Route] Authenticates a login handle and password. On success the
/// session is bound to the account and the user is sent to the remembered
/// return-to path (consumed here) or to their role's index page.
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to the remembered path, role index, or back to /login"))
)]
pub async fn login(
    State(credentials): State<CredentialStore>,
    mut session: Session,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<(Session, Redirect), AppError> {
    let Ok(Form(form)) = form else {
        session.flash_error(MSG_BAD_LOGIN);
        return Ok((session, Redirect::to("/login")));
    };
    let username = form.username.trim();

    match credentials.authenticate(username, &form.password).await {
        Ok(account) => {
            session.login(account.id);
            let target = session
                .take_return_to()
                .unwrap_or_else(|| account.role.index_path().to_string());
            tracing::info!(account_id = %account.id, %target, "login succeeded");
            Ok((session, Redirect::to(&target)))
        }
        Err(CredentialError::InvalidCredentials) => {
            tracing::info!(%username, "login rejected");
            session.flash_error(MSG_BAD_LOGIN);
            Ok((session, Redirect::to("/login")))
        }
        Err(e) => Err(e.into()),
    }
}

/// logout
///
/// [Public Route] Unbinds the principal from the session.
#[utoipa::path(get, path = "/logout", responses((status = 303, description = "Redirect home")))]
pub async fn logout(mut session: Session) -> (Session, Redirect) {
    if let Some(account_id) = session.account_id() {
        tracing::info!(%account_id, "logged out");
    }
    session.logout();
    (session, Redirect::to("/"))
}

/// register_form
///
/// [Public Route] Renders the registration form.
#[utoipa::path(get, path = "/register", responses((status = 200, description = "Registration form")))]
pub async fn register_form(mut session: Session) -> (Session, Html<String>) {
    let flashes = session.take_flashes();
    (session, views::register(&flashes))
}

/// register
///
/// [Public Route] Creates an account.
///
/// The password confirmation is checked before any store access. Duplicate
/// handles and store failures both send the user back to the form with a flash.
#[utoipa::path(
    post,
    path = "/register",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to /login on success, back to /register otherwise"))
)]
pub async fn register(
    State(credentials): State<CredentialStore>,
    mut session: Session,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> (Session, Redirect) {
    let Form(mut form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            tracing::info!(error = %rejection, "malformed registration form");
            session.flash_error(MSG_REGISTER_FAILED);
            return (session, Redirect::to("/register"));
        }
    };

    if form.password != form.password2 {
        session.flash_error(MSG_PASSWORD_MISMATCH);
        return (session, Redirect::to("/register"));
    }

    form.username = form.username.trim().to_string();
    if let Err(errors) = form.validate() {
        tracing::info!(%errors, "registration form rejected");
        session.flash_error(MSG_REGISTER_FAILED);
        return (session, Redirect::to("/register"));
    }

    let account = Account::new(form.fullname.trim(), form.usertype, form.username);

    match credentials.register(account, &form.password).await {
        Ok(_) => {
            session.flash_success(MSG_REGISTERED);
            (session, Redirect::to("/login"))
        }
        Err(CredentialError::DuplicateHandle(handle)) => {
            tracing::info!(username = %handle, "registration rejected: handle taken");
            session.flash_error(MSG_DUPLICATE_HANDLE);
            (session, Redirect::to("/register"))
        }
        Err(e) => {
            tracing::error!(error = %e, "registration failed");
            session.flash_error(MSG_REGISTER_FAILED);
            (session, Redirect::to("/register"))
        }
    }
}

// --- Learner Handlers ---

/// student_index
///
/// [Learner Route] Lists the courses the learner is enrolled in.
#[utoipa::path(get, path = "/student/index", responses(
    (status = 200, description = "Enrolled courses"),
    (status = 403, description = "Not a learner")
))]
pub async fn student_index(
    principal: Principal,
    State(courses): State<CourseRepositoryState>,
    mut session: Session,
) -> Result<(Session, Html<String>), AppError> {
    let enrolled = courses.find_by_ids(&principal.account.courses).await?;
    let flashes = session.take_flashes();
    Ok((session, views::student_index(&principal.account, &enrolled, &flashes)))
}

/// student_find
///
/// [Learner Route] Empty course search page.
#[utoipa::path(get, path = "/student/find", responses((status = 200, description = "Search form")))]
pub async fn student_find(principal: Principal, mut session: Session) -> (Session, Html<String>) {
    let flashes = session.take_flashes();
    (session, views::student_find(&principal.account, "", None, &flashes))
}

/// find_courses
///
/// [Learner Route] Searches courses whose name contains `key`
/// (case-insensitive). Without a `key` the empty search page is shown.
#[utoipa::path(
    get,
    path = "/courses/find",
    params(FindQuery),
    responses((status = 200, description = "Search results"))
)]
pub async fn find_courses(
    principal: Principal,
    State(courses): State<CourseRepositoryState>,
    Query(query): Query<FindQuery>,
    mut session: Session,
) -> Result<(Session, Html<String>), AppError> {
    let flashes = session.take_flashes();
    let Some(key) = query.key else {
        return Ok((session, views::student_find(&principal.account, "", None, &flashes)));
    };

    let found = courses.find_by_name_contains(key.trim()).await?;
    tracing::debug!(%key, hits = found.len(), "course search");
    Ok((
        session,
        views::student_find(&principal.account, &key, Some(&found), &flashes),
    ))
}

/// enroll
///
/// [Learner Route] Enrolls the learner in a course, then redirects to the
/// learner's index. Repeating the request enrolls again (duplicates are kept).
#[utoipa::path(
    get,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 303, description = "Enrolled; redirect to /student/index"),
        (status = 404, description = "Unknown course")
    )
)]
pub async fn enroll(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let course_id = Uuid::parse_str(&id).map_err(|_| AppError::NotFound)?;
    enrollment::enroll(&*state.accounts, &*state.courses, principal.id(), course_id).await?;
    Ok(Redirect::to("/student/index"))
}

// --- Instructor Handlers ---

/// teacher_index
///
/// [Instructor Route] Lists the courses the instructor owns.
#[utoipa::path(get, path = "/teacher/index", responses(
    (status = 200, description = "Owned courses"),
    (status = 403, description = "Not an instructor")
))]
pub async fn teacher_index(
    principal: Principal,
    State(courses): State<CourseRepositoryState>,
    mut session: Session,
) -> Result<(Session, Html<String>), AppError> {
    let owned = courses.find_by_ids(&principal.account.courses).await?;
    let flashes = session.take_flashes();
    Ok((session, views::teacher_index(&principal.account, &owned, &flashes)))
}

/// create_course_form
///
/// [Instructor Route] Renders the new-course form.
#[utoipa::path(get, path = "/teacher/create", responses((status = 200, description = "Course form")))]
pub async fn create_course_form(principal: Principal, mut session: Session) -> (Session, Html<String>) {
    let flashes = session.take_flashes();
    (session, views::teacher_create(&principal.account, &flashes))
}

/// create_course
///
/// [Instructor Route] Creates a course owned by the principal and records it
/// in the instructor's course list. Any failure (invalid form or store error)
/// sends the instructor back to the form with a flash.
#[utoipa::path(
    post,
    path = "/teacher/create",
    request_body(content = CreateCourseForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 303, description = "Redirect to /teacher/index, or back to the form on error"))
)]
pub async fn create_course(
    principal: Principal,
    State(state): State<AppState>,
    mut session: Session,
    form: Result<Form<CreateCourseForm>, FormRejection>,
) -> (Session, Redirect) {
    match try_create_course(&state, principal, form).await {
        Ok(course) => {
            tracing::info!(course_id = %course.id, author_id = %course.author_id, "course created");
            (session, Redirect::to("/teacher/index"))
        }
        Err(reason) => {
            tracing::error!(%reason, "course creation failed");
            session.flash_error(MSG_CREATE_FAILED);
            (session, Redirect::to("/teacher/create"))
        }
    }
}

/// Why a course could not be created.
#[derive(Debug, thiserror::Error)]
enum CreateCourseError {
    #[error("malformed course form: {0}")]
    Form(#[from] FormRejection),
    #[error("invalid course form: {0}")]
    Invalid(#[from] validator::ValidationErrors),
    #[error("price {0} is not a finite number")]
    NonFinitePrice(f64),
    #[error(transparent)]
    Repository(#[from] RepoError),
}

async fn try_create_course(
    state: &AppState,
    principal: Principal,
    form: Result<Form<CreateCourseForm>, FormRejection>,
) -> Result<Course, CreateCourseError> {
    let Form(mut form) = form?;
    form.course_name = form.course_name.trim().to_string();
    form.validate()?;
    // NaN and infinities slip past the range check.
    if !form.price.is_finite() {
        return Err(CreateCourseError::NonFinitePrice(form.price));
    }

    let course = Course::new(&form, &principal.account);
    state.courses.create(&course).await?;
    state.accounts.append_course(principal.id(), course.id).await?;

    Ok(course)
}

// --- Fallback ---

/// not_found
///
/// Catch-all for unknown paths.
pub async fn not_found() -> AppError {
    AppError::NotFound
}
