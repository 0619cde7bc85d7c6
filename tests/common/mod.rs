#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use course_portal::{
    AppConfig, AppState, InMemoryRepository, create_router,
    models::{Account, Course, Role},
    repository::{AccountRepository, CourseRepository},
};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse";

/// Captured response: status, redirect target, session cookie and body text.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub session_cookie: Option<String>,
    pub body: String,
}

/// A router over an in-memory store plus a one-slot cookie jar, so a test
/// can act like a single browser.
pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryRepository>,
    pub cookie: Option<String>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_repo(Arc::new(InMemoryRepository::new()))
    }

    pub fn with_repo(repo: Arc<InMemoryRepository>) -> Self {
        let state = AppState::with_repository(repo.clone(), AppConfig::default());
        Self {
            router: create_router(state),
            repo,
            cookie: None,
        }
    }

    /// Same store, fresh browser.
    pub fn new_browser(&self) -> Self {
        Self {
            router: self.router.clone(),
            repo: self.repo.clone(),
            cookie: None,
        }
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = Request::builder().method("GET").uri(path);
        self.send(request, Body::empty()).await
    }

    pub async fn post_form(&mut self, path: &str, form: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(request, Body::from(form.to_string())).await
    }

    async fn send(&mut self, mut request: axum::http::request::Builder, body: Body) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie.clone());
        }
        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let session_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().split(';').next().unwrap().to_string());
        if let Some(cookie) = &session_cookie {
            self.cookie = Some(cookie.clone());
        }
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            location,
            session_cookie,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn register(&mut self, username: &str, role: &str) -> TestResponse {
        let form = format!(
            "fullname=Test+User&usertype={role}&username={username}&password={PASSWORD}&password2={PASSWORD}"
        );
        self.post_form("/register", &form).await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> TestResponse {
        self.post_form("/login", &format!("username={username}&password={password}"))
            .await
    }

    /// Registers and logs in, returning the stored account.
    pub async fn sign_in_as(&mut self, username: &str, role: &str) -> Account {
        let registered = self.register(username, role).await;
        assert_eq!(registered.location.as_deref(), Some("/login"));
        let logged_in = self.login(username, PASSWORD).await;
        assert_eq!(logged_in.status, StatusCode::SEE_OTHER);
        self.account(username).await
    }

    pub async fn account(&self, username: &str) -> Account {
        self.repo.find_by_handle(username).await.unwrap().unwrap()
    }

    pub async fn course(&self, id: Uuid) -> Course {
        CourseRepository::find_by_id(&*self.repo, id)
            .await
            .unwrap()
            .unwrap()
    }
}

/// Inserts an instructor-owned course directly into the store.
pub async fn seed_course(repo: &InMemoryRepository, name: &str) -> Course {
    let owner = Account::new("Owner", Role::Instructor, format!("{}-owner@example.com", Uuid::new_v4()));
    AccountRepository::insert(repo, &owner, "unused-hash").await.unwrap();
    let course = Course {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: "seeded".to_string(),
        price: 10.0,
        author: owner.fullname.clone(),
        author_id: owner.id,
        students: vec![],
        created_at: chrono::Utc::now(),
    };
    repo.create(&course).await.unwrap();
    course
}
