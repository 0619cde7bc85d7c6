use course_portal::{AppConfig, AppState, InMemoryRepository, create_router};
use reqwest::{StatusCode, header::LOCATION, redirect::Policy};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub repo: Arc<InMemoryRepository>,
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let state = AppState::with_repository(repo.clone(), AppConfig::default());
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, repo }
}

/// A cookie-keeping client that reports redirects instead of following them.
fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .unwrap()
}

fn location(response: &reqwest::Response) -> &str {
    response.headers()[LOCATION].to_str().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = reqwest::Client::new()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = spawn_app().await;
    let response = reqwest::Client::new()
        .get(format!("{}/", app.address))
        .send()
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_session_cookie_attributes() {
    let app = spawn_app().await;
    let response = browser()
        .get(format!("{}/student/index", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = response.headers()["set-cookie"].to_str().unwrap();
    assert!(cookie.starts_with("course_portal_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
}

#[tokio::test]
async fn test_instructor_and_learner_full_flow() {
    let app = spawn_app().await;

    // Instructor registers, signs in, publishes a course.
    let teacher = browser();
    let response = teacher
        .post(format!("{}/register", app.address))
        .form(&[
            ("fullname", "Ada Lovelace"),
            ("usertype", "instructor"),
            ("username", "ada@example.com"),
            ("password", "engine"),
            ("password2", "engine"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/login");

    let response = teacher
        .post(format!("{}/login", app.address))
        .form(&[("username", "ada@example.com"), ("password", "engine")])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/teacher/index");

    let response = teacher
        .post(format!("{}/teacher/create", app.address))
        .form(&[
            ("courseName", "Analytical Engines"),
            ("description", "Notes on the engine"),
            ("price", "12.5"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/teacher/index");

    let page = teacher
        .get(format!("{}/teacher/index", app.address))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Analytical Engines"));
    assert_eq!(app.repo.course_count().await, 1);

    // Learner finds the course and enrolls.
    let learner = browser();
    learner
        .post(format!("{}/register", app.address))
        .form(&[
            ("fullname", "Charles Babbage"),
            ("usertype", "learner"),
            ("username", "charles@example.com"),
            ("password", "difference"),
            ("password2", "difference"),
        ])
        .send()
        .await
        .unwrap();
    let response = learner
        .post(format!("{}/login", app.address))
        .form(&[("username", "charles@example.com"), ("password", "difference")])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/student/index");

    let results = learner
        .get(format!("{}/courses/find?key=analytical", app.address))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(results.contains("Analytical Engines"));

    let marker = r#"<a href=""#;
    let start = results.find(&format!("{marker}/courses/")).unwrap() + marker.len();
    let course_link: String = results[start..]
        .chars()
        .take_while(|c| *c != '"')
        .collect();
    let response = learner
        .get(format!("{}{}", app.address, course_link))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/student/index");

    let page = learner
        .get(format!("{}/student/index", app.address))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Analytical Engines"));

    // Roles stay separated.
    let response = learner
        .get(format!("{}/teacher/index", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Logout ends the session.
    let response = learner
        .get(format!("{}/logout", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/");
    let response = learner
        .get(format!("{}/student/index", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/login");
}
