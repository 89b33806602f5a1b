// tests/api_tests.rs

mod common;

use common::{spawn_app, unique_name};
use serde_json::Value;

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = spawn_app().await;

    let body: Value = app
        .client
        .get(app.url("/api/health"))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn pages_are_served_as_html() {
    let app = spawn_app().await;

    for page in ["/", "/summary", "/mcq", "/chatbot", "/contact", "/analytics"] {
        let response = app.client.get(app.url(page)).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 200, "page {}", page);
        let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"), "page {}", page);
    }
}

#[tokio::test]
async fn chatbot_page_offers_voice_input() {
    let app = spawn_app().await;

    let page = app.client.get(app.url("/chatbot")).send().await.unwrap().text().await.unwrap();
    assert!(page.contains(r#"id="voiceBtn""#));

    let script = app.client.get(app.url("/static/js/app.js")).send().await.unwrap();
    assert_eq!(script.status().as_u16(), 200);
    let script = script.text().await.unwrap();
    assert!(script.contains("function recordVoice"));
    assert!(script.contains("webkitSpeechRecognition"));
}

#[tokio::test]
async fn register_works() {
    // Arrange
    let app = spawn_app().await;
    let username = unique_name();

    // Act
    let response = app.register(&username, "password123").await;

    // Assert
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["username"], username.as_str());
    assert_eq!(body["role"], "student");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn register_fails_validation() {
    let app = spawn_app().await;

    // Username that is too short
    let response = app.register("yo", "password123").await;

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = spawn_app().await;
    let username = unique_name();

    assert_eq!(app.register(&username, "password123").await.status().as_u16(), 201);
    let response = app.register(&username, "another-pass").await;

    assert_eq!(response.status().as_u16(), 409);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn login_returns_bearer_token() {
    let app = spawn_app().await;
    let username = unique_name();
    app.register(&username, "password123").await;

    let response = app.login(&username, "password123").await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["type"], "Bearer");
    assert_eq!(body["username"], username.as_str());
    assert_eq!(body["role"], "student");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = spawn_app().await;
    let username = unique_name();
    app.register(&username, "password123").await;

    let wrong = app.login(&username, "wrong-password").await;
    let unknown = app.login(&unique_name(), "password123").await;

    assert_eq!(wrong.status().as_u16(), 401);
    assert_eq!(unknown.status().as_u16(), 401);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = spawn_app().await;

    let missing = app.client.get(app.url("/api/documents")).send().await.unwrap();
    let bogus = app.get("/api/documents", "not-a-jwt").send().await.unwrap();

    assert_eq!(missing.status().as_u16(), 401);
    assert_eq!(bogus.status().as_u16(), 401);

    let missing: Value = missing.json().await.unwrap();
    let bogus: Value = bogus.json().await.unwrap();
    assert_eq!(missing["error"], "Missing bearer token");
    assert_eq!(bogus["error"], "Invalid token");
}

#[tokio::test]
async fn logout_is_recorded_in_activity() {
    let app = spawn_app().await;
    let (_, token) = app.student().await;

    let response = app.post("/api/auth/logout", &token).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let activity: Vec<Value> = app
        .get("/api/activity", &token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let actions: Vec<&str> = activity.iter().filter_map(|e| e["action"].as_str()).collect();
    assert_eq!(actions, vec!["logout", "login"]);
}

#[tokio::test]
async fn student_list_is_teacher_only() {
    let app = spawn_app().await;
    let (student, student_token) = app.student().await;
    let (_, teacher_token) = app.teacher().await;

    let denied = app.get("/api/students", &student_token).send().await.unwrap();
    assert_eq!(denied.status().as_u16(), 403);
    let body: Value = denied.json().await.unwrap();
    assert_eq!(body["error"], "Teacher role required");

    let response = app.get("/api/students", &teacher_token).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let students: Vec<Value> = response.json().await.unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0]["username"], student.as_str());
}
