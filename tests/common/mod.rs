#![allow(dead_code)]

use account_admin::{
    config::AppConfig,
    database::Database,
    mail::Mailer,
    users::{AccountFields, NewUser, Profile, User, UserRepository},
    AppState,
};
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;

/// Creates a test app with a fresh database for integration testing
pub async fn create_test_app() -> Router {
    let app_state = create_test_app_state().await;
    account_admin::create_router(app_state).await
}

/// Creates a test app state with a unique temporary database
pub async fn create_test_app_state() -> AppState {
    // Create a test database with a unique temporary file
    let temp_dir = std::env::temp_dir();
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();

    let test_db_path = temp_dir
        .join(format!("test_account_admin_{}.db", timestamp))
        .to_string_lossy()
        .to_string();

    let config = Arc::new(AppConfig {
        database_url: test_db_path,
        environment: "test".to_string(),
        secret_key: "test-secret".to_string(),
        base_url: "http://testserver".to_string(),
        ..AppConfig::default()
    });

    let db = Arc::new(Database::new(&config.database_url).await.unwrap());
    db.migrate().await.unwrap();

    AppState::new(db, config, Mailer::memory())
}

pub async fn create_user(state: &AppState, username: &str, password: &str) -> User {
    insert_user(state, username, password, false).await
}

pub async fn create_superuser(state: &AppState, username: &str, password: &str) -> User {
    insert_user(state, username, password, true).await
}

async fn insert_user(state: &AppState, username: &str, password: &str, is_superuser: bool) -> User {
    UserRepository::new(state.db.clone())
        .create_user(NewUser {
            account: AccountFields {
                username: username.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                email: format!("{}@example.com", username),
            },
            password: password.to_string(),
            is_superuser,
            profile: Profile {
                phone_number: Some(5550100),
                ..Profile::default()
            },
        })
        .await
        .unwrap()
}

/// Sends one request through a router built on the shared state.
pub async fn send(state: &AppState, request: Request<Body>) -> Response<Body> {
    account_admin::create_router(state.clone())
        .await
        .oneshot(request)
        .await
        .unwrap()
}

pub async fn get(state: &AppState, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().uri(uri).method("GET");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    send(state, builder.body(Body::empty()).unwrap()).await
}

pub async fn post_form(
    state: &AppState,
    uri: &str,
    cookie: Option<&str>,
    fields: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let body = serde_urlencoded::to_string(fields).unwrap();
    send(state, builder.body(Body::from(body)).unwrap()).await
}

/// Logs in through the login form and returns the `id=...` session cookie.
pub async fn login(state: &AppState, username: &str, password: &str) -> String {
    let response = post_form(
        state,
        "/login/",
        None,
        &[
            ("form_type", "login"),
            ("username", username),
            ("password", password),
        ],
    )
    .await;
    assert_eq!(location(&response), "/user/list/", "login failed for {}", username);
    session_cookie(&response).expect("login response sets a session cookie")
}

pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("id="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A complete, valid user form submission.
pub fn user_form<'a>(username: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("username", username),
        ("first_name", "Ada"),
        ("last_name", "Lovelace"),
        ("email", "ada@example.com"),
        ("password", "analytical"),
        ("confirm_password", "analytical"),
        ("gender", ""),
        ("address", "12 St James's Square"),
        ("date_of_birth", "1815-12-10"),
        ("phone_number", "5551815"),
    ]
}
