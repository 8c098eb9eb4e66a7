mod common;

use axum::http::StatusCode;
use common::{body_text, create_test_app_state, create_user, get, location, login, post_form};

#[tokio::test]
async fn test_health_check() {
    let state = create_test_app_state().await;

    let response = get(&state, "/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn test_root_redirects_to_user_list() {
    let state = create_test_app_state().await;

    let response = get(&state, "/", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/user/list/");
}

#[tokio::test]
async fn test_login_page_renders_both_forms() {
    let state = create_test_app_state().await;

    let response = get(&state, "/login/", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("value=\"login\""));
    assert!(page.contains("value=\"forgot_password\""));
    assert!(!page.contains("Invalid username or password."));
}

#[tokio::test]
async fn test_logout_ends_session() {
    let state = create_test_app_state().await;
    create_user(&state, "alice", "wonderland").await;
    let cookie = login(&state, "alice", "wonderland").await;

    assert_eq!(get(&state, "/user/list/", Some(&cookie)).await.status(), StatusCode::OK);

    let response = post_form(&state, "/logout/", Some(&cookie), &[]).await;
    assert_eq!(location(&response), "/login/");

    let response = get(&state, "/user/list/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_session_of_deleted_user_is_discarded() {
    let state = create_test_app_state().await;
    create_user(&state, "admin", "admin-pass").await;
    let doomed = create_user(&state, "doomed", "doomed-pass").await;
    let admin_cookie = login(&state, "admin", "admin-pass").await;
    let doomed_cookie = login(&state, "doomed", "doomed-pass").await;

    post_form(&state, &format!("/user/delete/{}/", doomed.id), Some(&admin_cookie), &[]).await;

    let response = get(&state, "/user/list/", Some(&doomed_cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let state = create_test_app_state().await;

    let response = get(&state, "/nowhere/", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
