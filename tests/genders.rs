mod common;

use account_admin::genders::GenderRepository;
use account_admin::users::UserRepository;
use axum::http::StatusCode;
use common::{body_text, create_test_app_state, create_user, get, location, login, post_form, user_form};

#[tokio::test]
async fn test_gender_pages_require_login() {
    let state = create_test_app_state().await;

    for uri in ["/gender/list/", "/gender/add/", "/gender/edit/1/", "/gender/delete/1/"] {
        let response = get(&state, uri, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert!(location(&response).starts_with("/login/?next="), "{}", uri);
    }
}

#[tokio::test]
async fn test_gender_crud() {
    let state = create_test_app_state().await;
    create_user(&state, "admin", "admin-pass").await;
    let cookie = login(&state, "admin", "admin-pass").await;

    let response = post_form(&state, "/gender/add/", Some(&cookie), &[("name", "Nonbinary")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/gender/list/");

    let list = body_text(get(&state, "/gender/list/", Some(&cookie)).await).await;
    assert!(list.contains("Gender added successfully."));
    assert!(list.contains("Nonbinary"));

    let repo = GenderRepository::new(state.db.clone());
    let gender = repo.list().await.unwrap().pop().unwrap();

    let edit_uri = format!("/gender/edit/{}/", gender.id);
    let form = body_text(get(&state, &edit_uri, Some(&cookie)).await).await;
    assert!(form.contains("value=\"Nonbinary\""));

    let response = post_form(&state, &edit_uri, Some(&cookie), &[("name", "Non-binary")]).await;
    assert_eq!(location(&response), "/gender/list/");
    assert_eq!(
        repo.find_by_id(gender.id).await.unwrap().unwrap().name,
        "Non-binary"
    );

    let delete_uri = format!("/gender/delete/{}/", gender.id);
    let confirm = body_text(get(&state, &delete_uri, Some(&cookie)).await).await;
    assert!(confirm.contains("Non-binary"));

    let response = post_form(&state, &delete_uri, Some(&cookie), &[]).await;
    assert_eq!(location(&response), "/gender/list/");
    assert!(repo.find_by_id(gender.id).await.unwrap().is_none());

    let list = body_text(get(&state, "/gender/list/", Some(&cookie)).await).await;
    assert!(list.contains("Gender deleted successfully."));
}

#[tokio::test]
async fn test_gender_name_is_required() {
    let state = create_test_app_state().await;
    create_user(&state, "admin", "admin-pass").await;
    let cookie = login(&state, "admin", "admin-pass").await;

    let response = post_form(&state, "/gender/add/", Some(&cookie), &[("name", "   ")]).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("This field is required."));
    assert!(GenderRepository::new(state.db.clone()).list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_gender_is_not_found() {
    let state = create_test_app_state().await;
    create_user(&state, "admin", "admin-pass").await;
    let cookie = login(&state, "admin", "admin-pass").await;

    let response = get(&state, "/gender/edit/404/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_form(&state, "/gender/edit/404/", Some(&cookie), &[("name", "X")]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_form(&state, "/gender/delete/404/", Some(&cookie), &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_gender_clears_profiles_using_it() {
    let state = create_test_app_state().await;
    create_user(&state, "admin", "admin-pass").await;
    let cookie = login(&state, "admin", "admin-pass").await;

    let gender = GenderRepository::new(state.db.clone())
        .create("Female".to_string())
        .await
        .unwrap();
    let gender_id = gender.id.to_string();

    let form: Vec<(&str, &str)> = user_form("ada")
        .into_iter()
        .map(|(k, v)| if k == "gender" { (k, gender_id.as_str()) } else { (k, v) })
        .collect();
    let response = post_form(&state, "/user/add/", Some(&cookie), &form).await;
    assert_eq!(location(&response), "/user/list/");

    let users = UserRepository::new(state.db.clone());
    let ada = users.find_by_username("ada").await.unwrap().unwrap();
    let details = users.find_details(ada.id).await.unwrap().unwrap();
    assert_eq!(details.profile.gender_id, Some(gender.id));
    assert_eq!(details.gender_name.as_deref(), Some("Female"));

    post_form(&state, &format!("/gender/delete/{}/", gender.id), Some(&cookie), &[]).await;

    let details = users.find_details(ada.id).await.unwrap().unwrap();
    assert_eq!(details.profile.gender_id, None);
    assert_eq!(details.gender_name, None);
}

#[tokio::test]
async fn test_unknown_gender_choice_is_rejected() {
    let state = create_test_app_state().await;
    create_user(&state, "admin", "admin-pass").await;
    let cookie = login(&state, "admin", "admin-pass").await;

    let form: Vec<(&str, &str)> = user_form("ada")
        .into_iter()
        .map(|(k, v)| if k == "gender" { (k, "777") } else { (k, v) })
        .collect();
    let response = post_form(&state, "/user/add/", Some(&cookie), &form).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response)
        .await
        .contains("Select a valid choice. That choice is not one of the available choices."));
}
