use axum::{
    extract::{Path, State},
    http::Uri,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use tower_sessions::Session;
use tracing::{info, warn};

use crate::forms::FormErrors;
use crate::passwords::reset::request_password_reset;
use crate::session::{flash, log_in, require_login, safe_next, MessageLevel};
use crate::templates::{render, PageContext, PageError};
use crate::users::auth::verify_password;
use crate::users::forms::{validate_user_form, UserFormMode, USERNAME_TAKEN};
use crate::users::models::{LoginForm, NewUser, User, UserFormInput};
use crate::users::repository::{is_unique_violation, UserRepository};
use crate::users::templates::{UserFormKind, UserFormTemplate};
use crate::AppState;

pub const DEFAULT_LANDING: &str = "/user/list/";

/// The login page hosts two forms told apart by `form_type`.
pub async fn login_submit(
    session: Session,
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    match form.form_type.as_str() {
        "login" => authenticate(&session, &state, &form).await,
        "forgot_password" => {
            request_password_reset(&session, &state, &form.username_or_email).await?;
            Ok(Redirect::to("/login/").into_response())
        }
        _ => Ok(Redirect::to("/login/").into_response()),
    }
}

async fn authenticate(
    session: &Session,
    state: &AppState,
    form: &LoginForm,
) -> Result<Response, PageError> {
    let repo = UserRepository::new(state.db.clone());
    let user = repo.find_by_username(form.username.trim()).await?;

    let verified = match &user {
        Some(user) => verify_password(&form.password, &user.password_hash).unwrap_or_else(|e| {
            warn!(user_id = user.id, "Failed to verify password: {}", e);
            false
        }),
        None => false,
    };

    let user = match user {
        Some(user) if verified => user,
        _ => {
            warn!(username = %form.username, "Failed login attempt");
            let mut target = url::form_urlencoded::Serializer::new(String::new());
            target.append_pair("error", "1");
            if let Some(next) = safe_next(&form.next) {
                target.append_pair("next", next);
            }
            return Ok(Redirect::to(&format!("/login/?{}", target.finish())).into_response());
        }
    };

    repo.record_login(user.id).await?;
    log_in(session, state, &user).await?;
    info!(user_id = user.id, username = %user.username, "User logged in");

    let target = safe_next(&form.next).unwrap_or(DEFAULT_LANDING);
    Ok(Redirect::to(target).into_response())
}

pub async fn logout(session: Session) -> Result<Redirect, PageError> {
    session.flush().await?;
    Ok(Redirect::to("/login/"))
}

async fn rerender_user_form(
    session: &Session,
    state: &AppState,
    user: &User,
    kind: UserFormKind,
    mut input: UserFormInput,
    errors: FormErrors,
) -> Result<Response, PageError> {
    input.password.clear();
    input.confirm_password.clear();

    let ctx = PageContext::load(session, Some(user)).await?;
    let template = UserFormTemplate::build(state, ctx, kind, input, errors).await?;
    Ok(render(&template).into_response())
}

pub async fn user_add_submit(
    session: Session,
    State(state): State<AppState>,
    uri: Uri,
    Form(input): Form<UserFormInput>,
) -> Result<Response, PageError> {
    let current = require_login(&session, &state, uri.path()).await?;

    let cleaned = match validate_user_form(state.db.clone(), &input, UserFormMode::Create).await? {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            return rerender_user_form(&session, &state, &current, UserFormKind::Add, input, errors)
                .await;
        }
    };

    let new_user = NewUser {
        account: cleaned.account,
        password: cleaned.password.unwrap_or_default(),
        is_superuser: false,
        profile: cleaned.profile,
    };

    match UserRepository::new(state.db.clone()).create_user(new_user).await {
        Ok(created) => {
            info!(user_id = created.id, username = %created.username, "User added");
            flash(&session, MessageLevel::Success, "User added successfully.").await?;
            Ok(Redirect::to(DEFAULT_LANDING).into_response())
        }
        Err(e) if is_unique_violation(&e) => {
            let mut errors = FormErrors::new();
            errors.add("username", USERNAME_TAKEN);
            rerender_user_form(&session, &state, &current, UserFormKind::Add, input, errors).await
        }
        Err(e) => Err(e.into()),
    }
}

/// Shared by the admin edit form and the self-service profile form.
async fn update_user_from_form(
    session: &Session,
    state: &AppState,
    current: &User,
    user_id: i64,
    kind: UserFormKind,
    input: UserFormInput,
) -> Result<Option<Response>, PageError> {
    let mode = UserFormMode::Update { user_id };
    let cleaned = match validate_user_form(state.db.clone(), &input, mode).await? {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            return rerender_user_form(session, state, current, kind, input, errors)
                .await
                .map(Some);
        }
    };

    let repo = UserRepository::new(state.db.clone());
    match repo.update_user(user_id, cleaned.account, cleaned.profile).await {
        Ok(()) => Ok(None),
        Err(e) if is_unique_violation(&e) => {
            let mut errors = FormErrors::new();
            errors.add("username", USERNAME_TAKEN);
            rerender_user_form(session, state, current, kind, input, errors)
                .await
                .map(Some)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn user_edit_submit(
    session: Session,
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    uri: Uri,
    Form(input): Form<UserFormInput>,
) -> Result<Response, PageError> {
    let current = require_login(&session, &state, uri.path()).await?;

    UserRepository::new(state.db.clone())
        .find_by_id(user_id)
        .await?
        .ok_or(PageError::NotFound)?;

    let kind = UserFormKind::Edit(user_id);
    if let Some(page) = update_user_from_form(&session, &state, &current, user_id, kind, input).await? {
        return Ok(page);
    }

    info!(user_id, editor = current.id, "User updated");
    flash(&session, MessageLevel::Success, "User updated successfully.").await?;
    Ok(Redirect::to(DEFAULT_LANDING).into_response())
}

pub async fn profile_edit_submit(
    session: Session,
    State(state): State<AppState>,
    uri: Uri,
    Form(input): Form<UserFormInput>,
) -> Result<Response, PageError> {
    let current = require_login(&session, &state, uri.path()).await?;

    let user_id = current.id;
    let kind = UserFormKind::Profile;
    if let Some(page) = update_user_from_form(&session, &state, &current, user_id, kind, input).await? {
        return Ok(page);
    }

    info!(user_id, "Profile updated");
    flash(&session, MessageLevel::Success, "Profile updated successfully.").await?;
    Ok(Redirect::to(DEFAULT_LANDING).into_response())
}

pub async fn user_delete_submit(
    session: Session,
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    uri: Uri,
) -> Result<Response, PageError> {
    let current = require_login(&session, &state, uri.path()).await?;

    if !UserRepository::new(state.db.clone()).delete_user(user_id).await? {
        return Err(PageError::NotFound);
    }
    info!(user_id, deleted_by = current.id, "User deleted");

    flash(&session, MessageLevel::Success, "User deleted successfully.").await?;
    Ok(Redirect::to(DEFAULT_LANDING).into_response())
}
