use askama::Template;
use axum::{
    extract::{Path, State},
    http::Uri,
    response::Html,
};
use tower_sessions::Session;

use crate::forms::FormErrors;
use crate::passwords::reset::resolve_reset_link;
use crate::session::{current_user, require_login, require_superuser};
use crate::templates::{render, PageContext, PageError};
use crate::users::{User, UserRepository};
use crate::AppState;

#[derive(Template)]
#[template(path = "passwords/change.html")]
pub struct ChangePasswordTemplate {
    pub title: String,
    pub ctx: PageContext,
    pub errors: FormErrors,
}

impl ChangePasswordTemplate {
    pub fn new(ctx: PageContext, errors: FormErrors) -> Self {
        Self {
            title: "Change Password - Account Admin".to_string(),
            ctx,
            errors,
        }
    }
}

#[derive(Template)]
#[template(path = "passwords/change_confirm.html")]
pub struct ChangePasswordConfirmTemplate {
    pub title: String,
    pub ctx: PageContext,
}

#[derive(Template)]
#[template(path = "passwords/change_success.html")]
pub struct ChangePasswordSuccessTemplate {
    pub title: String,
    pub ctx: PageContext,
}

#[derive(Template)]
#[template(path = "passwords/admin_change.html")]
pub struct AdminChangePasswordTemplate {
    pub title: String,
    pub ctx: PageContext,
    pub user_to_change: User,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "passwords/reset_confirm.html")]
pub struct PasswordResetConfirmTemplate {
    pub title: String,
    pub ctx: PageContext,
    /// False renders the "invalid link" variant.
    pub valid_link: bool,
    pub action: String,
    pub errors: FormErrors,
}

pub async fn change_password_page(
    session: Session,
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Html<String>, PageError> {
    let user = require_login(&session, &state, uri.path()).await?;
    let ctx = PageContext::load(&session, Some(&user)).await?;

    Ok(render(&ChangePasswordTemplate::new(ctx, FormErrors::new())))
}

pub async fn change_password_success_page(
    session: Session,
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Html<String>, PageError> {
    let user = require_login(&session, &state, uri.path()).await?;

    let template = ChangePasswordSuccessTemplate {
        title: "Password Changed - Account Admin".to_string(),
        ctx: PageContext::load(&session, Some(&user)).await?,
    };

    Ok(render(&template))
}

pub async fn admin_change_password_page(
    session: Session,
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    uri: Uri,
) -> Result<Html<String>, PageError> {
    let admin = require_superuser(&session, &state, uri.path()).await?;

    let user_to_change = UserRepository::new(state.db.clone())
        .find_by_id(user_id)
        .await?
        .ok_or(PageError::NotFound)?;

    let template = AdminChangePasswordTemplate {
        title: "Change User Password - Account Admin".to_string(),
        ctx: PageContext::load(&session, Some(&admin)).await?,
        user_to_change,
        errors: FormErrors::new(),
    };

    Ok(render(&template))
}

pub async fn password_reset_confirm_page(
    session: Session,
    State(state): State<AppState>,
    Path((uidb64, token)): Path<(String, String)>,
    uri: Uri,
) -> Result<Html<String>, PageError> {
    let visitor = current_user(&session, &state).await?;
    let valid_link = resolve_reset_link(&state, &uidb64, &token).await?.is_some();

    let template = PasswordResetConfirmTemplate {
        title: "Set New Password - Account Admin".to_string(),
        ctx: PageContext::load(&session, visitor.as_ref()).await?,
        valid_link,
        action: uri.path().to_string(),
        errors: FormErrors::new(),
    };

    Ok(render(&template))
}
