use axum::{
    extract::{Path, State},
    http::Uri,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, warn};

use crate::forms::{check_password_pair, FormErrors};
use crate::passwords::change::{
    self, ChangePasswordAction, ChangePasswordInput, PendingPasswordChange, PENDING_KEY,
};
use crate::passwords::reset::resolve_reset_link;
use crate::passwords::templates::{
    AdminChangePasswordTemplate, ChangePasswordConfirmTemplate, ChangePasswordTemplate,
    PasswordResetConfirmTemplate,
};
use crate::session::{
    current_user, flash, refresh_auth_hash, require_login, require_superuser, MessageLevel,
};
use crate::templates::{render, PageContext, PageError};
use crate::users::UserRepository;
use crate::AppState;

const CHANGE_PASSWORD_URL: &str = "/user/change_password/";

/// Body of the admin-forced and reset-link password forms.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SetPasswordInput {
    pub new_password: String,
    pub confirm_password: String,
}

impl SetPasswordInput {
    pub fn clean(&self) -> Result<&str, FormErrors> {
        let mut errors = FormErrors::new();
        check_password_pair(
            &mut errors,
            "new_password",
            "confirm_password",
            &self.new_password,
            &self.confirm_password,
            "New Password",
        );
        errors.into_result().map(|()| self.new_password.as_str())
    }
}

/// Drives the multi-step change: submit, then confirm or cancel.
pub async fn change_password_submit(
    session: Session,
    State(state): State<AppState>,
    uri: Uri,
    Form(input): Form<ChangePasswordInput>,
) -> Result<Response, PageError> {
    let user = require_login(&session, &state, uri.path()).await?;
    let secret_key = state.config.secret_key.as_str();

    match input.action() {
        ChangePasswordAction::Submit => {
            let now = Utc::now().timestamp();
            match change::begin(&input, &user, secret_key, now)? {
                Ok(pending) => {
                    session.insert(PENDING_KEY, pending).await?;
                    let template = ChangePasswordConfirmTemplate {
                        title: "Confirm Password Change - Account Admin".to_string(),
                        ctx: PageContext::load(&session, Some(&user)).await?,
                    };
                    Ok(render(&template).into_response())
                }
                Err(errors) => {
                    let ctx = PageContext::load(&session, Some(&user)).await?;
                    Ok(render(&ChangePasswordTemplate::new(ctx, errors)).into_response())
                }
            }
        }
        ChangePasswordAction::Confirm => {
            // Whatever happens next, the parked change is single-use.
            let pending = match session.remove::<PendingPasswordChange>(PENDING_KEY).await {
                Ok(pending) => pending,
                Err(e) => {
                    warn!(user_id = user.id, "Unreadable pending password change: {}", e);
                    None
                }
            };

            let now = Utc::now().timestamp();
            let new_password = match change::confirm(pending, &user, secret_key, now)? {
                Ok(new_password) => new_password,
                Err(rejection) => {
                    warn!(user_id = user.id, %rejection, "Password change confirmation rejected");
                    return Ok(Redirect::to(CHANGE_PASSWORD_URL).into_response());
                }
            };

            let updated = UserRepository::new(state.db.clone())
                .set_password(user.id, &new_password)
                .await?;
            refresh_auth_hash(&session, &state, &updated).await?;
            info!(user_id = user.id, "Password changed");

            flash(&session, MessageLevel::Success, "Password changed successfully.").await?;
            Ok(Redirect::to("/user/change_password/success/").into_response())
        }
        ChangePasswordAction::Cancel => {
            session.remove_value(PENDING_KEY).await?;
            Ok(Redirect::to(CHANGE_PASSWORD_URL).into_response())
        }
    }
}

pub async fn admin_change_password_submit(
    session: Session,
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    uri: Uri,
    Form(input): Form<SetPasswordInput>,
) -> Result<Response, PageError> {
    let admin = require_superuser(&session, &state, uri.path()).await?;

    let repo = UserRepository::new(state.db.clone());
    let user_to_change = repo.find_by_id(user_id).await?.ok_or(PageError::NotFound)?;

    let new_password = match input.clean() {
        Ok(new_password) => new_password,
        Err(errors) => {
            let template = AdminChangePasswordTemplate {
                title: "Change User Password - Account Admin".to_string(),
                ctx: PageContext::load(&session, Some(&admin)).await?,
                user_to_change,
                errors,
            };
            return Ok(render(&template).into_response());
        }
    };

    repo.set_password(user_to_change.id, new_password).await?;
    info!(user_id, admin_id = admin.id, "Password changed by administrator");

    flash(
        &session,
        MessageLevel::Success,
        format!("Password for user {} has been changed.", user_to_change.username),
    )
    .await?;
    Ok(Redirect::to("/user/list/").into_response())
}

pub async fn password_reset_confirm_submit(
    session: Session,
    State(state): State<AppState>,
    Path((uidb64, token)): Path<(String, String)>,
    uri: Uri,
    Form(input): Form<SetPasswordInput>,
) -> Result<Response, PageError> {
    let visitor = current_user(&session, &state).await?;

    let Some(user) = resolve_reset_link(&state, &uidb64, &token).await? else {
        warn!("Password reset attempted with an invalid link");
        let template = PasswordResetConfirmTemplate {
            title: "Set New Password - Account Admin".to_string(),
            ctx: PageContext::load(&session, visitor.as_ref()).await?,
            valid_link: false,
            action: uri.path().to_string(),
            errors: FormErrors::new(),
        };
        return Ok(render(&template).into_response());
    };

    let new_password = match input.clean() {
        Ok(new_password) => new_password,
        Err(errors) => {
            let template = PasswordResetConfirmTemplate {
                title: "Set New Password - Account Admin".to_string(),
                ctx: PageContext::load(&session, visitor.as_ref()).await?,
                valid_link: true,
                action: uri.path().to_string(),
                errors,
            };
            return Ok(render(&template).into_response());
        }
    };

    UserRepository::new(state.db.clone())
        .set_password(user.id, new_password)
        .await?;
    info!(user_id = user.id, "Password reset through emailed link");

    flash(
        &session,
        MessageLevel::Success,
        "Your password has been set. You may go ahead and log in now.",
    )
    .await?;
    Ok(Redirect::to("/login/").into_response())
}
