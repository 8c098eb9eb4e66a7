//! The two-phase password change.
//!
//! ```text
//! AwaitingOldPassword --submit ok--> AwaitingConfirmation --confirm ok--> Committed
//!          ^                               |
//!          +------- cancel / rejected -----+
//! ```
//!
//! The pending new password only ever lives in the server-side session. A
//! confirmation is honoured only for the user who started it, only while the
//! password it was started against is still current, and only within
//! [`CONFIRMATION_WINDOW_SECS`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::database::BoxError;
use crate::forms::{check_password_pair, FormErrors};
use crate::users::auth::{session_auth_hash, verify_password};
use crate::users::User;

pub const PENDING_KEY: &str = "change_password_pending";
pub const CONFIRMATION_WINDOW_SECS: i64 = 15 * 60;
pub const OLD_PASSWORD_INCORRECT: &str = "Old password is incorrect.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChangePasswordInput {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
    /// Present when the confirmation page's "confirm" button was pressed.
    pub confirm: Option<String>,
    /// Present when the confirmation page's "cancel" button was pressed.
    pub cancel: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePasswordAction {
    Submit,
    Confirm,
    Cancel,
}

impl ChangePasswordInput {
    pub fn action(&self) -> ChangePasswordAction {
        if self.confirm.is_some() {
            ChangePasswordAction::Confirm
        } else if self.cancel.is_some() {
            ChangePasswordAction::Cancel
        } else {
            ChangePasswordAction::Submit
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct PendingPasswordChange {
    pub user_id: i64,
    pub new_password: String,
    pub confirm_password: String,
    /// Keyed digest of the password hash the change was started against.
    pub issued_for: String,
    pub issued_at: i64,
}

impl fmt::Debug for PendingPasswordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingPasswordChange")
            .field("user_id", &self.user_id)
            .field("issued_at", &self.issued_at)
            .finish_non_exhaustive()
    }
}

/// Validates the first step. Returns the pending change to park in the
/// session, or the form errors to show; the outer error is a failure to
/// check the stored hash at all.
pub fn begin(
    input: &ChangePasswordInput,
    user: &User,
    secret_key: &str,
    now: i64,
) -> Result<Result<PendingPasswordChange, FormErrors>, BoxError> {
    let mut errors = FormErrors::new();

    if input.old_password.is_empty() {
        errors.add("old_password", "Old Password is required.");
    }
    check_password_pair(
        &mut errors,
        "new_password",
        "confirm_password",
        &input.new_password,
        &input.confirm_password,
        "New Password",
    );

    if !errors.is_empty() {
        return Ok(Err(errors));
    }

    if !verify_password(&input.old_password, &user.password_hash)? {
        errors.add("old_password", OLD_PASSWORD_INCORRECT);
        return Ok(Err(errors));
    }

    Ok(Ok(PendingPasswordChange {
        user_id: user.id,
        new_password: input.new_password.clone(),
        confirm_password: input.confirm_password.clone(),
        issued_for: session_auth_hash(secret_key, &user.password_hash)?,
        issued_at: now,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmRejection {
    /// Nothing parked in the session, or it could not be decoded.
    Missing,
    WrongUser,
    /// The password changed after the pending change was started.
    Stale,
    Expired,
    /// The parked new/confirm pair no longer validates.
    Invalid,
}

impl fmt::Display for ConfirmRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ConfirmRejection::Missing => "no pending password change",
            ConfirmRejection::WrongUser => "pending change belongs to another user",
            ConfirmRejection::Stale => "password changed since the change was started",
            ConfirmRejection::Expired => "confirmation window elapsed",
            ConfirmRejection::Invalid => "pending passwords do not validate",
        };
        f.write_str(reason)
    }
}

/// Decides the confirmation step. On success yields the new password to
/// commit; any rejection means the flow restarts from the first step.
pub fn confirm(
    pending: Option<PendingPasswordChange>,
    user: &User,
    secret_key: &str,
    now: i64,
) -> Result<Result<String, ConfirmRejection>, BoxError> {
    let Some(pending) = pending else {
        return Ok(Err(ConfirmRejection::Missing));
    };

    if pending.user_id != user.id {
        return Ok(Err(ConfirmRejection::WrongUser));
    }

    if pending.issued_for != session_auth_hash(secret_key, &user.password_hash)? {
        return Ok(Err(ConfirmRejection::Stale));
    }

    let age = now - pending.issued_at;
    if !(0..=CONFIRMATION_WINDOW_SECS).contains(&age) {
        return Ok(Err(ConfirmRejection::Expired));
    }

    let mut errors = FormErrors::new();
    check_password_pair(
        &mut errors,
        "new_password",
        "confirm_password",
        &pending.new_password,
        &pending.confirm_password,
        "New Password",
    );
    if !errors.is_empty() {
        return Ok(Err(ConfirmRejection::Invalid));
    }

    Ok(Ok(pending.new_password))
}
