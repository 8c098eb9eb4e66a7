//! Password reset links: signed tokens and the request that emails them.

use askama::Template;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tower_sessions::Session;
use tracing::{error, info, warn};

use crate::database::BoxError;
use crate::mail::OutgoingEmail;
use crate::session::{flash, MessageLevel};
use crate::templates::PageError;
use crate::users::{User, UserRepository};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

const KEY_SALT: &[u8] = b"account-admin.password-reset";

/// Issues and checks reset tokens of the form `<timestamp base36>-<signature>`.
///
/// The signature covers the user's id, password hash, last login and email,
/// so a token stops working as soon as any of those change.
pub struct ResetTokenGenerator<'a> {
    secret_key: &'a str,
    timeout_secs: i64,
}

impl<'a> ResetTokenGenerator<'a> {
    pub fn new(secret_key: &'a str, timeout_secs: i64) -> Self {
        Self {
            secret_key,
            timeout_secs,
        }
    }

    pub fn make_token(&self, user: &User, now: i64) -> Result<String, BoxError> {
        let timestamp = u64::try_from(now)?;
        let mac = self.signature(user, timestamp)?;
        Ok(format!(
            "{}-{}",
            to_base36(timestamp),
            URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
        ))
    }

    pub fn check_token(&self, user: &User, token: &str, now: i64) -> bool {
        let Some((ts_b36, signature)) = token.split_once('-') else {
            return false;
        };
        let Some(timestamp) = from_base36(ts_b36) else {
            return false;
        };
        let Ok(signature) = URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };
        let Ok(mac) = self.signature(user, timestamp) else {
            return false;
        };

        // verify_slice compares in constant time
        if mac.verify_slice(&signature).is_err() {
            return false;
        }

        match i64::try_from(timestamp) {
            Ok(issued) => now >= issued && now - issued <= self.timeout_secs,
            Err(_) => false,
        }
    }

    fn signature(&self, user: &User, timestamp: u64) -> Result<HmacSha256, BoxError> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| format!("Invalid secret key: {}", e))?;
        let last_login = user
            .last_login
            .map(|t| t.timestamp().to_string())
            .unwrap_or_default();

        mac.update(KEY_SALT);
        for part in [
            user.id.to_string().as_str(),
            user.password_hash.as_str(),
            last_login.as_str(),
            timestamp.to_string().as_str(),
            user.email.as_str(),
        ] {
            mac.update(b"\x1f");
            mac.update(part.as_bytes());
        }
        Ok(mac)
    }
}

/// URL-safe, unpadded base64 of the decimal user id.
pub fn encode_uid(user_id: i64) -> String {
    URL_SAFE_NO_PAD.encode(user_id.to_string())
}

pub fn decode_uid(uidb64: &str) -> Option<i64> {
    let bytes = URL_SAFE_NO_PAD.decode(uidb64).ok()?;
    String::from_utf8(bytes).ok()?.parse().ok()
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn from_base36(s: &str) -> Option<u64> {
    // Longer than u64::MAX in base 36; also rejects empty input below.
    if s.is_empty() || s.len() > 13 {
        return None;
    }
    u64::from_str_radix(s, 36).ok()
}

#[derive(Template)]
#[template(path = "emails/password_reset.txt")]
pub struct PasswordResetEmail {
    pub username: String,
    pub reset_url: String,
}

pub fn reset_url(state: &AppState, user: &User, token: &str) -> String {
    format!(
        "{}/password_reset/confirm/{}/{}/",
        state.config.base_url.trim_end_matches('/'),
        encode_uid(user.id),
        token
    )
}

/// Handles the login page's forgot-password form. Outcomes are reported to
/// the visitor as flash messages; only infrastructure failures are errors.
pub async fn request_password_reset(
    session: &Session,
    state: &AppState,
    username_or_email: &str,
) -> Result<(), PageError> {
    let value = username_or_email.trim();
    if value.is_empty() {
        flash(session, MessageLevel::Error, "Invalid input for password reset.").await?;
        return Ok(());
    }

    let repo = UserRepository::new(state.db.clone());
    let Some(user) = repo.find_by_username_or_email(value).await? else {
        warn!(lookup = %value, "Password reset requested for unknown user");
        flash(
            session,
            MessageLevel::Error,
            "No user found with this username or email.",
        )
        .await?;
        return Ok(());
    };

    if user.email.is_empty() {
        flash(
            session,
            MessageLevel::Error,
            "No email address is associated with this account.",
        )
        .await?;
        return Ok(());
    }

    let generator = ResetTokenGenerator::new(
        &state.config.secret_key,
        state.config.password_reset_timeout_secs,
    );
    let token = generator.make_token(&user, Utc::now().timestamp())?;

    let body = PasswordResetEmail {
        username: user.username.clone(),
        reset_url: reset_url(state, &user, &token),
    }
    .render()
    .map_err(|e| PageError::Internal(format!("Failed to render reset email: {}", e)))?;

    let email = OutgoingEmail {
        to: user.email.clone(),
        subject: "Password Reset Requested".to_string(),
        body,
    };

    match state.mailer.send(&state.config.default_from_email, email).await {
        Ok(()) => {
            info!(user_id = user.id, "Password reset email sent");
            flash(
                session,
                MessageLevel::Success,
                "Password reset instructions have been sent to the email address associated with the account.",
            )
            .await?;
        }
        Err(e) => {
            error!(user_id = user.id, "Failed to send password reset email: {}", e);
            flash(
                session,
                MessageLevel::Error,
                "The password reset email could not be sent. Please try again later.",
            )
            .await?;
        }
    }

    Ok(())
}

/// Resolves a reset link to its user when both parts verify.
pub async fn resolve_reset_link(
    state: &AppState,
    uidb64: &str,
    token: &str,
) -> Result<Option<User>, PageError> {
    let Some(user_id) = decode_uid(uidb64) else {
        return Ok(None);
    };
    let Some(user) = UserRepository::new(state.db.clone()).find_by_id(user_id).await? else {
        return Ok(None);
    };

    let generator = ResetTokenGenerator::new(
        &state.config.secret_key,
        state.config.password_reset_timeout_secs,
    );
    if generator.check_token(&user, token, Utc::now().timestamp()) {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;
    const DAY: i64 = 86_400;

    fn user() -> User {
        User {
            id: 42,
            username: "reset-me".to_string(),
            first_name: "Reset".to_string(),
            last_name: "Me".to_string(),
            email: "reset@example.com".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            is_superuser: false,
            last_login: None,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let generator = ResetTokenGenerator::new("secret", 3 * DAY);
        let token = generator.make_token(&user(), NOW).unwrap();
        assert!(generator.check_token(&user(), &token, NOW + DAY));
    }

    #[test]
    fn test_token_expires() {
        let generator = ResetTokenGenerator::new("secret", 3 * DAY);
        let token = generator.make_token(&user(), NOW).unwrap();
        assert!(generator.check_token(&user(), &token, NOW + 3 * DAY));
        assert!(!generator.check_token(&user(), &token, NOW + 3 * DAY + 1));
    }

    #[test]
    fn test_token_invalidated_by_password_change_and_login() {
        let generator = ResetTokenGenerator::new("secret", 3 * DAY);
        let token = generator.make_token(&user(), NOW).unwrap();

        let mut changed = user();
        changed.password_hash.push('x');
        assert!(!generator.check_token(&changed, &token, NOW));

        let mut logged_in = user();
        logged_in.last_login = Some(Utc::now());
        assert!(!generator.check_token(&logged_in, &token, NOW));
    }

    #[test]
    fn test_token_bound_to_secret_and_user() {
        let token = ResetTokenGenerator::new("secret", DAY)
            .make_token(&user(), NOW)
            .unwrap();
        assert!(!ResetTokenGenerator::new("other", DAY).check_token(&user(), &token, NOW));

        let mut other = user();
        other.id = 43;
        assert!(!ResetTokenGenerator::new("secret", DAY).check_token(&other, &token, NOW));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let generator = ResetTokenGenerator::new("secret", DAY);
        for token in ["", "-", "abc", "zzzzzzzzzzzzzzzz-AAAA", "1-not*base64", "!!-AAAA"] {
            assert!(!generator.check_token(&user(), token, NOW), "{}", token);
        }
    }

    #[test]
    fn test_uid_encoding() {
        assert_eq!(encode_uid(42), "NDI");
        assert_eq!(decode_uid("NDI"), Some(42));
        assert_eq!(decode_uid("not base64!"), None);
        assert_eq!(decode_uid("YWJj"), None);
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(from_base36(&to_base36(NOW as u64)), Some(NOW as u64));
        assert_eq!(from_base36(""), None);
    }
}
