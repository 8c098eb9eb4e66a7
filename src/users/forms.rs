use std::sync::Arc;

use crate::database::{BoxError, Database};
use crate::forms::{
    check_password_pair, is_valid_email, parse_optional_date, parse_optional_id,
    parse_required_integer, FormErrors, INVALID_CHOICE,
};
use crate::genders::GenderRepository;
use crate::users::models::{AccountFields, Profile, UserFormInput};
use crate::users::repository::UserRepository;

pub const USERNAME_MAX_LEN: usize = 150;
pub const FULL_NAME_REQUIRED: &str = "Full Name fields (First and Last) are required.";
pub const USERNAME_TAKEN: &str = "Username already exists.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFormMode {
    /// Admin add form: password pair required, username must be free.
    Create,
    /// Edit forms: no password, username may stay the edited user's own.
    Update { user_id: i64 },
}

#[derive(Debug, Clone)]
pub struct CleanedUserForm {
    pub account: AccountFields,
    pub password: Option<String>,
    pub profile: Profile,
}

/// Field-level checks that need no database access.
pub fn clean_user_form(input: &UserFormInput, mode: UserFormMode) -> (CleanedUserForm, FormErrors) {
    let mut errors = FormErrors::new();

    let username = input.username.trim().to_string();
    if username.is_empty() {
        errors.add("username", "Username is required.");
    } else if username.chars().count() > USERNAME_MAX_LEN {
        errors.add(
            "username",
            format!("Ensure this value has at most {} characters.", USERNAME_MAX_LEN),
        );
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }

    let first_name = input.first_name.trim().to_string();
    let last_name = input.last_name.trim().to_string();
    if first_name.is_empty() || last_name.is_empty() {
        errors.add_non_field(FULL_NAME_REQUIRED);
    }

    let email = input.email.trim().to_string();
    if !email.is_empty() && !is_valid_email(&email) {
        errors.add("email", "Enter a valid email address.");
    }

    let password = match mode {
        UserFormMode::Create => {
            check_password_pair(
                &mut errors,
                "password",
                "confirm_password",
                &input.password,
                &input.confirm_password,
                "Password",
            );
            Some(input.password.clone())
        }
        UserFormMode::Update { .. } => None,
    };

    let address = input.address.trim();
    let profile = Profile {
        gender_id: parse_optional_id(&mut errors, "gender", &input.gender),
        address: (!address.is_empty()).then(|| address.to_string()),
        date_of_birth: parse_optional_date(&mut errors, "date_of_birth", &input.date_of_birth),
        phone_number: parse_required_integer(&mut errors, "phone_number", &input.phone_number),
    };

    let cleaned = CleanedUserForm {
        account: AccountFields {
            username,
            first_name,
            last_name,
            email,
        },
        password,
        profile,
    };

    (cleaned, errors)
}

/// Full validation of a user add/edit submission, including the uniqueness
/// and gender-reference checks. The outer error is an infrastructure failure;
/// the inner one carries the form errors to display.
pub async fn validate_user_form(
    db: Arc<Database>,
    input: &UserFormInput,
    mode: UserFormMode,
) -> Result<Result<CleanedUserForm, FormErrors>, BoxError> {
    let (cleaned, mut errors) = clean_user_form(input, mode);

    if !errors.has("username") {
        let exclude = match mode {
            UserFormMode::Create => None,
            UserFormMode::Update { user_id } => Some(user_id),
        };
        let users = UserRepository::new(db.clone());
        if users.username_taken(&cleaned.account.username, exclude).await? {
            errors.add("username", USERNAME_TAKEN);
        }
    }

    if let Some(gender_id) = cleaned.profile.gender_id {
        let genders = GenderRepository::new(db);
        if genders.find_by_id(gender_id).await?.is_none() {
            errors.add("gender", INVALID_CHOICE);
        }
    }

    Ok(errors.into_result().map(|()| cleaned))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> UserFormInput {
        UserFormInput {
            username: "grace".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: "grace@example.com".to_string(),
            password: "c0b0l-rules".to_string(),
            confirm_password: "c0b0l-rules".to_string(),
            gender: String::new(),
            address: "  ".to_string(),
            date_of_birth: "1906-12-09".to_string(),
            phone_number: "5550199".to_string(),
        }
    }

    #[test]
    fn test_valid_create_form() {
        let (cleaned, errors) = clean_user_form(&valid_input(), UserFormMode::Create);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(cleaned.password.as_deref(), Some("c0b0l-rules"));
        assert_eq!(cleaned.profile.address, None);
        assert_eq!(cleaned.profile.phone_number, Some(5550199));
    }

    #[test]
    fn test_create_rejects_password_mismatch() {
        let mut input = valid_input();
        input.confirm_password = "different".to_string();
        let (_, errors) = clean_user_form(&input, UserFormMode::Create);
        assert!(errors.has("password"));
        assert!(errors.has("confirm_password"));
    }

    #[test]
    fn test_update_ignores_password_fields() {
        let mut input = valid_input();
        input.password.clear();
        input.confirm_password = "leftover".to_string();
        let (cleaned, errors) = clean_user_form(&input, UserFormMode::Update { user_id: 1 });
        assert!(errors.is_empty());
        assert!(cleaned.password.is_none());
    }

    #[test]
    fn test_missing_names_is_non_field_error() {
        let mut input = valid_input();
        input.last_name = " ".to_string();
        let (_, errors) = clean_user_form(&input, UserFormMode::Create);
        assert_eq!(errors.non_field(), [FULL_NAME_REQUIRED.to_string()]);
    }

    #[test]
    fn test_username_rules() {
        let mut input = valid_input();
        input.username = String::new();
        let (_, errors) = clean_user_form(&input, UserFormMode::Create);
        assert_eq!(errors.field("username"), ["Username is required.".to_string()]);

        input.username = "has space".to_string();
        let (_, errors) = clean_user_form(&input, UserFormMode::Create);
        assert!(errors.has("username"));

        input.username = "a".repeat(USERNAME_MAX_LEN + 1);
        let (_, errors) = clean_user_form(&input, UserFormMode::Create);
        assert!(errors.has("username"));

        input.username = "first.last+tag@corp-1_x".to_string();
        let (_, errors) = clean_user_form(&input, UserFormMode::Create);
        assert!(!errors.has("username"));
    }

    #[test]
    fn test_bad_optional_fields() {
        let mut input = valid_input();
        input.email = "nope".to_string();
        input.gender = "x".to_string();
        input.date_of_birth = "yesterday".to_string();
        input.phone_number = String::new();
        let (_, errors) = clean_user_form(&input, UserFormMode::Create);
        assert!(errors.has("email"));
        assert_eq!(errors.field("gender"), [INVALID_CHOICE.to_string()]);
        assert!(errors.has("date_of_birth"));
        assert!(errors.has("phone_number"));
    }
}
