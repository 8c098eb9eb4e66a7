use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_superuser: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Extended per-user attributes, one row per user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub gender_id: Option<i64>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub phone_number: Option<i64>,
}

/// A user joined with its profile and the profile's gender name.
#[derive(Debug, Clone)]
pub struct UserDetails {
    pub user: User,
    pub profile: Profile,
    pub gender_name: Option<String>,
}

/// Validated account fields written by the add and edit forms.
#[derive(Debug, Clone)]
pub struct AccountFields {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub account: AccountFields,
    pub password: String,
    pub is_superuser: bool,
    pub profile: Profile,
}

/// Raw `application/x-www-form-urlencoded` body of the user add/edit forms.
///
/// Every field is a string so a rejected submission can be echoed back
/// exactly as typed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserFormInput {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub gender: String,
    pub address: String,
    pub date_of_birth: String,
    pub phone_number: String,
}

impl UserFormInput {
    pub fn from_details(details: &UserDetails) -> Self {
        Self {
            username: details.user.username.clone(),
            first_name: details.user.first_name.clone(),
            last_name: details.user.last_name.clone(),
            email: details.user.email.clone(),
            password: String::new(),
            confirm_password: String::new(),
            gender: details
                .profile
                .gender_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            address: details.profile.address.clone().unwrap_or_default(),
            date_of_birth: details
                .profile
                .date_of_birth
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            phone_number: details
                .profile
                .phone_number
                .map(|n| n.to_string())
                .unwrap_or_default(),
        }
    }
}

/// Row of the AJAX user listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListItem {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: String,
    pub address: String,
    pub date_of_birth: String,
}

impl From<UserDetails> for UserListItem {
    fn from(details: UserDetails) -> Self {
        Self {
            id: details.user.id,
            username: details.user.username,
            first_name: details.user.first_name,
            last_name: details.user.last_name,
            email: details.user.email,
            gender: details.gender_name.unwrap_or_default(),
            address: details.profile.address.unwrap_or_default(),
            date_of_birth: details
                .profile
                .date_of_birth
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<UserListItem>,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<u32>,
    pub next_page_number: Option<u32>,
    pub current_page: u32,
    pub num_pages: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    #[serde(default)]
    pub search: String,
    pub page: Option<String>,
}

/// Body of the login page, which hosts both the login and the
/// forgot-password forms.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub form_type: String,
    pub username: String,
    pub password: String,
    pub username_or_email: String,
    pub next: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
    pub next: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> UserDetails {
        UserDetails {
            user: User {
                id: 7,
                username: "ada".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "hash".to_string(),
                is_superuser: false,
                last_login: None,
                date_joined: Utc::now(),
            },
            profile: Profile {
                gender_id: Some(2),
                address: None,
                date_of_birth: NaiveDate::from_ymd_opt(1815, 12, 10),
                phone_number: Some(5550100),
            },
            gender_name: Some("Female".to_string()),
        }
    }

    #[test]
    fn test_list_item_blanks_missing_profile_values() {
        let item = UserListItem::from(details());
        assert_eq!(item.gender, "Female");
        assert_eq!(item.address, "");
        assert_eq!(item.date_of_birth, "1815-12-10");
    }

    #[test]
    fn test_form_input_prefills_from_details() {
        let input = UserFormInput::from_details(&details());
        assert_eq!(input.username, "ada");
        assert_eq!(input.gender, "2");
        assert_eq!(input.phone_number, "5550100");
        assert!(input.password.is_empty());
    }

    #[test]
    fn test_full_name() {
        assert_eq!(details().user.full_name(), "Ada Lovelace");
    }
}
