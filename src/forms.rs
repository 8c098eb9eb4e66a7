//! Field-scoped validation errors shared by every HTML form.
//!
//! Errors accumulate instead of short-circuiting so a submitted form can be
//! re-rendered with every problem shown next to its field.

use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const REQUIRED: &str = "This field is required.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
    non_field: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        let message = message.into();
        let entry = self.fields.entry(field.to_string()).or_default();
        if !entry.contains(&message) {
            entry.push(message);
        }
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Messages attached to `field`, empty when the field is valid.
    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Checks that `password` and `confirm` are both present and equal, reporting
/// on both fields the way every password form in the application does.
pub fn check_password_pair(
    errors: &mut FormErrors,
    password_field: &str,
    confirm_field: &str,
    password: &str,
    confirm: &str,
    label: &str,
) {
    if password.is_empty() || confirm.is_empty() {
        errors.add(password_field, format!("{} is required.", label));
        errors.add(confirm_field, "Confirm Password is required.");
    }

    if password != confirm {
        let message = format!("{} and Confirm Password do not match.", label);
        errors.add(password_field, message.clone());
        errors.add(confirm_field, message);
    }
}

/// Parses an optional `YYYY-MM-DD` date input. Blank input is `Ok(None)`.
pub fn parse_optional_date(
    errors: &mut FormErrors,
    field: &str,
    raw: &str,
) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(field, "Enter a valid date.");
            None
        }
    }
}

/// Parses a required whole number input.
pub fn parse_required_integer(errors: &mut FormErrors, field: &str, raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }
    match raw.parse::<i64>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(field, "Enter a whole number.");
            None
        }
    }
}

/// Parses an optional foreign-key select. Blank means "no selection".
pub fn parse_optional_id(errors: &mut FormErrors, field: &str, raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<i64>() {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add(field, INVALID_CHOICE);
            None
        }
    }
}

pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

pub fn is_valid_email(email: &str) -> bool {
    // Must have exactly one @ separating local and domain parts
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || !domain.contains('.') {
        return false;
    }

    // Check domain has valid structure (at least "x.x" format)
    let domain_parts: Vec<&str> = domain.split('.').collect();
    domain_parts.len() >= 2 && domain_parts.iter().all(|part| !part.is_empty())
}
