use serde::{Deserialize, Serialize};

use crate::forms::{FormErrors, REQUIRED};

pub const GENDER_NAME_MAX_LEN: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gender {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenderFormInput {
    pub name: String,
}

impl GenderFormInput {
    /// Returns the trimmed name, or the field errors to display.
    pub fn clean(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let name = self.name.trim();

        if name.is_empty() {
            errors.add("name", REQUIRED);
        } else if name.chars().count() > GENDER_NAME_MAX_LEN {
            errors.add(
                "name",
                format!("Ensure this value has at most {} characters.", GENDER_NAME_MAX_LEN),
            );
        }

        errors.into_result().map(|()| name.to_string())
    }
}
