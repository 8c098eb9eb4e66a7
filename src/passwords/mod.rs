pub mod change;
pub mod handlers;
pub mod reset;
pub mod templates;

pub use change::{ChangePasswordInput, PendingPasswordChange};
pub use handlers::{admin_change_password_submit, change_password_submit, password_reset_confirm_submit};
pub use reset::{request_password_reset, ResetTokenGenerator};
pub use templates::{
    admin_change_password_page, change_password_page, change_password_success_page,
    password_reset_confirm_page,
};
