pub mod auth;
pub mod forms;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod templates;

pub use handlers::{
    login_submit, logout, profile_edit_submit, user_add_submit, user_delete_submit,
    user_edit_submit,
};
pub use models::{
    AccountFields, NewUser, Profile, User, UserDetails, UserListItem, UserListResponse,
};
pub use repository::UserRepository;
pub use templates::{
    login_page, profile_edit_page, user_add_page, user_delete_page, user_edit_page,
    user_list_page,
};
