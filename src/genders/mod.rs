pub mod handlers;
pub mod models;
pub mod repository;
pub mod templates;

pub use handlers::{gender_add_submit, gender_delete_submit, gender_edit_submit};
pub use models::{Gender, GenderFormInput};
pub use repository::GenderRepository;
pub use templates::{gender_add_page, gender_delete_page, gender_edit_page, gender_list_page};
