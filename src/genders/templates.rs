use askama::Template;
use axum::{
    extract::{Path, State},
    http::Uri,
    response::Html,
};
use tower_sessions::Session;

use crate::forms::FormErrors;
use crate::genders::models::Gender;
use crate::genders::repository::GenderRepository;
use crate::session::require_login;
use crate::templates::{render, PageContext, PageError};
use crate::AppState;

#[derive(Template)]
#[template(path = "genders/list.html")]
pub struct GenderListTemplate {
    pub title: String,
    pub ctx: PageContext,
    pub genders: Vec<Gender>,
}

#[derive(Template)]
#[template(path = "genders/form.html")]
pub struct GenderFormTemplate {
    pub title: String,
    pub ctx: PageContext,
    pub heading: String,
    pub action: String,
    pub name: String,
    pub errors: FormErrors,
}

impl GenderFormTemplate {
    pub fn add(ctx: PageContext, name: String, errors: FormErrors) -> Self {
        Self {
            title: "Add Gender - Account Admin".to_string(),
            ctx,
            heading: "Add Gender".to_string(),
            action: "/gender/add/".to_string(),
            name,
            errors,
        }
    }

    pub fn edit(ctx: PageContext, id: i64, name: String, errors: FormErrors) -> Self {
        Self {
            title: "Edit Gender - Account Admin".to_string(),
            ctx,
            heading: "Edit Gender".to_string(),
            action: format!("/gender/edit/{}/", id),
            name,
            errors,
        }
    }
}

#[derive(Template)]
#[template(path = "genders/confirm_delete.html")]
pub struct GenderDeleteTemplate {
    pub title: String,
    pub ctx: PageContext,
    pub gender: Gender,
}

pub async fn gender_list_page(
    session: Session,
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Html<String>, PageError> {
    let user = require_login(&session, &state, uri.path()).await?;

    let genders = GenderRepository::new(state.db.clone()).list().await?;

    let template = GenderListTemplate {
        title: "Genders - Account Admin".to_string(),
        ctx: PageContext::load(&session, Some(&user)).await?,
        genders,
    };

    Ok(render(&template))
}

pub async fn gender_add_page(
    session: Session,
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Html<String>, PageError> {
    let user = require_login(&session, &state, uri.path()).await?;
    let ctx = PageContext::load(&session, Some(&user)).await?;

    Ok(render(&GenderFormTemplate::add(ctx, String::new(), FormErrors::new())))
}

pub async fn gender_edit_page(
    session: Session,
    State(state): State<AppState>,
    Path(gender_id): Path<i64>,
    uri: Uri,
) -> Result<Html<String>, PageError> {
    let user = require_login(&session, &state, uri.path()).await?;

    let gender = GenderRepository::new(state.db.clone())
        .find_by_id(gender_id)
        .await?
        .ok_or(PageError::NotFound)?;

    let ctx = PageContext::load(&session, Some(&user)).await?;
    Ok(render(&GenderFormTemplate::edit(
        ctx,
        gender.id,
        gender.name,
        FormErrors::new(),
    )))
}

pub async fn gender_delete_page(
    session: Session,
    State(state): State<AppState>,
    Path(gender_id): Path<i64>,
    uri: Uri,
) -> Result<Html<String>, PageError> {
    let user = require_login(&session, &state, uri.path()).await?;

    let gender = GenderRepository::new(state.db.clone())
        .find_by_id(gender_id)
        .await?
        .ok_or(PageError::NotFound)?;

    let template = GenderDeleteTemplate {
        title: "Delete Gender - Account Admin".to_string(),
        ctx: PageContext::load(&session, Some(&user)).await?,
        gender,
    };

    Ok(render(&template))
}
