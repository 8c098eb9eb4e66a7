use axum::{
    extract::{Path, State},
    http::Uri,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use tower_sessions::Session;
use tracing::info;

use crate::genders::models::GenderFormInput;
use crate::genders::repository::GenderRepository;
use crate::genders::templates::GenderFormTemplate;
use crate::session::{flash, require_login, MessageLevel};
use crate::templates::{render, PageContext, PageError};
use crate::AppState;

pub async fn gender_add_submit(
    session: Session,
    State(state): State<AppState>,
    uri: Uri,
    Form(input): Form<GenderFormInput>,
) -> Result<Response, PageError> {
    let user = require_login(&session, &state, uri.path()).await?;

    let name = match input.clean() {
        Ok(name) => name,
        Err(errors) => {
            let ctx = PageContext::load(&session, Some(&user)).await?;
            return Ok(render(&GenderFormTemplate::add(ctx, input.name, errors)).into_response());
        }
    };

    let gender = GenderRepository::new(state.db.clone()).create(name).await?;
    info!(gender_id = gender.id, name = %gender.name, "Gender added");

    flash(&session, MessageLevel::Success, "Gender added successfully.").await?;
    Ok(Redirect::to("/gender/list/").into_response())
}

pub async fn gender_edit_submit(
    session: Session,
    State(state): State<AppState>,
    Path(gender_id): Path<i64>,
    uri: Uri,
    Form(input): Form<GenderFormInput>,
) -> Result<Response, PageError> {
    let user = require_login(&session, &state, uri.path()).await?;

    let repo = GenderRepository::new(state.db.clone());
    repo.find_by_id(gender_id).await?.ok_or(PageError::NotFound)?;

    let name = match input.clean() {
        Ok(name) => name,
        Err(errors) => {
            let ctx = PageContext::load(&session, Some(&user)).await?;
            return Ok(
                render(&GenderFormTemplate::edit(ctx, gender_id, input.name, errors))
                    .into_response(),
            );
        }
    };

    if !repo.update(gender_id, name).await? {
        return Err(PageError::NotFound);
    }
    info!(gender_id, "Gender updated");

    Ok(Redirect::to("/gender/list/").into_response())
}

pub async fn gender_delete_submit(
    session: Session,
    State(state): State<AppState>,
    Path(gender_id): Path<i64>,
    uri: Uri,
) -> Result<Response, PageError> {
    require_login(&session, &state, uri.path()).await?;

    if !GenderRepository::new(state.db.clone()).delete(gender_id).await? {
        return Err(PageError::NotFound);
    }
    info!(gender_id, "Gender deleted");

    flash(&session, MessageLevel::Success, "Gender deleted successfully.").await?;
    Ok(Redirect::to("/gender/list/").into_response())
}
