use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Uri},
    response::{Html, IntoResponse, Response},
    Json,
};
use tower_sessions::Session;

use crate::forms::FormErrors;
use crate::genders::{Gender, GenderRepository};
use crate::pagination::{Page, DEFAULT_PAGE_SIZE};
use crate::session::{current_user, require_login};
use crate::templates::{render, PageContext, PageError};
use crate::users::models::{
    LoginQuery, User, UserFormInput, UserListItem, UserListQuery, UserListResponse,
};
use crate::users::repository::UserRepository;
use crate::AppState;

#[derive(Template)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub title: String,
    pub ctx: PageContext,
    pub error: bool,
    pub next: String,
}

pub async fn login_page(
    session: Session,
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Html<String>, PageError> {
    let user = current_user(&session, &state).await?;

    let template = LoginTemplate {
        title: "Login - Account Admin".to_string(),
        ctx: PageContext::load(&session, user.as_ref()).await?,
        error: query.error.is_some(),
        next: query.next.unwrap_or_default(),
    };

    Ok(render(&template))
}

#[derive(Template)]
#[template(path = "users/list.html")]
pub struct UserListTemplate {
    pub title: String,
    pub ctx: PageContext,
    pub users: Vec<UserListItem>,
    pub page: Page,
    pub search_query: String,
    /// `search` already encoded for use in pagination links.
    pub search_param: String,
}

fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
        .unwrap_or(false)
}

/// User listing with search and pagination; answers AJAX requests with JSON.
pub async fn user_list_page(
    session: Session,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, PageError> {
    let user = require_login(&session, &state, uri.path()).await?;

    let repo = UserRepository::new(state.db.clone());
    let search = query.search;
    let total = repo.count_matching(&search).await?;
    let page = Page::resolve(query.page.as_deref(), total, DEFAULT_PAGE_SIZE);
    let users: Vec<UserListItem> = repo
        .search_page(&search, page.offset(), page.limit())
        .await?
        .into_iter()
        .map(UserListItem::from)
        .collect();

    if is_ajax(&headers) {
        return Ok(Json(UserListResponse {
            users,
            has_previous: page.has_previous(),
            has_next: page.has_next(),
            previous_page_number: page.previous_page_number(),
            next_page_number: page.next_page_number(),
            current_page: page.number,
            num_pages: page.num_pages,
        })
        .into_response());
    }

    let search_param: String = url::form_urlencoded::byte_serialize(search.as_bytes()).collect();
    let template = UserListTemplate {
        title: "Users - Account Admin".to_string(),
        ctx: PageContext::load(&session, Some(&user)).await?,
        users,
        page,
        search_query: search,
        search_param,
    };

    Ok(render(&template).into_response())
}

#[derive(Debug, Clone)]
pub struct GenderOption {
    pub id: i64,
    pub name: String,
    pub selected: bool,
}

pub fn gender_options(genders: Vec<Gender>, selected: &str) -> Vec<GenderOption> {
    let selected = selected.trim();
    genders
        .into_iter()
        .map(|g| GenderOption {
            selected: g.id.to_string() == selected,
            id: g.id,
            name: g.name,
        })
        .collect()
}

#[derive(Template)]
#[template(path = "users/form.html")]
pub struct UserFormTemplate {
    pub title: String,
    pub ctx: PageContext,
    pub heading: String,
    pub action: String,
    pub input: UserFormInput,
    pub errors: FormErrors,
    pub genders: Vec<GenderOption>,
    pub with_password: bool,
}

/// Which user form is being shown; decides heading, target and password fields.
#[derive(Debug, Clone, Copy)]
pub enum UserFormKind {
    Add,
    Edit(i64),
    Profile,
}

impl UserFormTemplate {
    pub async fn build(
        state: &AppState,
        ctx: PageContext,
        kind: UserFormKind,
        input: UserFormInput,
        errors: FormErrors,
    ) -> Result<Self, PageError> {
        let genders = GenderRepository::new(state.db.clone()).list().await?;
        let (heading, action) = match kind {
            UserFormKind::Add => ("Add User", "/user/add/".to_string()),
            UserFormKind::Edit(id) => ("Edit User", format!("/user/edit/{}/", id)),
            UserFormKind::Profile => ("Edit Profile", "/user/profile/edit/".to_string()),
        };

        Ok(Self {
            title: format!("{} - Account Admin", heading),
            ctx,
            heading: heading.to_string(),
            action,
            genders: gender_options(genders, &input.gender),
            input,
            errors,
            with_password: matches!(kind, UserFormKind::Add),
        })
    }
}

pub async fn user_add_page(
    session: Session,
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Html<String>, PageError> {
    let user = require_login(&session, &state, uri.path()).await?;
    let ctx = PageContext::load(&session, Some(&user)).await?;

    let template = UserFormTemplate::build(
        &state,
        ctx,
        UserFormKind::Add,
        UserFormInput::default(),
        FormErrors::new(),
    )
    .await?;

    Ok(render(&template))
}

pub async fn user_edit_page(
    session: Session,
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    uri: Uri,
) -> Result<Html<String>, PageError> {
    let user = require_login(&session, &state, uri.path()).await?;

    let details = UserRepository::new(state.db.clone())
        .find_details(user_id)
        .await?
        .ok_or(PageError::NotFound)?;

    let ctx = PageContext::load(&session, Some(&user)).await?;
    let template = UserFormTemplate::build(
        &state,
        ctx,
        UserFormKind::Edit(user_id),
        UserFormInput::from_details(&details),
        FormErrors::new(),
    )
    .await?;

    Ok(render(&template))
}

pub async fn profile_edit_page(
    session: Session,
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Html<String>, PageError> {
    let user = require_login(&session, &state, uri.path()).await?;

    let details = UserRepository::new(state.db.clone())
        .find_details(user.id)
        .await?
        .ok_or(PageError::NotFound)?;

    let ctx = PageContext::load(&session, Some(&user)).await?;
    let template = UserFormTemplate::build(
        &state,
        ctx,
        UserFormKind::Profile,
        UserFormInput::from_details(&details),
        FormErrors::new(),
    )
    .await?;

    Ok(render(&template))
}

#[derive(Template)]
#[template(path = "users/confirm_delete.html")]
pub struct UserDeleteTemplate {
    pub title: String,
    pub ctx: PageContext,
    pub user: User,
}

pub async fn user_delete_page(
    session: Session,
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    uri: Uri,
) -> Result<Html<String>, PageError> {
    let current = require_login(&session, &state, uri.path()).await?;

    let user = UserRepository::new(state.db.clone())
        .find_by_id(user_id)
        .await?
        .ok_or(PageError::NotFound)?;

    let template = UserDeleteTemplate {
        title: "Delete User - Account Admin".to_string(),
        ctx: PageContext::load(&session, Some(&current)).await?,
        user,
    };

    Ok(render(&template))
}
