use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::error;

use crate::database::BoxError;
use crate::session::{take_messages, FlashMessage};
use crate::users::User;

/// Shared chrome for every page: navigation state and pending flash messages.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub username: String,
    pub is_superuser: bool,
    pub messages: Vec<FlashMessage>,
}

impl PageContext {
    pub async fn load(session: &Session, user: Option<&User>) -> Result<Self, PageError> {
        Ok(Self {
            username: user.map(|u| u.username.clone()).unwrap_or_default(),
            is_superuser: user.map(|u| u.is_superuser).unwrap_or(false),
            messages: take_messages(session).await?,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        !self.username.is_empty()
    }
}

pub fn render<T: Template>(template: &T) -> Html<String> {
    Html(
        template
            .render()
            .unwrap_or_else(|_| "Template render error".to_string()),
    )
}

#[derive(Debug)]
pub enum PageError {
    /// Anonymous or unauthorised visitor; carries the path to return to.
    LoginRequired(String),
    NotFound,
    Internal(String),
}

impl From<BoxError> for PageError {
    fn from(e: BoxError) -> Self {
        PageError::Internal(e.to_string())
    }
}

impl From<tower_sessions::session::Error> for PageError {
    fn from(e: tower_sessions::session::Error) -> Self {
        PageError::Internal(format!("Session error: {}", e))
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub title: String,
    pub ctx: PageContext,
    pub heading: String,
    pub detail: String,
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, heading, detail) = match self {
            PageError::LoginRequired(next) => {
                return Redirect::to(&login_url(&next)).into_response();
            }
            PageError::NotFound => (
                StatusCode::NOT_FOUND,
                "Not Found",
                "The requested resource was not found on this server.".to_string(),
            ),
            PageError::Internal(msg) => {
                error!("Request failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server Error",
                    "Something went wrong while handling your request.".to_string(),
                )
            }
        };

        let template = ErrorTemplate {
            title: format!("{} - Account Admin", heading),
            ctx: PageContext::default(),
            heading: heading.to_string(),
            detail,
        };

        (status, render(&template)).into_response()
    }
}

pub fn login_url(next: &str) -> String {
    if next.is_empty() {
        "/login/".to_string()
    } else {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("next", next)
            .finish();
        format!("/login/?{}", query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_url_keeps_next_path() {
        assert_eq!(login_url(""), "/login/");
        assert_eq!(login_url("/user/list/"), "/login/?next=%2Fuser%2Flist%2F");
        assert_eq!(
            login_url("/user/list/?a=1"),
            "/login/?next=%2Fuser%2Flist%2F%3Fa%3D1"
        );
    }
}
