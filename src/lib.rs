use axum::{
    extract::State,
    http::StatusCode,
    response::Redirect,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tower_sessions::{cookie::time, Expiry, MemoryStore, SessionManagerLayer};
use tracing::warn;

pub mod config;
pub mod database;
pub mod forms;
pub mod genders;
pub mod mail;
pub mod pagination;
pub mod passwords;
pub mod session;
pub mod templates;
pub mod users;

pub use config::AppConfig;
pub use database::Database;
pub use mail::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<AppConfig>,
    /// Shared by every router built from this state.
    pub sessions: MemoryStore,
    pub mailer: Mailer,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Arc<AppConfig>, mailer: Mailer) -> Self {
        Self {
            db,
            config,
            sessions: MemoryStore::default(),
            mailer,
        }
    }
}

pub async fn create_router(app_state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(app_state.sessions.clone())
        .with_secure(app_state.config.is_production())
        .with_expiry(Expiry::OnInactivity(time::Duration::days(1)));

    Router::new()
        .route("/", get(|| async { Redirect::to(users::handlers::DEFAULT_LANDING) }))
        .route("/health", get(health_handler))
        // Authentication
        .route("/login/", get(users::login_page).post(users::login_submit))
        .route("/logout/", get(users::logout).post(users::logout))
        // Users
        .route("/user/list/", get(users::user_list_page))
        .route("/user/add/", get(users::user_add_page).post(users::user_add_submit))
        .route(
            "/user/edit/:id/",
            get(users::user_edit_page).post(users::user_edit_submit),
        )
        .route(
            "/user/delete/:id/",
            get(users::user_delete_page).post(users::user_delete_submit),
        )
        .route(
            "/user/profile/edit/",
            get(users::profile_edit_page).post(users::profile_edit_submit),
        )
        // Passwords
        .route(
            "/user/change_password/",
            get(passwords::change_password_page).post(passwords::change_password_submit),
        )
        .route(
            "/user/change_password/success/",
            get(passwords::change_password_success_page),
        )
        .route(
            "/user/admin_change_password/:id/",
            get(passwords::admin_change_password_page)
                .post(passwords::admin_change_password_submit),
        )
        .route(
            "/password_reset/confirm/:uidb64/:token/",
            get(passwords::password_reset_confirm_page)
                .post(passwords::password_reset_confirm_submit),
        )
        // Genders
        .route("/gender/list/", get(genders::gender_list_page))
        .route(
            "/gender/add/",
            get(genders::gender_add_page).post(genders::gender_add_submit),
        )
        .route(
            "/gender/edit/:id/",
            get(genders::gender_edit_page).post(genders::gender_edit_submit),
        )
        .route(
            "/gender/delete/:id/",
            get(genders::gender_delete_page).post(genders::gender_delete_submit),
        )
        .nest_service("/static", ServeDir::new("static"))
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(session_layer)
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
}

async fn health_handler(State(state): State<AppState>) -> Result<&'static str, StatusCode> {
    match state.db.health_check().await {
        Ok(_) => Ok("OK"),
        Err(e) => {
            warn!("Health check failed: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
