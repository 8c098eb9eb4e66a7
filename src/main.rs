use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use account_admin::{
    config::AppConfig,
    create_router,
    database::{BoxError, Database},
    mail::Mailer,
    users::{AccountFields, NewUser, Profile, UserRepository},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,tower_http=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);
    info!(environment = %config.environment, "Configuration loaded successfully");

    // Initialize database
    let db = Arc::new(Database::new(&config.database_url).await?);
    info!("Database initialized successfully");

    // Run migrations
    db.migrate().await?;
    info!("Database migrations completed");

    bootstrap_superuser(&db, &config).await?;

    let mailer = Mailer::from_config(&config)?;
    let app_state = AppState::new(db, config.clone(), mailer);

    let app = create_router(app_state).await;

    let listener = TcpListener::bind(&config.server_address).await?;
    info!("Server starting on {}", config.server_address);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Creates the configured superuser on first start so there is someone to log in as.
async fn bootstrap_superuser(db: &Arc<Database>, config: &AppConfig) -> Result<(), BoxError> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    let repo = UserRepository::new(db.clone());
    if repo.find_by_username(username).await?.is_some() {
        return Ok(());
    }

    let user = repo
        .create_user(NewUser {
            account: AccountFields {
                username: username.clone(),
                first_name: "Admin".to_string(),
                last_name: "User".to_string(),
                email: String::new(),
            },
            password: password.clone(),
            is_superuser: true,
            profile: Profile::default(),
        })
        .await?;
    info!(user_id = user.id, username = %user.username, "Created initial superuser");

    Ok(())
}
