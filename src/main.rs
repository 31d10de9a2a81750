// src/main.rs

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use realm_academy::config::Config;
use realm_academy::realms::RealmRegistry;
use realm_academy::routes;
use realm_academy::services::{AttemptTracker, ChallengeService, GameEngine, TracingAnalytics};
use realm_academy::state::AppState;
use realm_academy::store::{CharacterStore, MemoryCharacterStore, PgCharacterStore};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration from environment (.env included)
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "realm-academy.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    // Realm content is validated here; bad catalogues stop the boot.
    let realms = Arc::new(RealmRegistry::with_default_realms()?);
    tracing::info!("{} realms registered", realms.list().len());

    let store = connect_store(&config).await?;

    let engine = GameEngine::new(store, realms)
        .with_analytics(Arc::new(TracingAnalytics))
        .with_analytics_timeout(config.analytics_timeout);
    let service = Arc::new(ChallengeService::new(
        Arc::new(engine),
        Arc::new(AttemptTracker::new()),
        config.attempt_max_age,
    ));
    let _sweeper = service.spawn_sweeper(config.sweep_interval);

    // Create AppState
    let state = AppState {
        service,
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start the server
    axum::serve(listener, app).await?;
    Ok(())
}

/// Postgres when `DATABASE_URL` is set (with retry and migrations), memory otherwise.
async fn connect_store(config: &Config) -> Result<Arc<dyn CharacterStore>, Box<dyn std::error::Error>> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, characters are kept in memory only");
        return Ok(Arc::new(MemoryCharacterStore::new()));
    };

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    return Err(format!("Failed to connect to database after 5 retries: {}", e).into());
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };
    tracing::info!("Database connected...");

    // Run Migrations Automatically
    let store = PgCharacterStore::new(pool);
    tracing::info!("Running migrations...");
    store.migrate().await?;
    tracing::info!("Migrations applied successfully.");

    Ok(Arc::new(store))
}
