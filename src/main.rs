use anyhow::{Context, Result};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use study_aid::{
    api::{AppState, create_router},
    config::{Config, LoggingConfig},
    log_api_success, log_system_event,
    session::SessionStore,
};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    // Initialize logging with optional console and file output
    let _guard = setup_logging(&config.logging)?;
    config.log_configuration_summary();
    config.validate()?;

    log_system_event!(startup, component = "server", "Starting study aid server");

    let llm_service = config.build_llm_service()?;
    info!(
        provider = llm_service.provider_name(),
        models = %config.llm.models.join(" -> "),
        "Initialized LLM service with fallback chain"
    );

    let sessions = SessionStore::new(config.session.ttl_minutes);
    spawn_session_cleanup(sessions.clone());

    let state = AppState::new(llm_service, sessions);

    let app = create_router(state).layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    log_system_event!(shutdown, component = "server", "Server stopped");
    Ok(())
}

/// Purges idle sessions in the background
fn spawn_session_cleanup(sessions: SessionStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sessions.cleanup_expired().await;
            if removed > 0 {
                log_api_success!("session_cleanup", count = removed, "expired sessions purged");
            }
        }
    });
}

fn setup_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::fmt;

    let env_filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = logging.console_enabled.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
    });

    // File output (no ANSI colors for files) with daily rotation
    let (file_layer, guard) = if logging.file_enabled {
        std::fs::create_dir_all(&logging.log_directory)
            .with_context(|| format!("Could not create log directory '{}'", logging.log_directory))?;
        let file_appender = tracing_appender::rolling::daily(&logging.log_directory, "study-aid.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(non_blocking_file);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!(
        directory = %logging.log_directory,
        file_enabled = logging.file_enabled,
        console_enabled = logging.console_enabled,
        "Logging initialized"
    );

    Ok(guard)
}
