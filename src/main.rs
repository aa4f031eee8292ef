use sharebite_server::{
    AppState,
    auth::verifier_from_config,
    config::{AppConfig, AuthProvider, Env},
    create_router,
    repository::{PostgresRepository, Repository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initialises logging, connects the store, then serves HTTP until
/// Ctrl-C.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sharebite_server=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Store
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    if config.env == Env::Local {
        repo.ensure_schema()
            .await
            .expect("FATAL: Failed to create tables in the local database.");
    }

    repo.ping()
        .await
        .expect("FATAL: Database did not answer ping.");
    tracing::info!("Database ping successful.");

    // 4. Identity verification
    let verifier = verifier_from_config(&config);
    tracing::info!(provider = %auth_provider_name(&config), "Identity verifier ready.");

    // 5. Router and server
    let port = config.port;
    let app = create_router(AppState { repo, verifier });

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("FATAL: Failed to bind HTTP port.");

    tracing::info!("Listening on 0.0.0.0:{}", port);
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{}/swagger-ui", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");

    tracing::info!("Server stopped.");
}

fn auth_provider_name(config: &AppConfig) -> &'static str {
    match config.auth {
        AuthProvider::SharedSecret { .. } => "jwt",
        AuthProvider::Firebase { .. } => "firebase",
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutting down...");
}
