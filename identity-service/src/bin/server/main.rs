use std::sync::Arc;

use auth::Authenticator;
use identity_service::config::Config;
use identity_service::domain::auth::ports::AuthRepository;
use identity_service::domain::auth::service::AuthService;
use identity_service::domain::identity::seed;
use identity_service::domain::identity::seed::ServiceAccount;
use identity_service::inbound::http::router::create_router;
use identity_service::outbound::repositories::InMemoryAuthRepository;
use identity_service::outbound::repositories::PostgresAuthRepository;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "identity_service=debug,auth=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        in_memory = config.database.in_memory,
        jwt_issuer = %config.jwt.issuer,
        jwt_algorithm = %config.jwt.algorithm,
        access_token_minutes = config.jwt.access_token_minutes,
        cors_origins = %config.cors.allowed_origins,
        "Configuration loaded"
    );

    let authenticator = Arc::new(Authenticator::new(&config.jwt)?);

    if config.database.in_memory {
        tracing::warn!("Using in-memory storage, data is lost on shutdown");
        let repository = Arc::new(InMemoryAuthRepository::new());
        return run(repository, authenticator, &config).await;
    }

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let repository = Arc::new(PostgresAuthRepository::new(pg_pool));
    run(repository, authenticator, &config).await
}

async fn run<R: AuthRepository>(
    repository: Arc<R>,
    authenticator: Arc<Authenticator>,
    config: &Config,
) -> Result<(), anyhow::Error> {
    seed::ensure_default_roles(repository.as_ref()).await;

    if let Some(account) = &config.service_account {
        let account = ServiceAccount::parse(&account.username, &account.email, &account.password)?;
        if let Err(e) =
            seed::ensure_service_account(repository.as_ref(), &authenticator, &account).await
        {
            tracing::error!(error = %e, "Failed to ensure service account");
        }
    }

    let auth_service = Arc::new(AuthService::new(repository, authenticator));

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(auth_service, &config.cors);
    axum::serve(http_listener, http_application)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server exited successfully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
