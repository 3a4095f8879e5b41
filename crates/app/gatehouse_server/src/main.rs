//! Gatehouse API server binary.
//!
//! Authenticates every call, serves session reads and runs approved
//! one-time reviews against the configured connection commands.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use gatehouse_api::config::ApiConfig;
use gatehouse_core::auth::Profile;
use gatehouse_core::auth::agents::PgAgentStore;
use gatehouse_core::auth::client_keys::PgClientKeyStore;
use gatehouse_core::auth::jwt::resolve_jwt_secret;
use gatehouse_core::auth::users::PgUserStore;
use gatehouse_core::exec::ProcessExecClientFactory;
use gatehouse_core::store::pg::PgStore;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use url::Url;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "gatehouse_server", about = "Gatehouse API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8009")]
    bind_addr: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/gatehouse"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Deployment profile: `production` or `development`.
    #[arg(long, env = "GATEHOUSE_PROFILE", default_value = "production")]
    profile: Profile,

    /// Internal admin key (`x-adm-...`). Admin calls are refused when unset.
    #[arg(long, env = "GATEHOUSE_ADMIN_KEY", hide_env_values = true)]
    admin_key: Option<String>,

    /// OIDC userinfo endpoint used to exchange user access tokens. When
    /// unset, tokens are verified locally with the JWT secret.
    #[arg(long, env = "GATEHOUSE_USERINFO_URL")]
    userinfo_url: Option<Url>,

    /// Seconds an exec call waits for the command before answering 202.
    #[arg(long, env = "GATEHOUSE_EXEC_DEADLINE_SECS", default_value_t = 50)]
    exec_deadline_secs: u64,

    /// JSON file mapping connection names to `{command, args}`.
    #[arg(long, env = "GATEHOUSE_CONNECTIONS")]
    connections: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,gatehouse_api=debug,gatehouse_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    info!(
        bind_addr = %args.bind_addr,
        profile = ?args.profile,
        max_connections = args.max_connections,
        "starting gatehouse_server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&args.database_url)
        .await?;

    // Run database migrations.
    info!("running database migrations");
    gatehouse_api::migrate(&pool).await?;

    let config = ApiConfig {
        bind_addr: args.bind_addr,
        profile: args.profile,
        jwt_secret: resolve_jwt_secret(),
        admin_key: args.admin_key,
        userinfo_url: args.userinfo_url,
        exec_deadline: Duration::from_secs(args.exec_deadline_secs),
    };

    let authenticator = config.authenticator(
        Arc::new(PgAgentStore::new(pool.clone())),
        Arc::new(PgClientKeyStore::new(pool.clone())),
        Arc::new(PgUserStore::new(pool.clone())),
    );

    let clients = match &args.connections {
        Some(path) => ProcessExecClientFactory::from_file(path)?,
        None => {
            warn!("no connections file given, every exec will fail to open a client");
            ProcessExecClientFactory::default()
        }
    };

    let store = Arc::new(PgStore::new(pool.clone()));
    let gate = config.exec_gate(store.clone(), store.clone(), store.clone(), Arc::new(clients));

    let state = gatehouse_api::AppState {
        authenticator: Arc::new(authenticator),
        sessions: store.clone(),
        reviews: store,
        gate: Arc::new(gate),
    };

    let app = gatehouse_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}
