//! studio-payments server entry point.
//!
//! Loads configuration, wires the ledger, payment clients and email
//! sender, and starts the Axum HTTP server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use studio_payments::api;
use studio_payments::api::middleware::AdminCredentials;
use studio_payments::app_state::{AppState, Dependencies};
use studio_payments::card::{CardProcessor, StripeClient};
use studio_payments::config::StudioConfig;
use studio_payments::gateway::transport::{GatewayTransport, HttpTransport};
use studio_payments::gateway::{Credentials, Environment, GatewayClient};
use studio_payments::notify::{LogSender, NotificationSender, ResendSender};
use studio_payments::persistence::{InMemoryLedger, LedgerStore, PostgresLedger};

fn init_tracing(format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn open_ledger(config: &StudioConfig) -> anyhow::Result<(Arc<dyn LedgerStore>, &'static str)> {
    if !config.persistence_enabled {
        tracing::warn!("persistence disabled; deposits are kept in memory only");
        return Ok((Arc::new(InMemoryLedger::new()), "memory"));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("connecting to PostgreSQL")?;
    let ledger = PostgresLedger::new(pool);
    ledger.migrate().await.context("running migrations")?;
    tracing::info!("ledger migrations applied");
    Ok((Arc::new(ledger), "postgres"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = StudioConfig::from_env()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    init_tracing(&config.log_format);
    tracing::info!(addr = %config.listen_addr, ?config, "starting studio-payments");

    let timeout = Duration::from_secs(config.request_timeout_secs);
    let (ledger, ledger_backend) = open_ledger(&config).await?;

    // Order gateway
    let environment = Environment::from_setting(&config.gateway_environment);
    let credentials = match (&config.gateway_consumer_key, &config.gateway_consumer_secret) {
        (Some(key), Some(secret)) => Some(Credentials {
            consumer_key: key.clone(),
            consumer_secret: secret.clone(),
        }),
        _ => {
            tracing::warn!("order gateway credentials not set; checkout will fail");
            None
        }
    };
    let transport: Arc<dyn GatewayTransport> =
        Arc::new(HttpTransport::new(environment.base_url(), timeout)?);
    let gateway = Arc::new(GatewayClient::new(
        transport,
        credentials,
        environment,
        config.notification_url(),
        chrono::Duration::minutes(config.gateway_token_margin_minutes),
    ));

    // Card processor
    let card: Option<Arc<dyn CardProcessor>> = match &config.card_secret_key {
        Some(secret) => Some(Arc::new(StripeClient::new(secret.clone(), timeout)?)),
        None => None,
    };
    if config.card_webhook_secret.is_none() {
        tracing::warn!("card webhook secret not set; card webhooks will be rejected");
    }

    // Email
    let sender: Arc<dyn NotificationSender> = match &config.email_api_key {
        Some(key) => Arc::new(ResendSender::new(
            key.clone(),
            config.email_from.clone(),
            timeout,
        )?),
        None => {
            tracing::warn!("email API key not set; emails are logged only");
            Arc::new(LogSender)
        }
    };

    let admin = AdminCredentials::new(config.admin_user.clone(), config.admin_pass.clone());
    if !admin.is_configured() {
        tracing::warn!("ADMIN_USER/ADMIN_PASS not set; admin routes are unprotected");
    }

    // Build application state
    let app_state = AppState::new(
        &config,
        Dependencies {
            ledger,
            gateway,
            sender,
            card,
            ledger_backend,
        },
    );

    // Build router
    let app = Router::new().merge(api::build_router(admin));
    #[cfg(feature = "swagger-ui")]
    let app = {
        use utoipa::OpenApi;
        app.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", studio_payments::openapi::ApiDoc::openapi()),
        )
    };
    let app = app
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(timeout))
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
