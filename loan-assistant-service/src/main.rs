mod config;
mod models;
mod service;

use axum::{
    http::{HeaderValue, Request},
    middleware::{Next, from_fn},
};
use tokio::net::TcpListener;
use tracing::{Instrument, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::{
    config::ServiceConfig,
    service::{build_router, create_app_state},
};

/// Initialize structured JSON tracing based on environment variables
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "loan_assistant_service=debug,loan_flow=debug,tower_http=debug".into()
    });

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

/// Tag every request with a correlation id and run it inside a span carrying it
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        method = %request.method(),
        path = %request.uri().path()
    );

    next.run(request).instrument(span).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServiceConfig::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        customer_file = %config.customer_file.display(),
        sanction_dir = %config.sanction_dir.display(),
        missing_profile = ?config.missing_profile,
        "Loading configuration"
    );

    let app = build_router(create_app_state(&config)?)
        .layer(from_fn(correlation_id_middleware));

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Loan assistant service listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
