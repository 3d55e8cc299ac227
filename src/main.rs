use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use clinicdesk::config::AppConfig;
use clinicdesk::db;
use clinicdesk::handlers;
use clinicdesk::services::clock::SystemClock;
use clinicdesk::services::payments::razorpay::RazorpayGateway;
use clinicdesk::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url, config.assign_lock_timeout)?;

    if config.payment_key_secret.is_empty() {
        tracing::warn!("PAYMENT_KEY_SECRET not set, payment callbacks will be rejected");
    }
    let payments = RazorpayGateway::new(
        config.payment_gateway_url.clone(),
        config.payment_key_id.clone(),
        config.payment_key_secret.clone(),
    );

    tracing::info!(
        offset = %config.clinic_offset,
        closed_days = %config.operating_days.to_human_readable(),
        overflow = ?config.overflow_policy,
        "clinic schedule loaded"
    );

    let state = Arc::new(AppState::new(
        conn,
        config.clone(),
        Box::new(SystemClock::new(config.clinic_offset)),
        Box::new(payments),
    ));

    let app = handlers::build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
