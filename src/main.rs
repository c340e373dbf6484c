//! vitalwatch - emergency vitals dispatch service

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitalwatch::{
    config::Args,
    db::DispatchDb,
    notify::{ExpoPush, Notifier},
    pipeline::Pipeline,
    routes::{create_router, AppState},
    telemetry::FirebaseTelemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("vitalwatch={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }
    let tz = args.tz()?;

    info!("======================================");
    info!("  vitalwatch - emergency dispatch");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Database: {}", args.database_path.display());
    info!("Telemetry: {}", args.telemetry_url);
    info!("Poll interval: {}s", args.poll_interval_secs);
    info!("Push endpoint: {}", args.push_endpoint);
    info!("======================================");

    let db = Arc::new(DispatchDb::open(&args.database_path)?);

    let telemetry = Arc::new(FirebaseTelemetry::new(args.telemetry_url.clone()));
    let push = Arc::new(ExpoPush::new(args.push_endpoint.clone()));
    let notifier = Notifier::start(push, args.push_queue_size);

    let pipeline = Pipeline::new(
        db.clone(),
        telemetry,
        notifier,
        Duration::from_secs(args.poll_interval_secs),
        tz,
    );
    tokio::spawn(pipeline.run());

    let app = create_router(AppState { db, tz });

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!("API listening on http://{}", args.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
