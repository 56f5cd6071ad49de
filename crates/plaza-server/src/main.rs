use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use plaza_api::notify::Notifier;
use plaza_api::{AppState, AppStateInner, chat, cleanup, profile, status};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plaza=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default();
    if bot_token.is_empty() {
        eprintln!("FATAL: TELEGRAM_BOT_TOKEN is not set.");
        eprintln!("       Identity verification and notifications both need it.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }
    let bot_username =
        std::env::var("TELEGRAM_BOT_USERNAME").unwrap_or_else(|_| "plaza_bot".into());
    let cleanup_token = std::env::var("PLAZA_CLEANUP_TOKEN").ok().filter(|t| !t.is_empty());
    if cleanup_token.is_none() {
        info!("PLAZA_CLEANUP_TOKEN not set; /cleanup-expired-chats is locked");
    }
    let db_path = std::env::var("PLAZA_DB_PATH").unwrap_or_else(|_| "plaza.db".into());
    let host = std::env::var("PLAZA_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PLAZA_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let sweep_interval_secs: u64 = std::env::var("PLAZA_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3600);

    // Init database
    let db = plaza_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        bot_token: bot_token.clone(),
        cleanup_token,
        notifier: Notifier::new(bot_token, bot_username),
    });

    // Background sweep (the send path also sweeps inline)
    tokio::spawn(cleanup::run_sweep_loop(state.clone(), sweep_interval_secs));

    // Routes
    let app = Router::new()
        .route("/tg/chat/start", post(chat::start_chat))
        .route("/tg/chat/room/{id}", get(chat::get_room_messages))
        .route("/tg/chat/room/{id}/send", post(chat::send_message))
        .route("/tg/upsert-profile", post(profile::upsert_profile))
        .route("/tg/status", post(status::publish_status))
        .route("/cleanup-expired-chats", post(cleanup::cleanup_expired_chats))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Plaza server listening on {}", addr);
    info!("Sweep interval: {}s", sweep_interval_secs);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
