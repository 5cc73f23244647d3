//! Backend for the Codeathon event site.
//!
//! Three public surfaces and one gated one:
//! - `POST /register`: validated team submission into Postgres
//! - `POST /upload-proof`: payment screenshot/PDF into a public bucket
//! - `GET /settings`: editable event metadata, defaults merged at read time
//! - `/admin/*`: cookie-gated review console (list, approve, edit settings)
//!
//!
//!
//! # General Infrastructure
//! - Stateless request handling: no queues, no workers, no schedulers
//! - Postgres holds registrations, approved members, and settings rows
//! - An S3-compatible store holds proof files in one public bucket
//! - The only shared mutable process state is the bucket-provisioned cell,
//!   which collapses concurrent first uploads into a single attempt
//! - No retries anywhere: a failed store call fails that request and only
//!   that request
//!
//!
//!
//! # Admin Surface
//! - One shared credential pair, checked at login
//! - Session is the cookie value itself, ten minute Max-Age, no session store
//! - The admin page fires a best-effort logout beacon on tab hide/close; the
//!   Max-Age is the backstop
//!
//!
//!
//! # Setup
//!
//! Run the schema script against your database before first use:
//! ```sh
//! psql "$DATABASE_URL" -f scripts/01_create_tables.sql
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod registrations;
pub mod routes;
pub mod session;
pub mod settings;
pub mod state;
pub mod storage;

use routes::{
    admin_registrations_handler, approve_handler, login_handler, logout_handler,
    register_handler, settings_get_handler, settings_patch_handler, upload_proof_handler,
};
use state::AppState;
use storage::UPLOAD_BODY_LIMIT;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .frontend_origin
                .parse::<HeaderValue>()
                .expect("Invalid FRONTEND_ORIGIN"),
        )
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route("/register", post(register_handler))
        .route("/upload-proof", post(upload_proof_handler))
        .route(
            "/settings",
            get(settings_get_handler).patch(settings_patch_handler),
        )
        .route("/admin/login", post(login_handler))
        .route("/admin/logout", post(logout_handler))
        .route("/admin/session/consume", post(logout_handler))
        .route("/admin/registrations", get(admin_registrations_handler))
        .route("/admin/approve", post(approve_handler))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
