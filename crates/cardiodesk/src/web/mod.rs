//! Web interface for patient intake and analysis reports.
//!
//! ## Routes
//!
//! - `GET /` - Home page
//! - `GET /patients` - Patient management table
//! - `GET|POST /patients/new` - Register a patient and analyse it
//! - `GET|POST /patients/{id}/edit` - Edit a patient
//! - `POST /patients/{id}/delete` - Delete a patient
//! - `GET /report` - Plots, summaries and NAD results of every patient
//! - `GET|POST /reports/refresh` - Re-run the analysis of one patient
//! - `GET /artifacts/{plots,rr,qt,logs}/...` - Files written by the analysis
//! - `GET /health` - Liveness probe

pub mod error;
pub mod flash;
pub mod handlers;
pub mod render;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::analysis::ArtifactDir;
use crate::config::Config;
use crate::error::Result;

pub use error::{WebError, WebResult};
pub use flash::{Flash, FlashLevel};
pub use state::AppState;

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    let layout = state.analyzer().layout().clone();

    let mut router = Router::new()
        .route("/", get(handlers::home))
        .route("/patients", get(handlers::list_patients))
        .route(
            "/patients/new",
            get(handlers::new_patient).post(handlers::create_patient),
        )
        .route(
            "/patients/{id}/edit",
            get(handlers::edit_patient).post(handlers::update_patient),
        )
        .route("/patients/{id}/delete", post(handlers::delete_patient))
        .route("/report", get(handlers::report))
        .route(
            "/reports/refresh",
            get(handlers::refresh_form).post(handlers::refresh_report),
        )
        .route("/health", get(handlers::health));

    // Only the result directories are exposed, never the working directory.
    for dir in ArtifactDir::ALL {
        router = router.nest_service(
            &format!("/artifacts/{}", dir.mount()),
            ServeDir::new(layout.dir(dir)),
        );
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Serve the application until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
