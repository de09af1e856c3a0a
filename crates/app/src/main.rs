//! `pinboard` -- personal dashboard client.
//!
//! Connects to a PocketBase server, optionally lists a user's dashboards,
//! and keeps one dashboard live over the realtime feed until interrupted.
//! See [`AppConfig::from_env`] for the environment variables read.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pinboard_app::config::AppConfig;
use pinboard_app::shell;
use pinboard_dashboard::{DashboardDirectory, DashboardView};
use pinboard_store::{PocketBaseStore, RecordStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pinboard=info,pinboard_app=info,pinboard_dashboard=info,pinboard_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = AppConfig::from_env()?;
    tracing::info!(
        url = %config.pocketbase_url,
        authenticated = config.pocketbase_token.is_some(),
        "Loaded configuration"
    );

    // --- Store ---
    let store: Arc<dyn RecordStore> = Arc::new(PocketBaseStore::new(
        config.pocketbase_url.clone(),
        config.pocketbase_token.clone(),
        config.request_timeout(),
    )?);

    // --- Dashboard list ---
    if let Some(user) = &config.user {
        let directory = DashboardDirectory::new(Arc::clone(&store));
        match directory.list(user).await {
            Ok(dashboards) => {
                tracing::info!(user = %user, count = dashboards.len(), "Dashboards");
                for dashboard in &dashboards {
                    tracing::info!(
                        dashboard_id = %dashboard.id,
                        name = %dashboard.name,
                        background = dashboard.background_or_default(),
                        "Dashboard"
                    );
                }
            }
            Err(e) => {
                tracing::error!(user = %user, error = %e, "Failed to load dashboards");
                eprintln!("{}", shell::user_message(&e));
            }
        }
    }

    // --- Live dashboard ---
    let Some(dashboard_id) = config.dashboard.clone() else {
        tracing::info!("PINBOARD_DASHBOARD not set, nothing to open");
        return Ok(());
    };

    let view = match DashboardView::open(store, dashboard_id.clone(), config.viewport_width).await {
        Ok(view) => view,
        Err(e) => {
            tracing::error!(dashboard_id = %dashboard_id, error = %e, "Failed to open dashboard");
            return Ok(());
        }
    };
    tracing::info!(
        name = view.controller().dashboard().map_or("", |d| d.name.as_str()),
        background = view.controller().background(),
        "Opened dashboard"
    );
    shell::describe_widgets(view.controller());

    shell::run_view(view, shutdown_signal()).await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
