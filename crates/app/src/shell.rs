//! Drives an opened dashboard until shutdown.

use std::future::Future;

use pinboard_core::collision::occupied_cells;
use pinboard_core::content::{editor_for, ViewContext};
use pinboard_dashboard::{DashboardController, DashboardError, DashboardView, ViewChange};
use pinboard_store::StoreError;

use crate::messages::{DASHBOARD_LIST_LOAD_FAILED, SIGN_IN_FAILED};

/// Static message to show for a failed dashboard-list request.
pub fn user_message(error: &DashboardError) -> &'static str {
    match error {
        DashboardError::Store(StoreError::Api {
            status: 401 | 403, ..
        }) => SIGN_IN_FAILED,
        _ => DASHBOARD_LIST_LOAD_FAILED,
    }
}

/// Log one line per widget with its rendered content.
pub fn describe_widgets(controller: &DashboardController) {
    tracing::debug!(
        widgets = controller.widgets().len(),
        occupied_cells = occupied_cells(controller.widgets()).len(),
        "Grid occupancy"
    );
    let ctx = ViewContext::now();
    for widget in controller.widgets() {
        let editor = editor_for(&widget.kind);
        tracing::info!(
            widget_id = %widget.id,
            title = editor.title(),
            x = widget.position.x,
            y = widget.position.y,
            width = widget.size.width,
            height = widget.size.height,
            collapsed = widget.collapsed,
            content = ?editor.view(&widget.data, &ctx),
            "Widget"
        );
    }
}

fn log_change(change: &ViewChange) {
    match change {
        ViewChange::Remote {
            action,
            widget_id,
            applied,
        } => {
            tracing::info!(action = action.as_str(), widget_id = %widget_id, applied, "Remote change");
        }
        ViewChange::Persisted {
            kind,
            widget_id,
            success,
        } => {
            tracing::debug!(kind = ?kind, widget_id = %widget_id, success, "Write completed");
        }
        ViewChange::FeedClosed => {
            tracing::warn!("Realtime feed closed, dashboard is no longer live");
        }
    }
}

/// Apply changes to `view` until `shutdown` resolves, then close it and
/// wait for outstanding writes.
pub async fn run_view(
    mut view: DashboardView,
    shutdown: impl Future<Output = ()>,
) -> DashboardController {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            change = view.next_change() => match change {
                Some(change) => log_change(&change),
                None => {
                    (&mut shutdown).await;
                    break;
                }
            },
        }
    }

    let mut controller = view.close();
    controller.settle().await;
    tracing::info!(
        dashboard_id = %controller.dashboard_id(),
        widgets = controller.widgets().len(),
        "Dashboard closed"
    );
    controller
}
