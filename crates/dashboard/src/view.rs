//! A dashboard kept live by its realtime feed.
//!
//! [`DashboardView`] couples a loaded [`DashboardController`] with exactly
//! one widget subscription. Dropping or closing the view ends the
//! subscription, so switching dashboards never leaks events from the
//! previous one.

use std::sync::Arc;

use pinboard_core::types::RecordId;
use pinboard_core::widget::WidgetId;
use pinboard_events::{RecordAction, RecordEvent};
use pinboard_store::collections::{DASHBOARD_FIELD, WIDGETS};
use pinboard_store::{Filter, RecordStore, Subscription};

use crate::controller::{DashboardController, PersistOutcome};
use crate::error::DashboardError;

/// Which store write a [`ViewChange::Persisted`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistKind {
    Created,
    Updated,
    Deleted,
}

/// What [`DashboardView::next_change`] applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewChange {
    /// A change made elsewhere. `applied` is `false` when it was ignored
    /// (duplicate create, unknown widget, undecodable record).
    Remote {
        action: RecordAction,
        widget_id: WidgetId,
        applied: bool,
    },
    /// One of our own writes completed.
    Persisted {
        kind: PersistKind,
        widget_id: WidgetId,
        success: bool,
    },
    /// The realtime feed ended; local edits still work.
    FeedClosed,
}

enum Next {
    Outcome(PersistOutcome),
    Remote(RecordEvent),
    FeedClosed,
}

pub struct DashboardView {
    controller: DashboardController,
    subscription: Option<Subscription>,
}

impl DashboardView {
    /// Subscribe to the dashboard's widgets, then load it.
    ///
    /// Subscribing first means changes made while the load is in flight
    /// are queued and applied afterwards instead of being missed. A failed
    /// load is logged and the view opens empty but live; only a failed
    /// subscription is an error.
    pub async fn open(
        store: Arc<dyn RecordStore>,
        dashboard_id: impl Into<RecordId>,
        viewport_width: i32,
    ) -> Result<Self, DashboardError> {
        let dashboard_id = dashboard_id.into();
        let subscription = store
            .subscribe(WIDGETS, Some(Filter::eq(DASHBOARD_FIELD, dashboard_id.clone())))
            .await?;

        let mut controller = DashboardController::new(store, dashboard_id, viewport_width);
        if let Err(e) = controller.load().await {
            tracing::warn!(
                dashboard_id = %controller.dashboard_id(),
                error = %e,
                "Opening dashboard view without its data"
            );
        }

        tracing::info!(dashboard_id = %controller.dashboard_id(), "Dashboard view opened");
        Ok(Self {
            controller,
            subscription: Some(subscription),
        })
    }

    pub fn controller(&self) -> &DashboardController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut DashboardController {
        &mut self.controller
    }

    /// `true` while the realtime feed is delivering.
    pub fn is_live(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    /// Wait for the next remote change or write completion and apply it.
    ///
    /// After the feed has closed only write completions are reported; if
    /// none are in flight `None` is returned.
    pub async fn next_change(&mut self) -> Option<ViewChange> {
        let next = match self.subscription.as_mut() {
            Some(subscription) => tokio::select! {
                Some(outcome) = self.controller.next_outcome() => Next::Outcome(outcome),
                event = subscription.next() => match event {
                    Some(event) => Next::Remote(event),
                    None => Next::FeedClosed,
                },
            },
            None if self.controller.in_flight() > 0 => {
                Next::Outcome(self.controller.next_outcome().await?)
            }
            None => return None,
        };

        Some(match next {
            Next::Outcome(outcome) => {
                let change = persisted(&outcome);
                self.controller.apply_outcome(outcome);
                change
            }
            Next::Remote(event) => {
                let action = event.action;
                let widget_id = WidgetId::new(event.record.id.clone());
                let applied = self.controller.on_remote_event(event);
                ViewChange::Remote {
                    action,
                    widget_id,
                    applied,
                }
            }
            Next::FeedClosed => {
                tracing::warn!(
                    dashboard_id = %self.controller.dashboard_id(),
                    "Realtime feed closed"
                );
                self.subscription = None;
                ViewChange::FeedClosed
            }
        })
    }

    /// End the realtime feed and hand back the controller.
    pub fn close(mut self) -> DashboardController {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        tracing::info!(dashboard_id = %self.controller.dashboard_id(), "Dashboard view closed");
        self.controller
    }
}

fn persisted(outcome: &PersistOutcome) -> ViewChange {
    let success = outcome.is_success();
    let (kind, widget_id) = match outcome {
        PersistOutcome::Created { result: Ok(record), .. } => {
            (PersistKind::Created, WidgetId::new(record.id.clone()))
        }
        PersistOutcome::Created { temp_id, .. } => (PersistKind::Created, temp_id.clone()),
        PersistOutcome::Updated { id, .. } => (PersistKind::Updated, id.clone()),
        PersistOutcome::Deleted { id, .. } => (PersistKind::Deleted, id.clone()),
    };
    ViewChange::Persisted {
        kind,
        widget_id,
        success,
    }
}
