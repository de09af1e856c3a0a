//! Optimistic controller for the widgets of one dashboard.
//!
//! Every mutation is applied to the local widget list first. The matching
//! store write runs on a spawned task and reports back as a
//! [`PersistOutcome`], which the owner feeds into
//! [`DashboardController::apply_outcome`] on the same queue as user input
//! and remote events. Failed writes are logged and otherwise ignored:
//! there is no retry and no rollback.
//!
//! Widgets added locally carry a temporary id until their create request
//! completes. Edits made in that window are held back and flushed as one
//! update once the store id is known; a widget removed in that window has
//! its freshly created record deleted.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use pinboard_core::collision::resolve_placement;
use pinboard_core::content::{edit_widget, ContentEdit};
use pinboard_core::dashboard::{Dashboard, DEFAULT_BACKGROUND};
use pinboard_core::error::CoreError;
use pinboard_core::geometry::{Point, Position, Size};
use pinboard_core::grid::{clamp_size, default_size_for_type, next_placement};
use pinboard_core::types::RecordId;
use pinboard_core::widget::{Widget, WidgetId, WidgetKind, WidgetPatch};
use pinboard_events::{Record, RecordAction, RecordEvent};
use pinboard_store::collections::{
    dashboard_from_record, widget_fields, widget_from_record, DASHBOARDS, DASHBOARD_FIELD, WIDGETS,
};
use pinboard_store::{Filter, ListQuery, RecordStore, StoreError};

use crate::error::DashboardError;

/// Sort key for widgets when loading a dashboard.
const WIDGET_SORT: &str = "created";

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Completion report of a spawned store write.
#[derive(Debug)]
pub enum PersistOutcome {
    Created {
        temp_id: WidgetId,
        result: Result<Record, StoreError>,
    },
    Updated {
        id: WidgetId,
        result: Result<Record, StoreError>,
    },
    Deleted {
        id: WidgetId,
        result: Result<(), StoreError>,
    },
}

impl PersistOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            PersistOutcome::Created { result, .. } | PersistOutcome::Updated { result, .. } => {
                result.is_ok()
            }
            PersistOutcome::Deleted { result, .. } => result.is_ok(),
        }
    }

    /// The widget the write was issued for. For creates this is the
    /// temporary id the widget carried when the request was sent.
    pub fn widget_id(&self) -> &WidgetId {
        match self {
            PersistOutcome::Created { temp_id, .. } => temp_id,
            PersistOutcome::Updated { id, .. } | PersistOutcome::Deleted { id, .. } => id,
        }
    }
}

/// Local changes to a widget whose create request has not completed.
#[derive(Debug, Default, Clone, Copy)]
struct PendingCreate {
    dirty: bool,
    removed: bool,
}

// ---------------------------------------------------------------------------
// DashboardController
// ---------------------------------------------------------------------------

/// Authoritative local state of one open dashboard.
///
/// Methods that write to the store spawn a Tokio task and must be called
/// from within a runtime.
pub struct DashboardController {
    store: Arc<dyn RecordStore>,
    dashboard_id: RecordId,
    viewport_width: i32,
    dashboard: Option<Dashboard>,
    widgets: Vec<Widget>,
    pending: HashMap<WidgetId, PendingCreate>,
    in_flight: usize,
    outcome_tx: mpsc::UnboundedSender<PersistOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<PersistOutcome>,
}

impl DashboardController {
    pub fn new(
        store: Arc<dyn RecordStore>,
        dashboard_id: impl Into<RecordId>,
        viewport_width: i32,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            store,
            dashboard_id: dashboard_id.into(),
            viewport_width,
            dashboard: None,
            widgets: Vec::new(),
            pending: HashMap::new(),
            in_flight: 0,
            outcome_tx,
            outcome_rx,
        }
    }

    // ---- accessors ----

    pub fn dashboard_id(&self) -> &str {
        &self.dashboard_id
    }

    /// The loaded dashboard record, if [`load`](Self::load) has succeeded.
    pub fn dashboard(&self) -> Option<&Dashboard> {
        self.dashboard.as_ref()
    }

    /// Background colour to render, falling back to the default.
    pub fn background(&self) -> &str {
        self.dashboard
            .as_ref()
            .map_or(DEFAULT_BACKGROUND, Dashboard::background_or_default)
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub fn widget(&self, id: &WidgetId) -> Option<&Widget> {
        self.widgets.iter().find(|w| &w.id == id)
    }

    /// Number of spawned writes whose outcome has not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn viewport_width(&self) -> i32 {
        self.viewport_width
    }

    /// Record a new viewport width; affects placement of widgets added later.
    pub fn set_viewport_width(&mut self, width: i32) {
        self.viewport_width = width;
    }

    // ---- loading ----

    /// Fetch the dashboard and its widgets and replace local state.
    ///
    /// Widgets still waiting for their create to complete are kept. On
    /// failure local state is left untouched and the error is returned.
    pub async fn load(&mut self) -> Result<(), DashboardError> {
        let (dashboard, widgets) = match self.fetch().await {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::error!(
                    dashboard_id = %self.dashboard_id,
                    error = %e,
                    "Failed to load dashboard"
                );
                return Err(e);
            }
        };

        let previous = std::mem::take(&mut self.widgets);
        let pending = &self.pending;
        self.widgets = widgets;
        self.widgets
            .extend(previous.into_iter().filter(|w| pending.contains_key(&w.id)));
        self.dashboard = Some(dashboard);

        tracing::info!(
            dashboard_id = %self.dashboard_id,
            widgets = self.widgets.len(),
            "Dashboard loaded"
        );
        Ok(())
    }

    async fn fetch(&self) -> Result<(Dashboard, Vec<Widget>), DashboardError> {
        let record = self.store.fetch_one(DASHBOARDS, &self.dashboard_id).await?;
        let dashboard = dashboard_from_record(&record)?;

        let query = ListQuery::new()
            .filter(Filter::eq(DASHBOARD_FIELD, self.dashboard_id.clone()))
            .sort(WIDGET_SORT);
        let records = self.store.fetch_all(WIDGETS, &query).await?;

        let widgets = records
            .iter()
            .filter_map(|record| match widget_from_record(record) {
                Ok(widget) => Some(widget),
                Err(e) => {
                    tracing::warn!(widget_id = %record.id, error = %e, "Skipping undecodable widget");
                    None
                }
            })
            .collect();

        Ok((dashboard, widgets))
    }

    // ---- local mutations ----

    /// Add a widget of `kind` at the next free slot and start persisting it.
    ///
    /// Returns the temporary id the widget carries until the store
    /// assigns its permanent one.
    pub fn add_widget(&mut self, kind: WidgetKind) -> WidgetId {
        let size = default_size_for_type(&kind);
        let slot = next_placement(&self.widgets, self.viewport_width);
        let position = resolve_placement(Point::from(slot), size, &self.widgets, None);
        let widget = Widget::new(WidgetId::temporary(), kind, position, size);
        let temp_id = widget.id.clone();

        tracing::info!(
            dashboard_id = %self.dashboard_id,
            widget_id = %temp_id,
            kind = %widget.kind,
            "Adding widget"
        );

        match widget_fields(&self.dashboard_id, &widget) {
            Ok(fields) => {
                self.pending.insert(temp_id.clone(), PendingCreate::default());
                let store = Arc::clone(&self.store);
                let id = temp_id.clone();
                self.spawn_persist(async move {
                    let result = store.create(WIDGETS, fields).await;
                    PersistOutcome::Created { temp_id: id, result }
                });
            }
            Err(e) => {
                tracing::error!(widget_id = %temp_id, error = %e, "Failed to encode widget");
            }
        }

        self.widgets.push(widget);
        temp_id
    }

    /// Remove a widget locally and delete its record if it has one.
    ///
    /// Returns `false` when no widget has this id.
    pub fn remove_widget(&mut self, id: &WidgetId) -> bool {
        let Some(index) = self.index_of(id) else {
            tracing::debug!(widget_id = %id, "Remove for unknown widget ignored");
            return false;
        };
        self.widgets.remove(index);

        if let Some(state) = self.pending.get_mut(id) {
            state.removed = true;
        } else if !id.is_temporary() {
            self.persist_delete(id.clone());
        }
        true
    }

    /// Merge `patch` into a widget and persist the merged state.
    ///
    /// Returns `false` when no widget has this id.
    pub fn update_widget(&mut self, id: &WidgetId, patch: WidgetPatch) -> bool {
        let Some(widget) = self.widgets.iter_mut().find(|w| &w.id == id) else {
            tracing::debug!(widget_id = %id, "Update for unknown widget ignored");
            return false;
        };
        widget.apply(&patch);
        let merged = widget.clone();

        if let Some(state) = self.pending.get_mut(id) {
            state.dirty = true;
        } else if !id.is_temporary() {
            self.persist_update(&merged);
        }
        true
    }

    /// Move a widget as close to `desired` as the grid allows without
    /// overlapping another widget. Returns the resolved position.
    pub fn move_widget(&mut self, id: &WidgetId, desired: Point) -> Option<Position> {
        let size = self.widget(id)?.size;
        let position = resolve_placement(desired, size, &self.widgets, Some(id));
        self.update_widget(id, WidgetPatch::position(position));
        Some(position)
    }

    /// Resize a widget, snapping to the grid and enforcing the minimum
    /// footprint. Returns the applied size.
    pub fn resize_widget(&mut self, id: &WidgetId, size: Size) -> Option<Size> {
        self.widget(id)?;
        let size = clamp_size(size);
        self.update_widget(id, WidgetPatch::size(size));
        Some(size)
    }

    /// Flip the collapsed flag. Returns the new value.
    pub fn toggle_collapsed(&mut self, id: &WidgetId) -> Option<bool> {
        let collapsed = !self.widget(id)?.collapsed;
        self.update_widget(id, WidgetPatch::collapsed(collapsed));
        Some(collapsed)
    }

    /// Run a content edit through the widget's editor and persist the
    /// resulting payload.
    pub fn edit_content(&mut self, id: &WidgetId, edit: ContentEdit) -> Result<(), DashboardError> {
        let widget = self.widget(id).ok_or_else(|| CoreError::NotFound {
            entity: "widget",
            id: id.to_string(),
        })?;
        let patch = edit_widget(widget, edit)?;
        self.update_widget(id, patch);
        Ok(())
    }

    // ---- remote changes ----

    /// Fold a change made elsewhere into local state.
    ///
    /// Returns `true` when the widget list changed.
    pub fn on_remote_event(&mut self, event: RecordEvent) -> bool {
        let RecordEvent { action, record } = event;
        if record.str_field(DASHBOARD_FIELD) != Some(self.dashboard_id.as_str()) {
            tracing::trace!(widget_id = %record.id, "Ignoring change for another dashboard");
            return false;
        }
        let id = WidgetId::new(record.id.clone());

        match action {
            RecordAction::Create => {
                if self.index_of(&id).is_some() {
                    return false;
                }
                match widget_from_record(&record) {
                    Ok(widget) => {
                        self.widgets.push(widget);
                        true
                    }
                    Err(e) => {
                        tracing::warn!(widget_id = %id, error = %e, "Ignoring undecodable remote widget");
                        false
                    }
                }
            }
            RecordAction::Update => {
                let Some(index) = self.index_of(&id) else {
                    return false;
                };
                match widget_from_record(&record) {
                    Ok(widget) => {
                        self.widgets[index] = widget;
                        true
                    }
                    Err(e) => {
                        tracing::warn!(widget_id = %id, error = %e, "Ignoring undecodable remote widget");
                        false
                    }
                }
            }
            RecordAction::Delete => match self.index_of(&id) {
                Some(index) => {
                    self.widgets.remove(index);
                    true
                }
                None => false,
            },
        }
    }

    // ---- persistence outcomes ----

    /// Wait for the next completed write.
    ///
    /// Cancel-safe: no outcome is lost if the future is dropped.
    pub async fn next_outcome(&mut self) -> Option<PersistOutcome> {
        self.outcome_rx.recv().await
    }

    /// Apply every outcome until no write is in flight, including writes
    /// issued while applying (deferred updates, orphan deletes).
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.outcome_rx.recv().await {
                Some(outcome) => self.apply_outcome(outcome),
                None => break,
            }
        }
    }

    /// Reconcile local state with a completed write.
    pub fn apply_outcome(&mut self, outcome: PersistOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);

        match outcome {
            PersistOutcome::Created { temp_id, result: Ok(record) } => {
                self.finish_create(temp_id, record);
            }
            PersistOutcome::Created { temp_id, result: Err(e) } => {
                self.pending.remove(&temp_id);
                tracing::error!(widget_id = %temp_id, error = %e, "Failed to create widget");
            }
            PersistOutcome::Updated { id, result: Ok(_) } => {
                tracing::debug!(widget_id = %id, "Widget saved");
            }
            PersistOutcome::Updated { id, result: Err(e) } => {
                tracing::error!(widget_id = %id, error = %e, "Failed to save widget");
            }
            PersistOutcome::Deleted { id, result: Ok(()) } => {
                tracing::debug!(widget_id = %id, "Widget deleted");
            }
            PersistOutcome::Deleted { id, result: Err(e) } => {
                tracing::error!(widget_id = %id, error = %e, "Failed to delete widget");
            }
        }
    }

    fn finish_create(&mut self, temp_id: WidgetId, record: Record) {
        let state = self.pending.remove(&temp_id).unwrap_or_default();
        let store_id = WidgetId::new(record.id);

        if state.removed {
            tracing::info!(
                widget_id = %store_id,
                "Widget removed while being created, deleting record"
            );
            self.persist_delete(store_id);
            return;
        }

        if self.index_of(&temp_id).is_none() {
            tracing::debug!(widget_id = %temp_id, "Created widget no longer present locally");
            return;
        }

        // A remote create for the same record may have arrived first.
        self.widgets.retain(|w| w.id != store_id);
        let Some(index) = self.index_of(&temp_id) else {
            return;
        };
        self.widgets[index].id = store_id.clone();

        tracing::debug!(temp_id = %temp_id, widget_id = %store_id, "Widget created");

        if state.dirty {
            let merged = self.widgets[index].clone();
            self.persist_update(&merged);
        }
    }

    // ---- private helpers ----

    fn index_of(&self, id: &WidgetId) -> Option<usize> {
        self.widgets.iter().position(|w| &w.id == id)
    }

    fn persist_update(&mut self, widget: &Widget) {
        let fields = match widget_fields(&self.dashboard_id, widget) {
            Ok(fields) => fields,
            Err(e) => {
                tracing::error!(widget_id = %widget.id, error = %e, "Failed to encode widget");
                return;
            }
        };
        let store = Arc::clone(&self.store);
        let id = widget.id.clone();
        self.spawn_persist(async move {
            let result = store.update(WIDGETS, id.as_str(), fields).await;
            PersistOutcome::Updated { id, result }
        });
    }

    fn persist_delete(&mut self, id: WidgetId) {
        let store = Arc::clone(&self.store);
        self.spawn_persist(async move {
            let result = store.delete(WIDGETS, id.as_str()).await;
            PersistOutcome::Deleted { id, result }
        });
    }

    fn spawn_persist<F>(&mut self, write: F)
    where
        F: Future<Output = PersistOutcome> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            // The receiver lives as long as the controller.
            let _ = tx.send(write.await);
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
