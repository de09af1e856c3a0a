//! CRUD over a user's dashboards.

use std::sync::Arc;

use pinboard_core::dashboard::{validate_input, Dashboard, DashboardChanges, NewDashboard};
use pinboard_store::collections::{
    dashboard_change_fields, dashboard_from_record, new_dashboard_fields, DASHBOARDS, OWNER_FIELD,
};
use pinboard_store::{Filter, ListQuery, RecordStore};

use crate::error::DashboardError;

/// Most recently updated first.
const LIST_SORT: &str = "-updated";

/// Provides CRUD operations for the `dashboards` collection.
pub struct DashboardDirectory {
    store: Arc<dyn RecordStore>,
}

impl DashboardDirectory {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// All dashboards owned by `user`, most recently updated first.
    pub async fn list(&self, user: &str) -> Result<Vec<Dashboard>, DashboardError> {
        let query = ListQuery::new()
            .filter(Filter::eq(OWNER_FIELD, user))
            .sort(LIST_SORT);
        let records = self.store.fetch_all(DASHBOARDS, &query).await?;

        let dashboards = records
            .iter()
            .filter_map(|record| match dashboard_from_record(record) {
                Ok(dashboard) => Some(dashboard),
                Err(e) => {
                    tracing::warn!(dashboard_id = %record.id, error = %e, "Skipping undecodable dashboard");
                    None
                }
            })
            .collect();
        Ok(dashboards)
    }

    pub async fn get(&self, id: &str) -> Result<Dashboard, DashboardError> {
        let record = self.store.fetch_one(DASHBOARDS, id).await?;
        Ok(dashboard_from_record(&record)?)
    }

    /// Create a dashboard. A missing background gets the default colour.
    pub async fn create(&self, input: &NewDashboard) -> Result<Dashboard, DashboardError> {
        validate_input(input)?;
        let fields = new_dashboard_fields(input)?;
        let record = self.store.create(DASHBOARDS, fields).await?;
        let dashboard = dashboard_from_record(&record)?;

        tracing::info!(dashboard_id = %dashboard.id, owner = %dashboard.owner, "Dashboard created");
        Ok(dashboard)
    }

    /// Apply a partial update. Empty changes fetch the current record
    /// without writing.
    pub async fn update(
        &self,
        id: &str,
        changes: &DashboardChanges,
    ) -> Result<Dashboard, DashboardError> {
        validate_input(changes)?;
        if changes.is_empty() {
            return self.get(id).await;
        }
        let record = self
            .store
            .update(DASHBOARDS, id, dashboard_change_fields(changes))
            .await?;
        Ok(dashboard_from_record(&record)?)
    }

    pub async fn rename(&self, id: &str, name: impl Into<String>) -> Result<Dashboard, DashboardError> {
        let changes = DashboardChanges {
            name: Some(name.into()),
            ..Default::default()
        };
        self.update(id, &changes).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), DashboardError> {
        self.store.delete(DASHBOARDS, id).await?;
        tracing::info!(dashboard_id = %id, "Dashboard deleted");
        Ok(())
    }
}
