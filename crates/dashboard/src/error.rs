use pinboard_core::error::CoreError;
use pinboard_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DashboardError {
    /// `true` when the error means the addressed record or widget is gone.
    pub fn is_not_found(&self) -> bool {
        match self {
            DashboardError::Core(CoreError::NotFound { .. }) => true,
            DashboardError::Store(e) => e.is_not_found(),
            _ => false,
        }
    }
}
