//! Dashboard model and input validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::{RecordId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Background applied when a dashboard does not set one.
pub const DEFAULT_BACKGROUND: &str = "#f0f9ff";

pub const NAME_MAX_LEN: u64 = 100;
pub const BACKGROUND_MAX_LEN: u64 = 50;

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A named canvas owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: RecordId,
    pub owner: RecordId,
    pub name: String,
    pub background: String,
    pub created: Option<Timestamp>,
    pub updated: Option<Timestamp>,
}

impl Dashboard {
    /// Background to render, falling back to [`DEFAULT_BACKGROUND`].
    pub fn background_or_default(&self) -> &str {
        if self.background.is_empty() {
            DEFAULT_BACKGROUND
        } else {
            &self.background
        }
    }
}

/// Input for creating a dashboard.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewDashboard {
    pub owner: RecordId,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 50))]
    pub background: Option<String>,
}

impl NewDashboard {
    pub fn new(owner: impl Into<RecordId>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            background: None,
        }
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = Some(background.into());
        self
    }

    /// Validated background, defaulted when absent.
    pub fn background(&self) -> &str {
        self.background.as_deref().unwrap_or(DEFAULT_BACKGROUND)
    }
}

/// Partial update of an existing dashboard.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DashboardChanges {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 50))]
    pub background: Option<String>,
}

impl DashboardChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.background.is_none()
    }
}

/// Run derive-based validation, mapping failures to [`CoreError::Validation`].
pub fn validate_input<T: Validate>(input: &T) -> Result<(), CoreError> {
    input.validate().map_err(CoreError::from)
}
