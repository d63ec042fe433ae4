//! Unit-of-work configuration

use serde::{Deserialize, Serialize};

use crate::errors::{ExError, ExErrorKind};

/// Options for a unit-of-work session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnitOfWorkOptions {
    /// Upper bound on staged entities across all operation kinds (None = unbounded)
    pub max_pending: Option<usize>,
}

impl UnitOfWorkOptions {
    /// Options with a pending-entity bound
    pub fn with_max_pending(limit: usize) -> Self {
        Self {
            max_pending: Some(limit),
        }
    }

    /// Parse options from JSON
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// - `ExErrorKind::Serialization`: not valid JSON for these options
    /// - `ExErrorKind::InvalidInput`: `max_pending` is zero
    pub fn from_json(json: &str) -> Result<Self, ExError> {
        let options: Self = serde_json::from_str(json).map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("load_options")
                .with_message(format!("Invalid unit-of-work options: {}", e))
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Check option values
    ///
    /// # Errors
    ///
    /// `ExErrorKind::InvalidInput` if `max_pending` is zero.
    pub fn validate(&self) -> Result<(), ExError> {
        if self.max_pending == Some(0) {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("load_options")
                .with_message("max_pending must be greater than zero"));
        }
        Ok(())
    }
}
