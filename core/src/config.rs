//! Construction-time settings for constraints.

use crate::constraint::{ConstraintError, ConstraintResult};
use serde::{Deserialize, Serialize};

/// Defaults applied to constraints built through [`crate::Constraint`]'s
/// constructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// Radius (in device length units) within which a constraint engages
    pub snap_distance: f64,
    /// Whether new constraints are destroyed by whatever aggregate clears them
    pub auto_delete: bool,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            snap_distance: 2.5,
            auto_delete: true,
        }
    }
}

impl SnapConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ConstraintResult<Self> {
        let config: SnapConfig =
            serde_json::from_str(json).map_err(|e| ConstraintError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConstraintResult<()> {
        if !self.snap_distance.is_finite() || self.snap_distance < 0.0 {
            return Err(ConstraintError::InvalidSnapDistance(self.snap_distance));
        }
        Ok(())
    }
}
