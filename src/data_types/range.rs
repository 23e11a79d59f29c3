use serde::{Deserialize, Serialize};

use super::ChartId;

/// Visible window on the shared time axis, expressed in logical bar indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportRange {
    pub from_logical: f64,
    pub to_logical: f64,
    pub right_offset_bars: i32,
}

impl ViewportRange {
    pub fn new(from_logical: f64, to_logical: f64, right_offset_bars: i32) -> Self {
        Self {
            from_logical,
            to_logical,
            right_offset_bars,
        }
    }

    /// Number of bars covered by the window.
    pub fn span(&self) -> f64 {
        self.to_logical - self.from_logical
    }

    pub fn midpoint(&self) -> f64 {
        (self.from_logical + self.to_logical) / 2.0
    }

    pub fn is_finite(&self) -> bool {
        self.from_logical.is_finite() && self.to_logical.is_finite()
    }
}

/// Content of the "last known range" slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CachedRange {
    pub range: ViewportRange,
    pub source_id: ChartId,
    pub sequence: u64,
}
