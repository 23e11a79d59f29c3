//! Tunable policy of a sync group.

use crate::data_types::SamplingPeriod;
use eyre::{ensure, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Minimum number of visible bars per sampling period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinBarsTable(pub BTreeMap<SamplingPeriod, u32>);

impl MinBarsTable {
    /// Used for periods missing from the table.
    pub const FALLBACK: u32 = 10;

    pub fn min_bars_for(&self, period: SamplingPeriod) -> u32 {
        self.0.get(&period).copied().unwrap_or(Self::FALLBACK).max(1)
    }
}

impl Default for MinBarsTable {
    fn default() -> Self {
        use SamplingPeriod::*;
        Self(BTreeMap::from([
            (M1, 30),
            (M3, 30),
            (M5, 30),
            (M15, 20),
            (M30, 20),
            (H1, 15),
            (H2, 15),
            (H4, 12),
            (D1, 10),
            (W1, 8),
        ]))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Bounded wait for an answer to a range request.
    pub range_request_timeout_ms: u64,
    /// Pointer travel that turns a press into a pan.
    pub pan_threshold_px: f64,
    /// Exponent scale applied to normalized wheel deltas.
    pub wheel_sensitivity: f64,
    /// Pixels per wheel "line" when the delta mode is lines.
    pub wheel_line_px: f64,
    /// Bars shown by a chart that has nothing to align with.
    pub default_visible_bars: u32,
    /// Right offset used when the chart cannot report its own.
    pub future_padding_bars: i32,
    pub min_bars: MinBarsTable,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            range_request_timeout_ms: 1000,
            pan_threshold_px: 6.0,
            wheel_sensitivity: 0.0015,
            wheel_line_px: 33.0,
            default_visible_bars: 200,
            future_padding_bars: 5,
            min_bars: MinBarsTable::default(),
        }
    }
}

impl SyncConfig {
    pub fn range_request_timeout(&self) -> Duration {
        Duration::from_millis(self.range_request_timeout_ms)
    }

    pub fn min_bars_for(&self, period: SamplingPeriod) -> u32 {
        self.min_bars.min_bars_for(period)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).wrap_err("invalid sync config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading sync config {}", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.pan_threshold_px.is_finite() && self.pan_threshold_px >= 0.0,
            "pan_threshold_px must be a non-negative number"
        );
        ensure!(
            self.wheel_sensitivity.is_finite() && self.wheel_sensitivity > 0.0,
            "wheel_sensitivity must be positive"
        );
        ensure!(self.default_visible_bars > 0, "default_visible_bars must be > 0");
        Ok(())
    }
}
