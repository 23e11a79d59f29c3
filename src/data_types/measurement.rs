use glam::DVec2;

use crate::utils::date_formatter::format_duration;

/// A resolved ruler anchor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeasurementPoint {
    pub time: f64,
    pub price: f64,
    /// Pixel position at capture time. Only used for diagnostics, the
    /// overlay always re-projects `time`/`price`.
    pub pixel: DVec2,
    pub logical_index: f64,
}

/// State of the ruler.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Measurement {
    #[default]
    Idle,
    Armed {
        start: MeasurementPoint,
    },
    Live {
        start: MeasurementPoint,
        current: MeasurementPoint,
    },
    Finalized {
        start: MeasurementPoint,
        end: MeasurementPoint,
    },
}

impl Measurement {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Armed or Live: a start point exists and the end is still moving.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Armed { .. } | Self::Live { .. })
    }

    pub fn start(&self) -> Option<&MeasurementPoint> {
        match self {
            Self::Idle => None,
            Self::Armed { start } | Self::Live { start, .. } | Self::Finalized { start, .. } => {
                Some(start)
            }
        }
    }
}

/// Derived figures of a two-point measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementReport {
    pub start: MeasurementPoint,
    pub end: MeasurementPoint,
    pub price_delta: f64,
    /// `None` when the start price is zero.
    pub percent_change: Option<f64>,
    pub duration_secs: f64,
    pub duration_label: String,
    pub bar_count: u64,
}

impl MeasurementReport {
    pub fn between(start: MeasurementPoint, end: MeasurementPoint) -> Self {
        let price_delta = end.price - start.price;
        let percent_change = if start.price == 0.0 {
            None
        } else {
            Some(price_delta / start.price * 100.0)
        };
        let duration_secs = (end.time - start.time).abs();
        let bar_count = (end.logical_index - start.logical_index).abs().round() as u64;
        Self {
            start,
            end,
            price_delta,
            percent_change,
            duration_secs,
            duration_label: format_duration(duration_secs),
            bar_count,
        }
    }

    /// Gains and flat moves count as positive.
    pub fn is_gain(&self) -> bool {
        self.price_delta >= 0.0
    }
}
