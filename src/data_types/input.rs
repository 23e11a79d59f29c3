use glam::DVec2;

/// Handle of a series inside the external chart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesId(pub usize);

/// Value of the hovered series at the pointer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SeriesDatum {
    Ohlc {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
    Value(f64),
}

impl SeriesDatum {
    /// Field closest to `price`. Single-value data return their value.
    pub fn closest_to(&self, price: f64) -> f64 {
        match *self {
            Self::Value(v) => v,
            Self::Ohlc {
                open,
                high,
                low,
                close,
            } => {
                let mut best = close;
                let mut best_diff = (price - close).abs();
                for candidate in [open, high, low] {
                    let diff = (price - candidate).abs();
                    if diff < best_diff {
                        best_diff = diff;
                        best = candidate;
                    }
                }
                best
            }
        }
    }
}

/// Native click / crosshair-move parameters delivered by the chart.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChartPointerEvent {
    /// Time of the hovered bar, when the chart resolved one.
    pub time: Option<f64>,
    /// Pointer position relative to the plot area.
    pub point: Option<DVec2>,
    /// Data of the primary series under the pointer.
    pub hovered: Option<SeriesDatum>,
}

impl ChartPointerEvent {
    pub fn at(point: DVec2) -> Self {
        Self {
            point: Some(point),
            ..Default::default()
        }
    }

    pub fn with_time(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_hovered(mut self, datum: SeriesDatum) -> Self {
        self.hovered = Some(datum);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WheelDeltaMode {
    #[default]
    Pixel,
    Line,
    Page,
}

/// Raw wheel input over a chart container.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WheelEvent {
    pub delta_x: f64,
    pub delta_y: f64,
    pub delta_mode: WheelDeltaMode,
    /// Cursor x relative to the plot area.
    pub offset_x: f64,
}
