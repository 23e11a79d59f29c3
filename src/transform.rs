//! Narrow interface over the external chart and its coordinate conversions.

use crate::data_types::SeriesId;
use glam::DVec2;
use std::cell::RefCell;
use std::rc::Rc;

/// What the sync engine and the ruler need from a charting library.
///
/// Conversions may return `None` (or a non-finite value) when a coordinate
/// falls outside the plotted area; [`CoordinateTransform`] normalizes both.
/// Setters on a destroyed chart must be silent no-ops.
pub trait ChartBackend {
    fn time_to_coordinate(&self, time: f64) -> Option<f64>;
    fn coordinate_to_time(&self, x: f64) -> Option<f64>;
    fn coordinate_to_logical(&self, x: f64) -> Option<f64>;
    fn price_to_coordinate(&self, series: SeriesId, price: f64) -> Option<f64>;
    fn coordinate_to_price(&self, series: SeriesId, y: f64) -> Option<f64>;

    /// Visible window as `(from, to)` logical indices.
    fn visible_logical_range(&self) -> Option<(f64, f64)>;
    fn set_visible_logical_range(&mut self, from: f64, to: f64);
    fn right_offset(&self) -> Option<i32>;
    fn set_right_offset(&mut self, bars: i32);
    /// Number of data bars loaded.
    fn bar_count(&self) -> usize;

    /// Series the crosshair naturally snaps to, if any.
    fn primary_series(&self) -> Option<SeriesId>;
    /// Adds an invisible series carrying one value per bar so that a
    /// crosshair can be forced on a chart without a primary series.
    fn add_helper_series(&mut self) -> Option<SeriesId>;
    fn remove_series(&mut self, series: SeriesId);

    fn set_crosshair_position(&mut self, price: f64, time: f64, series: SeriesId);
    fn clear_crosshair_position(&mut self);

    /// Plot area size in pixels.
    fn plot_size(&self) -> Option<DVec2>;
    fn resize(&mut self, width: f64, height: f64);

    /// Disables wheel zoom and touch scroll while a measurement is running.
    fn set_interactions_locked(&mut self, _locked: bool) {}
}

/// Shared handle, so that an adapter and a ruler can drive the same chart.
/// A chart that is already borrowed behaves like a chart with no answer.
impl<T: ChartBackend> ChartBackend for Rc<RefCell<T>> {
    fn time_to_coordinate(&self, time: f64) -> Option<f64> {
        self.try_borrow().ok()?.time_to_coordinate(time)
    }

    fn coordinate_to_time(&self, x: f64) -> Option<f64> {
        self.try_borrow().ok()?.coordinate_to_time(x)
    }

    fn coordinate_to_logical(&self, x: f64) -> Option<f64> {
        self.try_borrow().ok()?.coordinate_to_logical(x)
    }

    fn price_to_coordinate(&self, series: SeriesId, price: f64) -> Option<f64> {
        self.try_borrow().ok()?.price_to_coordinate(series, price)
    }

    fn coordinate_to_price(&self, series: SeriesId, y: f64) -> Option<f64> {
        self.try_borrow().ok()?.coordinate_to_price(series, y)
    }

    fn visible_logical_range(&self) -> Option<(f64, f64)> {
        self.try_borrow().ok()?.visible_logical_range()
    }

    fn set_visible_logical_range(&mut self, from: f64, to: f64) {
        if let Ok(mut c) = self.try_borrow_mut() {
            c.set_visible_logical_range(from, to);
        }
    }

    fn right_offset(&self) -> Option<i32> {
        self.try_borrow().ok()?.right_offset()
    }

    fn set_right_offset(&mut self, bars: i32) {
        if let Ok(mut c) = self.try_borrow_mut() {
            c.set_right_offset(bars);
        }
    }

    fn bar_count(&self) -> usize {
        self.try_borrow().map(|c| c.bar_count()).unwrap_or(0)
    }

    fn primary_series(&self) -> Option<SeriesId> {
        self.try_borrow().ok()?.primary_series()
    }

    fn add_helper_series(&mut self) -> Option<SeriesId> {
        self.try_borrow_mut().ok()?.add_helper_series()
    }

    fn remove_series(&mut self, series: SeriesId) {
        if let Ok(mut c) = self.try_borrow_mut() {
            c.remove_series(series);
        }
    }

    fn set_crosshair_position(&mut self, price: f64, time: f64, series: SeriesId) {
        if let Ok(mut c) = self.try_borrow_mut() {
            c.set_crosshair_position(price, time, series);
        }
    }

    fn clear_crosshair_position(&mut self) {
        if let Ok(mut c) = self.try_borrow_mut() {
            c.clear_crosshair_position();
        }
    }

    fn plot_size(&self) -> Option<DVec2> {
        self.try_borrow().ok()?.plot_size()
    }

    fn resize(&mut self, width: f64, height: f64) {
        if let Ok(mut c) = self.try_borrow_mut() {
            c.resize(width, height);
        }
    }

    fn set_interactions_locked(&mut self, locked: bool) {
        if let Ok(mut c) = self.try_borrow_mut() {
            c.set_interactions_locked(locked);
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Coordinate facade: every conversion yields `None` instead of failing.
pub struct CoordinateTransform<'a, C: ChartBackend + ?Sized> {
    chart: &'a C,
}

impl<'a, C: ChartBackend + ?Sized> CoordinateTransform<'a, C> {
    pub fn new(chart: &'a C) -> Self {
        Self { chart }
    }

    pub fn time_to_pixel(&self, time: f64) -> Option<f64> {
        if !time.is_finite() {
            return None;
        }
        finite(self.chart.time_to_coordinate(time))
    }

    pub fn price_to_pixel(&self, series: SeriesId, price: f64) -> Option<f64> {
        if !price.is_finite() {
            return None;
        }
        finite(self.chart.price_to_coordinate(series, price))
    }

    pub fn pixel_to_time(&self, x: f64) -> Option<f64> {
        if !x.is_finite() {
            return None;
        }
        finite(self.chart.coordinate_to_time(x))
    }

    pub fn pixel_to_price(&self, series: SeriesId, y: f64) -> Option<f64> {
        if !y.is_finite() {
            return None;
        }
        finite(self.chart.coordinate_to_price(series, y))
    }

    pub fn pixel_to_logical(&self, x: f64) -> Option<f64> {
        if !x.is_finite() {
            return None;
        }
        finite(self.chart.coordinate_to_logical(x))
    }

    /// Projects a `(time, price)` pair to a pixel position.
    pub fn data_to_screen(&self, series: SeriesId, time: f64, price: f64) -> Option<DVec2> {
        Some(DVec2::new(
            self.time_to_pixel(time)?,
            self.price_to_pixel(series, price)?,
        ))
    }
}
