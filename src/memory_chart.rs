//! Headless chart with uniform bars and a linear price scale.
//!
//! Implements [`ChartBackend`] without any rendering. Programmatic range
//! changes are counted instead of raising native events: the caller decides
//! when (and whether) to deliver the "visible range changed" notification,
//! which is how an asynchronous native chart behaves.

use crate::data_types::{SamplingPeriod, SeriesId};
use crate::transform::ChartBackend;
use crate::view_controller::ViewController;
use glam::DVec2;
use std::collections::{BTreeSet, VecDeque};

/// Programmatic range changes remembered for inspection.
const APPLIED_HISTORY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CrosshairState {
    pub price: f64,
    pub time: f64,
    pub series: SeriesId,
}

#[derive(Clone, Debug)]
pub struct MemoryChart {
    size: DVec2,
    first_time: f64,
    bar_secs: f64,
    bar_count: usize,
    visible: (f64, f64),
    right_offset: i32,
    price_range: (f64, f64),
    primary: Option<SeriesId>,
    helpers: BTreeSet<SeriesId>,
    next_series: usize,
    crosshair: Option<CrosshairState>,
    interactions_locked: bool,
    destroyed: bool,
    applied_ranges: VecDeque<(f64, f64)>,
}

impl MemoryChart {
    pub fn new(bar_count: usize, first_time: f64, period: SamplingPeriod) -> Self {
        Self {
            size: DVec2::new(1000.0, 500.0),
            first_time,
            bar_secs: period.as_secs() as f64,
            bar_count,
            visible: (0.0, bar_count.max(1) as f64),
            right_offset: 0,
            price_range: (0.0, 100.0),
            primary: Some(SeriesId(0)),
            helpers: BTreeSet::new(),
            next_series: 1,
            crosshair: None,
            interactions_locked: false,
            destroyed: false,
            applied_ranges: VecDeque::new(),
        }
    }

    pub fn with_plot_size(mut self, width: f64, height: f64) -> Self {
        self.size = DVec2::new(width, height);
        self
    }

    pub fn with_price_range(mut self, min: f64, max: f64) -> Self {
        self.price_range = (min, max);
        self
    }

    pub fn with_visible_range(mut self, from: f64, to: f64) -> Self {
        self.visible = (from, to);
        self
    }

    /// A time-axis only view: nothing for the crosshair to snap to.
    pub fn without_primary_series(mut self) -> Self {
        self.primary = None;
        self
    }

    /// Simulates the user dragging or zooming the chart directly.
    pub fn user_set_visible_range(&mut self, from: f64, to: f64) {
        if !self.destroyed {
            self.visible = (from, to);
        }
    }

    pub fn destroy(&mut self) {
        self.destroyed = true;
        self.helpers.clear();
        self.crosshair = None;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn crosshair(&self) -> Option<CrosshairState> {
        self.crosshair
    }

    pub fn helper_series(&self) -> impl Iterator<Item = &SeriesId> {
        self.helpers.iter()
    }

    pub fn interactions_locked(&self) -> bool {
        self.interactions_locked
    }

    /// Most recent ranges set through
    /// [`ChartBackend::set_visible_logical_range`], oldest first.
    pub fn applied_ranges(&self) -> Vec<(f64, f64)> {
        self.applied_ranges.iter().copied().collect()
    }

    /// Drains the remembered ranges.
    pub fn take_applied_ranges(&mut self) -> Vec<(f64, f64)> {
        self.applied_ranges.drain(..).collect()
    }

    pub fn time_of_bar(&self, index: f64) -> f64 {
        self.first_time + index * self.bar_secs
    }

    fn logical_to_x(&self, logical: f64) -> f64 {
        let (from, to) = self.visible;
        ViewController::map_value_to_pixels(logical, self.size.x, from, to, false)
    }

    fn x_inside(&self, x: f64) -> bool {
        x >= 0.0 && x <= self.size.x
    }

    fn knows_series(&self, series: SeriesId) -> bool {
        self.primary == Some(series) || self.helpers.contains(&series)
    }
}

impl ChartBackend for MemoryChart {
    fn time_to_coordinate(&self, time: f64) -> Option<f64> {
        if self.destroyed || self.bar_secs <= 0.0 {
            return None;
        }
        let logical = (time - self.first_time) / self.bar_secs;
        Some(self.logical_to_x(logical))
    }

    fn coordinate_to_time(&self, x: f64) -> Option<f64> {
        let index = self.coordinate_to_logical(x)?.round();
        if index < 0.0 || index > self.bar_count.saturating_sub(1) as f64 {
            return None;
        }
        Some(self.time_of_bar(index))
    }

    fn coordinate_to_logical(&self, x: f64) -> Option<f64> {
        if self.destroyed || !self.x_inside(x) {
            return None;
        }
        let (from, to) = self.visible;
        Some(ViewController::map_pixels_to_value(
            x,
            self.size.x,
            from,
            to,
            false,
        ))
    }

    fn price_to_coordinate(&self, series: SeriesId, price: f64) -> Option<f64> {
        if self.destroyed || !self.knows_series(series) {
            return None;
        }
        let (min, max) = self.price_range;
        Some(ViewController::map_value_to_pixels(
            price,
            self.size.y,
            min,
            max,
            true,
        ))
    }

    fn coordinate_to_price(&self, series: SeriesId, y: f64) -> Option<f64> {
        if self.destroyed || !self.knows_series(series) || y < 0.0 || y > self.size.y {
            return None;
        }
        let (min, max) = self.price_range;
        Some(ViewController::map_pixels_to_value(
            y,
            self.size.y,
            min,
            max,
            true,
        ))
    }

    fn visible_logical_range(&self) -> Option<(f64, f64)> {
        (!self.destroyed).then_some(self.visible)
    }

    fn set_visible_logical_range(&mut self, from: f64, to: f64) {
        if self.destroyed {
            return;
        }
        self.visible = (from, to);
        if self.applied_ranges.len() == APPLIED_HISTORY {
            self.applied_ranges.pop_front();
        }
        self.applied_ranges.push_back((from, to));
    }

    fn right_offset(&self) -> Option<i32> {
        (!self.destroyed).then_some(self.right_offset)
    }

    fn set_right_offset(&mut self, bars: i32) {
        if !self.destroyed {
            self.right_offset = bars;
        }
    }

    fn bar_count(&self) -> usize {
        if self.destroyed {
            0
        } else {
            self.bar_count
        }
    }

    fn primary_series(&self) -> Option<SeriesId> {
        if self.destroyed {
            None
        } else {
            self.primary
        }
    }

    fn add_helper_series(&mut self) -> Option<SeriesId> {
        if self.destroyed {
            return None;
        }
        let id = SeriesId(self.next_series);
        self.next_series += 1;
        self.helpers.insert(id);
        Some(id)
    }

    fn remove_series(&mut self, series: SeriesId) {
        self.helpers.remove(&series);
    }

    fn set_crosshair_position(&mut self, price: f64, time: f64, series: SeriesId) {
        if self.destroyed || !self.knows_series(series) {
            return;
        }
        self.crosshair = Some(CrosshairState {
            price,
            time,
            series,
        });
    }

    fn clear_crosshair_position(&mut self) {
        self.crosshair = None;
    }

    fn plot_size(&self) -> Option<DVec2> {
        (!self.destroyed).then_some(self.size)
    }

    fn resize(&mut self, width: f64, height: f64) {
        if !self.destroyed {
            self.size = DVec2::new(width, height);
        }
    }

    fn set_interactions_locked(&mut self, locked: bool) {
        if !self.destroyed {
            self.interactions_locked = locked;
        }
    }
}
