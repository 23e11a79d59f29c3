use crate::data_types::{ViewportRange, WheelDeltaMode, WheelEvent};
use crate::utils::PointExt;
use glam::DVec2;

/// ViewController holds the viewport math of interactions (clamp, zoom,
/// pan detection) independently of any chart so that it can be tested alone.
pub struct ViewController;

impl ViewController {
    /// Widens `range` to exactly `min_bars` around its midpoint when it is
    /// narrower. Returns the range and whether it was changed.
    pub fn clamp_min_bars(range: ViewportRange, min_bars: u32) -> (ViewportRange, bool) {
        let min_bars = min_bars.max(1) as f64;
        if range.span() >= min_bars {
            return (range, false);
        }
        let center = range.midpoint();
        let clamped = ViewportRange {
            from_logical: center - min_bars / 2.0,
            to_logical: center + min_bars / 2.0,
            right_offset_bars: range.right_offset_bars,
        };
        (clamped, true)
    }

    /// Normalizes a wheel delta to pixels. Returns `None` when the gesture is
    /// mostly horizontal, which is a pan and not a zoom.
    pub fn normalize_wheel_delta(event: &WheelEvent, line_px: f64, page_px: f64) -> Option<f64> {
        if event.delta_x.abs() > event.delta_y.abs() {
            return None;
        }
        let delta = match event.delta_mode {
            WheelDeltaMode::Pixel => event.delta_y,
            WheelDeltaMode::Line => event.delta_y * line_px,
            WheelDeltaMode::Page => event.delta_y * page_px,
        };
        delta.is_finite().then_some(delta)
    }

    /// Positive deltas (scrolling down) zoom out.
    pub fn compute_zoom_factor(delta: f64, sensitivity: f64) -> f64 {
        (delta * sensitivity).exp()
    }

    /// Scales the visible bar count by `factor` while keeping the bar under
    /// the cursor at the same relative position. Falls back to the midpoint
    /// when the cursor is outside the plot.
    pub fn zoom_at_cursor(
        range: ViewportRange,
        cursor_logical: Option<f64>,
        factor: f64,
        min_bars: u32,
    ) -> ViewportRange {
        let current_bars = range.span().max(1.0);
        let cursor = cursor_logical.unwrap_or_else(|| range.midpoint());
        let new_bars = (current_bars * factor).max(min_bars.max(1) as f64);

        let left_ratio = (cursor - range.from_logical) / current_bars;
        let from = cursor - left_ratio * new_bars;
        ViewportRange {
            from_logical: from,
            to_logical: from + new_bars,
            right_offset_bars: range.right_offset_bars,
        }
    }

    /// Window showing `bars_to_show` bars with the last bar in the middle.
    pub fn centered_on_last_bar(bar_count: usize, bars_to_show: u32) -> ViewportRange {
        let bars_to_show = bars_to_show.max(1) as i64;
        let right_pad = (bars_to_show - 1) / 2;
        let last_index = bar_count.saturating_sub(1) as i64;
        let to = last_index + right_pad;
        let from = to - (bars_to_show - 1);
        ViewportRange::new(from as f64, to as f64, right_pad as i32)
    }

    /// True once the pointer moved farther than `threshold` on either axis.
    pub fn exceeds_pan_threshold(start: DVec2, current: DVec2, threshold: f64) -> bool {
        start.chebyshev_distance(current) > threshold
    }

    /// Maps a pixel position to a value in a given domain.
    pub fn map_pixels_to_value(
        pixels: f64,
        total_pixels: f64,
        min_val: f64,
        max_val: f64,
        invert: bool,
    ) -> f64 {
        if total_pixels <= 0.0 {
            return min_val;
        }
        let pct = pixels / total_pixels;
        let effective_pct = if invert { 1.0 - pct } else { pct };
        min_val + (max_val - min_val) * effective_pct
    }

    /// Inverse of [`Self::map_pixels_to_value`].
    pub fn map_value_to_pixels(
        value: f64,
        total_pixels: f64,
        min_val: f64,
        max_val: f64,
        invert: bool,
    ) -> f64 {
        let span = max_val - min_val;
        if span.abs() < f64::EPSILON {
            return total_pixels / 2.0;
        }
        let pct = (value - min_val) / span;
        let effective_pct = if invert { 1.0 - pct } else { pct };
        effective_pct * total_pixels
    }
}
