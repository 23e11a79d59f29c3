use glam::DVec2;

pub mod date_formatter;

pub trait PointExt {
    /// Largest per-axis distance to `other`.
    fn chebyshev_distance(&self, other: DVec2) -> f64;
}

impl PointExt for DVec2 {
    fn chebyshev_distance(&self, other: DVec2) -> f64 {
        let d = (*self - other).abs();
        d.x.max(d.y)
    }
}
