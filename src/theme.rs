use serde::{Deserialize, Serialize};

/// Straight RGBA color, components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn white() -> Self {
        Self::rgb(255, 255, 255)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulerTheme {
    pub gain: Rgba,
    pub loss: Rgba,
    /// Opacity of the bounding rectangle fill.
    pub fill_alpha: f32,
    pub line_width: f64,
    /// Dash and gap lengths of the measurement line.
    pub dash: [f64; 2],
    pub arrow_size: f64,
    pub guide: Rgba,
    pub guide_dash: [f64; 2],
    pub label_background: Rgba,
    pub label_text: Rgba,
    /// Label offset from its anchor point.
    pub label_offset: [f64; 2],
}

impl Default for RulerTheme {
    fn default() -> Self {
        Self {
            gain: Rgba::rgb(24, 178, 107),
            loss: Rgba::rgb(231, 76, 60),
            fill_alpha: 0.15,
            line_width: 2.0,
            dash: [6.0, 6.0],
            arrow_size: 8.0,
            guide: Rgba::white().alpha(0.25),
            guide_dash: [3.0, 3.0],
            label_background: Rgba::rgb(16, 24, 40).alpha(0.92),
            label_text: Rgba::rgb(229, 231, 235),
            label_offset: [12.0, 12.0],
        }
    }
}

impl RulerTheme {
    pub fn stroke_for(&self, gain: bool) -> Rgba {
        if gain {
            self.gain
        } else {
            self.loss
        }
    }
}
