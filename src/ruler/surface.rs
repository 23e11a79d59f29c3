use crate::theme::Rgba;
use glam::DVec2;

/// Dashed segment with an arrowhead at both ends. Each head is a
/// triangle `[tip, wing, wing]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrowLine {
    pub from: DVec2,
    pub to: DVec2,
    pub start_head: [DVec2; 3],
    pub end_head: [DVec2; 3],
    pub color: Rgba,
    pub width: f64,
    pub dash: [f64; 2],
}

/// Filled rectangle without stroke.
#[derive(Clone, Debug, PartialEq)]
pub struct FilledRect {
    pub origin: DVec2,
    pub size: DVec2,
    pub fill: Rgba,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GuideLine {
    pub from: DVec2,
    pub to: DVec2,
    pub color: Rgba,
    pub dash: [f64; 2],
}

#[derive(Clone, Debug, PartialEq)]
pub struct FloatingLabel {
    /// Top-left corner of the label box.
    pub anchor: DVec2,
    pub lines: Vec<String>,
    /// Color of the change line, when there is one.
    pub accent: Option<Rgba>,
    pub background: Rgba,
    pub text: Rgba,
}

/// A 2D vector drawing surface layered over the chart.
///
/// Immediate-mode backends draw on each call; retained-mode backends keep
/// the shapes until the next [`DrawingSurface::clear`].
pub trait DrawingSurface {
    fn clear(&mut self);
    fn draw_arrow_line(&mut self, line: &ArrowLine);
    fn fill_rect(&mut self, rect: &FilledRect);
    fn draw_guide(&mut self, guide: &GuideLine);
    fn place_label(&mut self, label: &FloatingLabel);
}

/// Retained-mode surface that keeps the shapes it was given.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
    pub lines: Vec<ArrowLine>,
    pub rects: Vec<FilledRect>,
    pub guides: Vec<GuideLine>,
    pub labels: Vec<FloatingLabel>,
    pub clear_count: usize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.shape_count() == 0
    }

    pub fn shape_count(&self) -> usize {
        self.lines.len() + self.rects.len() + self.guides.len() + self.labels.len()
    }

    /// Text of the single visible label, lines joined with newlines.
    pub fn label_text(&self) -> Option<String> {
        self.labels.first().map(|l| l.lines.join("\n"))
    }
}

impl DrawingSurface for RecordingSurface {
    fn clear(&mut self) {
        self.lines.clear();
        self.rects.clear();
        self.guides.clear();
        self.labels.clear();
        self.clear_count += 1;
    }

    fn draw_arrow_line(&mut self, line: &ArrowLine) {
        self.lines.push(line.clone());
    }

    fn fill_rect(&mut self, rect: &FilledRect) {
        self.rects.push(rect.clone());
    }

    fn draw_guide(&mut self, guide: &GuideLine) {
        self.guides.push(guide.clone());
    }

    fn place_label(&mut self, label: &FloatingLabel) {
        self.labels.push(label.clone());
    }
}
