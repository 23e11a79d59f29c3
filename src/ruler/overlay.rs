use super::surface::{ArrowLine, DrawingSurface, FilledRect, FloatingLabel, GuideLine};
use crate::data_types::{Measurement, MeasurementPoint, MeasurementReport, SeriesId};
use crate::error::{SyncError, SyncResult};
use crate::theme::RulerTheme;
use crate::transform::{ChartBackend, CoordinateTransform};
use crate::utils::date_formatter::{format_percent, format_price};
use glam::DVec2;

/// Pixel-space projection of a [`Measurement`].
///
/// Built from the stored `(time, price)` pairs on every redraw, so that a
/// resized or rescaled chart never shows stale pixels.
#[derive(Clone, Debug, PartialEq)]
pub enum RulerOverlay {
    Empty,
    StartMarker {
        label: FloatingLabel,
    },
    Measurement {
        line: ArrowLine,
        rect: FilledRect,
        guides: Vec<GuideLine>,
        label: FloatingLabel,
        report: MeasurementReport,
    },
}

impl RulerOverlay {
    pub fn project<C: ChartBackend + ?Sized>(
        measurement: &Measurement,
        chart: &C,
        series: SeriesId,
        theme: &RulerTheme,
    ) -> SyncResult<Self> {
        let facade = CoordinateTransform::new(chart);
        let to_screen = |p: &MeasurementPoint| {
            facade
                .data_to_screen(series, p.time, p.price)
                .ok_or(SyncError::MissingCoordinateMapping("ruler anchor"))
        };
        let offset = DVec2::from(theme.label_offset);

        match measurement {
            Measurement::Idle => Ok(Self::Empty),
            Measurement::Armed { start } => {
                let at = to_screen(start)?;
                Ok(Self::StartMarker {
                    label: FloatingLabel {
                        anchor: at + offset,
                        lines: vec![
                            "Ruler".to_string(),
                            format!("Start: {}", format_price(start.price)),
                        ],
                        accent: None,
                        background: theme.label_background,
                        text: theme.label_text,
                    },
                })
            }
            Measurement::Live { start, current: end } | Measurement::Finalized { start, end } => {
                let live = matches!(measurement, Measurement::Live { .. });
                let a = to_screen(start)?;
                let b = to_screen(end)?;
                let report = MeasurementReport::between(*start, *end);
                let color = theme.stroke_for(report.is_gain());

                let line = ArrowLine {
                    from: a,
                    to: b,
                    start_head: arrowhead(a, b, theme.arrow_size),
                    end_head: arrowhead(b, a, theme.arrow_size),
                    color,
                    width: theme.line_width,
                    dash: theme.dash,
                };
                let rect = FilledRect {
                    origin: a.min(b),
                    size: (b - a).abs(),
                    fill: color.alpha(theme.fill_alpha),
                };
                let guides = chart
                    .plot_size()
                    .map(|size| {
                        vec![
                            GuideLine {
                                from: DVec2::new(b.x, 0.0),
                                to: DVec2::new(b.x, size.y),
                                color: theme.guide,
                                dash: theme.guide_dash,
                            },
                            GuideLine {
                                from: DVec2::new(0.0, b.y),
                                to: DVec2::new(size.x, b.y),
                                color: theme.guide,
                                dash: theme.guide_dash,
                            },
                        ]
                    })
                    .unwrap_or_default();
                let label = FloatingLabel {
                    anchor: b + offset,
                    lines: label_lines(&report, live),
                    accent: Some(color),
                    background: theme.label_background,
                    text: theme.label_text,
                };

                Ok(Self::Measurement {
                    line,
                    rect,
                    guides,
                    label,
                    report,
                })
            }
        }
    }

    /// Replaces whatever the surface shows with this overlay.
    pub fn draw<S: DrawingSurface + ?Sized>(&self, surface: &mut S) {
        surface.clear();
        match self {
            Self::Empty => {}
            Self::StartMarker { label } => surface.place_label(label),
            Self::Measurement {
                line,
                rect,
                guides,
                label,
                ..
            } => {
                surface.fill_rect(rect);
                surface.draw_arrow_line(line);
                for guide in guides {
                    surface.draw_guide(guide);
                }
                surface.place_label(label);
            }
        }
    }
}

fn label_lines(report: &MeasurementReport, live: bool) -> Vec<String> {
    let title = if live { "Measuring" } else { "Measurement" };
    vec![
        title.to_string(),
        format!("Start: {}", format_price(report.start.price)),
        format!("End: {}", format_price(report.end.price)),
        format!(
            "Change: {} ({})",
            format_percent(report.percent_change),
            format_price(report.price_delta)
        ),
        format!("Duration: {}", report.duration_label),
        format!("Bars: {}", report.bar_count),
    ]
}

/// Triangle with its tip on `tip`, pointing away from `from`.
fn arrowhead(tip: DVec2, from: DVec2, size: f64) -> [DVec2; 3] {
    let dir = (tip - from).normalize_or_zero();
    let base = tip - dir * size;
    let wing = dir.perp() * (size / 2.0);
    [tip, base + wing, base - wing]
}
