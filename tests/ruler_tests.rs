use chart_sync::chart_adapter::ChartViewportAdapter;
use chart_sync::context::SyncContext;
use chart_sync::data_types::{
    ChartPointerEvent, Measurement, MeasurementReport, PointerButton, SamplingPeriod, SeriesDatum,
    SeriesId, ViewportRange,
};
use chart_sync::memory_chart::MemoryChart;
use chart_sync::mode_flag::ModeFlag;
use chart_sync::ruler::{RecordingSurface, RulerTool};
use chart_sync::transform::ChartBackend;
use glam::DVec2;
use std::cell::RefCell;
use std::rc::Rc;

const HOUR: f64 = 3600.0;

struct Fixture {
    ctx: SyncContext,
    ruler: RulerTool<MemoryChart, RecordingSurface>,
    mode: ModeFlag,
    magnet: ModeFlag,
    reports: Rc<RefCell<Vec<MeasurementReport>>>,
}

/// 100 hourly bars on a 1000x500 plot: x = 10 px per bar, y = 5 px per
/// price unit with 0 at the bottom.
fn fixture() -> Fixture {
    let ctx = SyncContext::default();
    let mode = ModeFlag::new(true);
    let magnet = ModeFlag::new(false);
    let reports = Rc::new(RefCell::new(Vec::new()));
    let sink = reports.clone();
    let ruler = RulerTool::new(
        MemoryChart::new(100, 0.0, SamplingPeriod::H1),
        SeriesId(0),
        RecordingSurface::new(),
        mode.clone(),
        magnet.clone(),
        &ctx,
    )
    .on_complete(move |report| sink.borrow_mut().push(report.clone()));
    Fixture {
        ctx,
        ruler,
        mode,
        magnet,
        reports,
    }
}

fn at_bar(bar: f64, y: f64) -> ChartPointerEvent {
    ChartPointerEvent::at(DVec2::new(bar * 10.0, y)).with_time(bar * HOUR)
}

fn label(ruler: &RulerTool<MemoryChart, RecordingSurface>) -> String {
    ruler.with_surface(|s| s.label_text()).unwrap_or_default()
}

#[test]
fn test_full_measurement_cycle() {
    let f = fixture();

    f.ruler.handle_click(&at_bar(25.0, 250.0));
    assert!(matches!(f.ruler.measurement(), Measurement::Armed { .. }));
    assert!(f.ruler.with_chart(|c| c.interactions_locked()));
    assert_eq!(label(&f.ruler), "Ruler\nStart: 50.0000");

    f.ruler.handle_crosshair_move(&at_bar(50.0, 125.0));
    // Applied on the next frame only.
    assert!(matches!(f.ruler.measurement(), Measurement::Armed { .. }));
    f.ctx.tick();
    assert!(matches!(f.ruler.measurement(), Measurement::Live { .. }));
    assert!(label(&f.ruler).starts_with("Measuring"));
    assert_eq!(f.ruler.with_surface(|s| s.guides.len()), 2);

    f.ruler.handle_click(&at_bar(50.0, 125.0));
    assert!(matches!(f.ruler.measurement(), Measurement::Finalized { .. }));
    assert!(!f.ruler.with_chart(|c| c.interactions_locked()));

    let reports = f.reports.borrow();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.price_delta, 25.0);
    assert_eq!(report.percent_change, Some(50.0));
    assert_eq!(report.duration_secs, 90_000.0);
    assert_eq!(report.duration_label, "1d 1h 0m");
    assert_eq!(report.bar_count, 25);
    assert!(report.is_gain());

    assert_eq!(
        label(&f.ruler),
        "Measurement\nStart: 50.0000\nEnd: 75.0000\nChange: ▲ 50.00% (25.0000)\nDuration: 1d 1h 0m\nBars: 25"
    );
}

#[test]
fn test_shapes_follow_the_data_points() {
    let f = fixture();
    f.ruler.handle_click(&at_bar(25.0, 250.0));
    f.ruler.handle_click(&at_bar(50.0, 125.0));

    f.ruler.with_surface(|s| {
        assert_eq!(s.lines.len(), 1);
        assert_eq!(s.rects.len(), 1);
        let line = &s.lines[0];
        assert_eq!(line.from, DVec2::new(250.0, 250.0));
        assert_eq!(line.to, DVec2::new(500.0, 125.0));
        let rect = &s.rects[0];
        assert_eq!(rect.origin, DVec2::new(250.0, 125.0));
        assert_eq!(rect.size, DVec2::new(250.0, 125.0));
    });
}

#[test]
fn test_loss_uses_loss_color() {
    let f = fixture();
    f.ruler.handle_click(&at_bar(25.0, 125.0));
    f.ruler.handle_click(&at_bar(50.0, 250.0));

    let report = f.reports.borrow()[0].clone();
    assert_eq!(report.price_delta, -25.0);
    assert!(!report.is_gain());
    let theme = chart_sync::theme::RulerTheme::default();
    assert_eq!(f.ruler.with_surface(|s| s.lines[0].color), theme.loss);
    assert!(label(&f.ruler).contains("Change: ▼ -33.33% (-25.0000)"));
}

#[test]
fn test_zero_start_price_has_no_percent() {
    let f = fixture();
    // Bottom edge of the plot is price 0.
    f.ruler.handle_click(&at_bar(25.0, 500.0));
    f.ruler.handle_click(&at_bar(50.0, 250.0));

    let report = f.reports.borrow()[0].clone();
    assert_eq!(report.percent_change, None);
    assert!(label(&f.ruler).contains("Change: — (50.0000)"));
}

#[test]
fn test_click_after_finalized_only_clears() {
    let f = fixture();
    f.ruler.handle_click(&at_bar(25.0, 250.0));
    f.ruler.handle_click(&at_bar(50.0, 125.0));

    f.ruler.handle_click(&at_bar(60.0, 125.0));
    assert_eq!(f.ruler.measurement(), Measurement::Idle);
    assert!(f.ruler.with_surface(|s| s.is_empty()));

    f.ruler.handle_click(&at_bar(60.0, 125.0));
    assert!(matches!(f.ruler.measurement(), Measurement::Armed { .. }));
    assert_eq!(f.reports.borrow().len(), 1);
}

#[test]
fn test_range_change_invalidates() {
    let f = fixture();
    f.ruler.handle_click(&at_bar(25.0, 250.0));
    f.ruler.handle_crosshair_move(&at_bar(40.0, 250.0));
    f.ctx.tick();
    assert!(matches!(f.ruler.measurement(), Measurement::Live { .. }));

    f.ruler.handle_visible_range_changed();
    assert_eq!(f.ruler.measurement(), Measurement::Idle);
    assert!(f.ruler.with_surface(|s| s.is_empty()));
    assert!(!f.ruler.with_chart(|c| c.interactions_locked()));
}

#[test]
fn test_range_change_clears_finished_measurement() {
    let f = fixture();
    f.ruler.handle_click(&at_bar(25.0, 250.0));
    f.ruler.handle_click(&at_bar(50.0, 125.0));
    assert!(matches!(f.ruler.measurement(), Measurement::Finalized { .. }));
    assert!(!f.ruler.with_surface(|s| s.is_empty()));

    f.ruler.handle_visible_range_changed();
    assert_eq!(f.ruler.measurement(), Measurement::Idle);
    assert!(f.ruler.with_surface(|s| s.is_empty()));
    assert_eq!(f.reports.borrow().len(), 1);
}

#[test]
fn test_synced_viewport_clears_finished_measurement() {
    let ctx = SyncContext::default();
    let chart = Rc::new(RefCell::new(MemoryChart::new(100, 0.0, SamplingPeriod::H1)));
    let adapter = ChartViewportAdapter::new("a", chart.clone(), SamplingPeriod::H1, &ctx);
    let other = ChartViewportAdapter::new(
        "b",
        MemoryChart::new(100, 0.0, SamplingPeriod::H1),
        SamplingPeriod::H1,
        &ctx,
    );
    let ruler = RulerTool::new(
        chart.clone(),
        SeriesId(0),
        RecordingSurface::new(),
        ModeFlag::new(true),
        ModeFlag::new(false),
        &ctx,
    );
    let _follow = ruler.follow(&adapter);

    ruler.handle_click(&at_bar(25.0, 250.0));
    ruler.handle_click(&at_bar(50.0, 125.0));
    assert!(matches!(ruler.measurement(), Measurement::Finalized { .. }));

    other.handle_pointer_down();
    other.with_chart_mut(|c| c.user_set_visible_range(10.0, 60.0));
    other.handle_visible_range_changed();
    ctx.tick();

    assert_eq!(adapter.last_range(), Some(ViewportRange::new(10.0, 60.0, 0)));
    assert_eq!(ruler.measurement(), Measurement::Idle);
    assert!(ruler.with_surface(|s| s.is_empty()));
}

#[test]
fn test_follows_synced_viewport() {
    let ctx = SyncContext::default();
    let chart = Rc::new(RefCell::new(MemoryChart::new(100, 0.0, SamplingPeriod::H1)));
    let adapter = ChartViewportAdapter::new("a", chart.clone(), SamplingPeriod::H1, &ctx);
    let other = ChartViewportAdapter::new(
        "b",
        MemoryChart::new(100, 0.0, SamplingPeriod::H1),
        SamplingPeriod::H1,
        &ctx,
    );
    let ruler = RulerTool::new(
        chart.clone(),
        SeriesId(0),
        RecordingSurface::new(),
        ModeFlag::new(true),
        ModeFlag::new(false),
        &ctx,
    );
    let _follow = ruler.follow(&adapter);

    ruler.handle_click(&at_bar(25.0, 250.0));
    assert!(chart.borrow().interactions_locked());

    // Another chart of the group pans: this chart moves, the ruler resets.
    other.handle_pointer_down();
    other.with_chart_mut(|c| c.user_set_visible_range(10.0, 60.0));
    other.handle_visible_range_changed();
    ctx.tick();

    assert_eq!(adapter.last_range(), Some(ViewportRange::new(10.0, 60.0, 0)));
    assert_eq!(ruler.measurement(), Measurement::Idle);
    assert!(!chart.borrow().interactions_locked());
}

#[test]
fn test_mode_off_pushed() {
    let f = fixture();
    f.ruler.handle_click(&at_bar(25.0, 250.0));
    f.mode.set(false);
    assert_eq!(f.ruler.measurement(), Measurement::Idle);
    assert!(f.ruler.with_surface(|s| s.is_empty()));

    // Clicks are ignored while the mode is off.
    f.ruler.handle_click(&at_bar(25.0, 250.0));
    assert_eq!(f.ruler.measurement(), Measurement::Idle);
}

#[test]
fn test_silent_mode_off_seen_next_frame() {
    let f = fixture();
    f.ruler.handle_click(&at_bar(25.0, 250.0));

    f.mode.store(false);
    assert!(matches!(f.ruler.measurement(), Measurement::Armed { .. }));
    f.ctx.tick();
    assert_eq!(f.ruler.measurement(), Measurement::Idle);
    assert!(f.ruler.with_surface(|s| s.is_empty()));
}

#[test]
fn test_silent_mode_off_clears_finished_measurement() {
    let f = fixture();
    f.ruler.handle_click(&at_bar(25.0, 250.0));
    f.ruler.handle_click(&at_bar(50.0, 125.0));
    assert!(matches!(f.ruler.measurement(), Measurement::Finalized { .. }));

    f.mode.store(false);
    f.ctx.tick();
    assert_eq!(f.ruler.measurement(), Measurement::Idle);
    assert!(f.ruler.with_surface(|s| s.is_empty()));
}

#[test]
fn test_context_menu_closes() {
    let f = fixture();
    f.ruler.handle_click(&at_bar(25.0, 250.0));
    f.ruler.handle_context_menu();
    assert_eq!(f.ruler.measurement(), Measurement::Idle);
}

#[test]
fn test_pan_is_not_a_click() {
    let f = fixture();
    f.ruler.handle_click(&at_bar(25.0, 250.0));

    f.ruler.handle_pointer_down(PointerButton::Primary, DVec2::new(300.0, 200.0));
    // Small jitter stays a click.
    f.ruler.handle_pointer_move(DVec2::new(304.0, 203.0));
    assert!(matches!(f.ruler.measurement(), Measurement::Armed { .. }));

    f.ruler.handle_pointer_move(DVec2::new(320.0, 200.0));
    assert_eq!(f.ruler.measurement(), Measurement::Idle);
    f.ruler.handle_pointer_up();

    // The click the chart fires at the end of the drag is swallowed.
    f.ruler.handle_click(&at_bar(32.0, 200.0));
    assert_eq!(f.ruler.measurement(), Measurement::Idle);

    // A plain click afterwards arms again.
    f.ruler.handle_pointer_down(PointerButton::Primary, DVec2::new(300.0, 200.0));
    f.ruler.handle_pointer_up();
    f.ruler.handle_click(&at_bar(30.0, 200.0));
    assert!(matches!(f.ruler.measurement(), Measurement::Armed { .. }));
}

#[test]
fn test_secondary_button_drag_is_ignored() {
    let f = fixture();
    f.ruler.handle_click(&at_bar(25.0, 250.0));
    f.ruler.handle_pointer_down(PointerButton::Secondary, DVec2::new(300.0, 200.0));
    f.ruler.handle_pointer_move(DVec2::new(400.0, 200.0));
    assert!(matches!(f.ruler.measurement(), Measurement::Armed { .. }));
}

#[test]
fn test_magnet_snaps_to_nearest_field() {
    let f = fixture();
    f.magnet.set(true);
    let candle = SeriesDatum::Ohlc {
        open: 40.0,
        high: 60.0,
        low: 35.0,
        close: 52.0,
    };

    f.ruler.handle_click(&at_bar(25.0, 250.0).with_hovered(candle));
    let start = f.ruler.measurement().start().map(|p| p.price);
    assert_eq!(start, Some(52.0));

    f.ruler
        .handle_click(&at_bar(50.0, 125.0).with_hovered(SeriesDatum::Value(70.0)));
    let report = f.reports.borrow()[0].clone();
    assert_eq!(report.end.price, 70.0);
}

#[test]
fn test_unresolvable_click_is_ignored() {
    let f = fixture();
    // Left of the plot: no logical index and no time.
    f.ruler.handle_click(&ChartPointerEvent::at(DVec2::new(-20.0, 250.0)));
    assert_eq!(f.ruler.measurement(), Measurement::Idle);
    f.ruler.handle_click(&ChartPointerEvent::default());
    assert_eq!(f.ruler.measurement(), Measurement::Idle);
}

#[test]
fn test_redraw_reprojects_after_resize() {
    let ctx = SyncContext::default();
    let chart = Rc::new(RefCell::new(MemoryChart::new(100, 0.0, SamplingPeriod::H1)));
    let ruler = RulerTool::new(
        chart.clone(),
        SeriesId(0),
        RecordingSurface::new(),
        ModeFlag::new(true),
        ModeFlag::new(false),
        &ctx,
    );
    ruler.handle_click(&at_bar(25.0, 250.0));
    ruler.handle_click(&at_bar(50.0, 125.0));

    chart.borrow_mut().resize(2000.0, 500.0);
    ruler.redraw();
    ruler.with_surface(|s| {
        assert_eq!(s.lines[0].from, DVec2::new(500.0, 250.0));
        assert_eq!(s.lines[0].to, DVec2::new(1000.0, 125.0));
    });
}

#[test]
fn test_teardown_stops_everything() {
    let f = fixture();
    f.ruler.handle_click(&at_bar(25.0, 250.0));
    f.ruler.handle_crosshair_move(&at_bar(40.0, 250.0));

    f.ruler.teardown();
    f.ruler.teardown();
    assert_eq!(f.ruler.measurement(), Measurement::Idle);
    assert!(f.ruler.with_surface(|s| s.is_empty()));
    assert_eq!(f.ctx.frames().pending_count(), 0);

    f.mode.set(false);
    f.ruler.handle_click(&at_bar(25.0, 250.0));
    assert_eq!(f.ruler.measurement(), Measurement::Idle);
}
