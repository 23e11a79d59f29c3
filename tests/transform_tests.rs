use chart_sync::data_types::{SamplingPeriod, SeriesId};
use chart_sync::memory_chart::MemoryChart;
use chart_sync::transform::{ChartBackend, CoordinateTransform};
use glam::DVec2;
use std::cell::RefCell;
use std::rc::Rc;

const HOUR: f64 = 3600.0;

fn chart() -> MemoryChart {
    // 100 hourly bars over 1000x500 px, prices 0..100.
    MemoryChart::new(100, 0.0, SamplingPeriod::H1)
}

#[test]
fn test_time_and_pixel_conversions() {
    let chart = chart();
    let facade = CoordinateTransform::new(&chart);

    assert_eq!(facade.time_to_pixel(10.0 * HOUR), Some(100.0));
    assert_eq!(facade.pixel_to_time(100.0), Some(10.0 * HOUR));
    // Snaps to the nearest bar.
    assert_eq!(facade.pixel_to_time(104.0), Some(10.0 * HOUR));
    assert_eq!(facade.pixel_to_logical(250.0), Some(25.0));
}

#[test]
fn test_price_axis_is_inverted() {
    let chart = chart();
    let facade = CoordinateTransform::new(&chart);
    let series = SeriesId(0);

    assert_eq!(facade.price_to_pixel(series, 25.0), Some(375.0));
    assert_eq!(facade.pixel_to_price(series, 375.0), Some(25.0));
    assert_eq!(facade.pixel_to_price(series, 0.0), Some(100.0));
}

#[test]
fn test_unresolvable_points_are_none() {
    let chart = chart();
    let facade = CoordinateTransform::new(&chart);

    assert_eq!(facade.pixel_to_time(-5.0), None);
    // Past the last bar.
    assert_eq!(facade.pixel_to_time(1000.0), None);
    assert_eq!(facade.pixel_to_price(SeriesId(0), 600.0), None);
    assert_eq!(facade.pixel_to_price(SeriesId(7), 100.0), None);
    assert_eq!(facade.price_to_pixel(SeriesId(7), 10.0), None);
}

#[test]
fn test_non_finite_inputs_are_none() {
    let chart = chart();
    let facade = CoordinateTransform::new(&chart);

    assert_eq!(facade.time_to_pixel(f64::NAN), None);
    assert_eq!(facade.price_to_pixel(SeriesId(0), f64::INFINITY), None);
    assert_eq!(facade.pixel_to_time(f64::NAN), None);
    assert_eq!(facade.pixel_to_logical(f64::NEG_INFINITY), None);
    assert_eq!(facade.data_to_screen(SeriesId(0), f64::NAN, 10.0), None);
}

#[test]
fn test_data_to_screen() {
    let chart = chart();
    let facade = CoordinateTransform::new(&chart);
    assert_eq!(
        facade.data_to_screen(SeriesId(0), 50.0 * HOUR, 50.0),
        Some(DVec2::new(500.0, 250.0))
    );
    // Either axis missing means no point.
    assert_eq!(facade.data_to_screen(SeriesId(3), 50.0 * HOUR, 50.0), None);
}

#[test]
fn test_destroyed_chart_resolves_nothing() {
    let mut chart = chart();
    chart.destroy();
    let facade = CoordinateTransform::new(&chart);
    assert_eq!(facade.time_to_pixel(0.0), None);
    assert_eq!(facade.pixel_to_logical(10.0), None);
    assert_eq!(chart.visible_logical_range(), None);
}

#[test]
fn test_busy_shared_chart_yields_none() {
    let shared = Rc::new(RefCell::new(chart()));
    assert_eq!(shared.time_to_coordinate(0.0), Some(0.0));

    let _guard = shared.borrow_mut();
    assert_eq!(shared.time_to_coordinate(0.0), None);
    assert_eq!(shared.plot_size(), None);
}
