use crate::data_types::{ChartPointerEvent, MeasurementPoint, SeriesDatum, SeriesId};
use crate::error::{SyncError, SyncResult};
use crate::transform::{ChartBackend, CoordinateTransform};

/// Resolves a pointer event to a measurement anchor.
///
/// Time comes from the event or from inverting x. In magnet mode the price
/// snaps to the hovered datum (closest OHLC field, or the single value);
/// otherwise it is the inverted y.
pub fn resolve_point<C: ChartBackend + ?Sized>(
    chart: &C,
    series: SeriesId,
    event: &ChartPointerEvent,
    magnet: bool,
) -> SyncResult<MeasurementPoint> {
    let point = event.point.ok_or(SyncError::UnresolvablePoint)?;
    let facade = CoordinateTransform::new(chart);

    let time = event
        .time
        .filter(|t| t.is_finite())
        .or_else(|| facade.pixel_to_time(point.x))
        .ok_or(SyncError::UnresolvablePoint)?;

    let raw_price = facade.pixel_to_price(series, point.y);
    let price = match (magnet, event.hovered) {
        (true, Some(datum @ SeriesDatum::Ohlc { .. })) => {
            raw_price.map(|raw| datum.closest_to(raw))
        }
        (true, Some(SeriesDatum::Value(value))) => Some(value).filter(|v| v.is_finite()),
        _ => raw_price,
    }
    .ok_or(SyncError::UnresolvablePoint)?;

    let logical_index = facade
        .pixel_to_logical(point.x)
        .ok_or(SyncError::MissingCoordinateMapping("logical index"))?;

    Ok(MeasurementPoint {
        time,
        price,
        pixel: point,
        logical_index,
    })
}
