use chrono::TimeDelta;

/// Formats an elapsed time with the largest applicable units.
///
/// Days and hours are omitted while they are leading zeros, minutes are
/// always shown and seconds are truncated: 90000 s gives `1d 1h 0m`.
pub fn format_duration(seconds: f64) -> String {
    let secs = if seconds.is_finite() {
        seconds.max(0.0).floor() as i64
    } else {
        0
    };
    let delta = TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::zero());

    let days = delta.num_days();
    let hours = delta.num_hours() - days * 24;
    let minutes = delta.num_minutes() - delta.num_hours() * 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Price with four decimals, as shown in ruler labels.
pub fn format_price(value: f64) -> String {
    format!("{value:.4}")
}

/// Signed percentage with a direction marker, `None` renders a dash.
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(pct) if pct >= 0.0 => format!("▲ {pct:.2}%"),
        Some(pct) => format!("▼ {pct:.2}%"),
        None => "—".to_string(),
    }
}
