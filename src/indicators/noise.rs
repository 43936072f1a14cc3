use crate::models::DailyBar;

/// Noise ratio of a single bar: `1 - |open - close| / (high - low)`
///
/// Close to 1 when the day went nowhere despite its range, close to 0 when
/// the whole range was a directional move. `None` for a bar without range.
pub fn noise_ratio(bar: &DailyBar) -> Option<f64> {
    let range = bar.range();
    if range <= 0.0 || !range.is_finite() {
        return None;
    }

    Some(1.0 - (bar.open_price - bar.trade_price).abs() / range)
}

/// Mean noise ratio across `bars`, skipping bars with a zero range
///
/// Returns `None` when no bar has a usable range.
pub fn average_noise(bars: &[DailyBar]) -> Option<f64> {
    let ratios: Vec<f64> = bars.iter().filter_map(noise_ratio).collect();

    if ratios.is_empty() {
        return None;
    }

    Some(ratios.iter().sum::<f64>() / ratios.len() as f64)
}
