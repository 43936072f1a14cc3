/// Calculate Simple Moving Average (SMA) over the last `period` prices
///
/// `prices` are in chronological order (oldest first).
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: f64 = prices.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Moving averages for every window length from `min_period` up to the
/// full history, shortest window first. Every window ends at the latest price.
///
/// `prices` are in chronological order (oldest first).
pub fn sma_ladder(prices: &[f64], min_period: usize) -> Vec<f64> {
    (min_period.max(1)..=prices.len())
        .filter_map(|period| calculate_sma(prices, period))
        .collect()
}
