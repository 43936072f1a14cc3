//! Exchange price ticks (KRW market)
//!
//! Limit prices must sit on the tick of their price bracket. Math is done in
//! `Decimal` so a price already on its tick comes back unchanged.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

const VOLUME_DECIMALS: u32 = 8;

/// Tick size for the bracket `price` falls in
pub fn tick_size(price: Decimal) -> Decimal {
    if price >= Decimal::from(1_000_000) {
        Decimal::from(1000)
    } else if price >= Decimal::from(100_000) {
        Decimal::from(100)
    } else if price >= Decimal::from(1_000) {
        Decimal::from(10)
    } else if price >= Decimal::from(100) {
        Decimal::ONE
    } else if price >= Decimal::from(10) {
        Decimal::new(1, 1)
    } else {
        Decimal::new(1, 2)
    }
}

fn to_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    // Display gives the shortest round-tripping representation
    Decimal::from_str(&value.to_string()).ok()
}

/// Round `price` down to its tick. `None` for non-positive or non-finite
/// prices, or prices below the smallest tick.
pub fn quantize_decimal(price: f64) -> Option<Decimal> {
    let price = to_decimal(price)?;
    if price <= Decimal::ZERO {
        return None;
    }

    let tick = tick_size(price);
    let quantized = (price / tick).floor() * tick;

    if quantized <= Decimal::ZERO {
        return None;
    }
    Some(quantized.normalize())
}

pub fn quantize_price(price: f64) -> Option<f64> {
    quantize_decimal(price)?.to_f64()
}

/// Price string as submitted to the exchange
pub fn format_price(price: f64) -> Option<String> {
    quantize_decimal(price).map(|d| d.to_string())
}

/// Volume truncated to 8 decimals so a full-balance sell never overshoots
pub fn format_volume(volume: f64) -> Option<String> {
    let volume = to_decimal(volume)?;
    if volume <= Decimal::ZERO {
        return None;
    }

    let truncated = volume.round_dp_with_strategy(VOLUME_DECIMALS, RoundingStrategy::ToZero);
    if truncated.is_zero() {
        return None;
    }
    Some(truncated.normalize().to_string())
}
