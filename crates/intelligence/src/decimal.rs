//! Conversions between the numeric core (`f64`) and wire decimals.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places carried by every quantity the core reports.
pub const SCALE: u32 = 4;

/// Round an `f64` to a reported decimal. Non-finite input maps to zero; the
/// forecasting engine rejects non-finite output before it gets here.
pub fn to_decimal(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero))
        .unwrap_or(Decimal::ZERO)
}

pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

pub fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Round `qty` up to the next multiple of `unit`. Non-positive units are ignored.
pub fn round_up_to_unit(qty: Decimal, unit: Option<Decimal>) -> Decimal {
    match unit {
        Some(unit) if unit > Decimal::ZERO => {
            let multiples = (qty / unit).ceil();
            round(multiples * unit)
        }
        _ => round(qty),
    }
}
