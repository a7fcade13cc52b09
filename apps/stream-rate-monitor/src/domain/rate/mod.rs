//! Rate Aggregation and Display
//!
//! Computes the signed net flow rate across a set of payment streams
//! and renders it in a human-scaled unit.
//!
//! # Aggregation
//!
//! The net rate is inbound minus outbound, summed per second. Only
//! inbound streams are filtered by lifecycle state first; every outbound
//! stream counts against the rate whatever its state. A positive rate is
//! net inflow, a negative rate net outflow.
//!
//! # Unit ladder
//!
//! A per-second rate below one whole token is escalated through coarser
//! units until its magnitude reaches one:
//!
//! ```text
//! s -(x60)-> min -(x60)-> hr -(x24)-> day -(x7)-> week -(x4)-> month -(x12)-> year
//! ```
//!
//! The walk happens at full precision; rounding to display digits is
//! applied once, at the end.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::stream::{StreamRecord, TOKEN_SYMBOL};

// =============================================================================
// Net rate
// =============================================================================

/// Signed net flow rate in APT per second.
///
/// `inbound_active` should already be filtered to active streams;
/// `outbound` is taken whole. Empty inputs yield `0.0`. Summation is a
/// left-to-right fold over each side.
#[must_use]
pub fn net_rate_per_second(inbound_active: &[StreamRecord], outbound: &[StreamRecord]) -> f64 {
    let inflow: f64 = inbound_active.iter().map(StreamRecord::rate_per_second).sum();
    let outflow: f64 = outbound.iter().map(StreamRecord::rate_per_second).sum();
    inflow - outflow
}

// =============================================================================
// Unit ladder
// =============================================================================

/// Time unit a rate is expressed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateUnit {
    /// Per second.
    Second,
    /// Per minute.
    Minute,
    /// Per hour.
    Hour,
    /// Per day.
    Day,
    /// Per week.
    Week,
    /// Per month (four weeks).
    Month,
    /// Per year (twelve months).
    Year,
}

impl RateUnit {
    /// Display label for this unit.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Second => "s",
            Self::Minute => "min",
            Self::Hour => "hr",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Conversion factor to the next coarser unit, if one exists.
    const fn next(self) -> Option<(f64, Self)> {
        match self {
            Self::Second => Some((60.0, Self::Minute)),
            Self::Minute => Some((60.0, Self::Hour)),
            Self::Hour => Some((24.0, Self::Day)),
            Self::Day => Some((7.0, Self::Week)),
            Self::Week => Some((4.0, Self::Month)),
            Self::Month => Some((12.0, Self::Year)),
            Self::Year => None,
        }
    }
}

impl fmt::Display for RateUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Scaled rate
// =============================================================================

/// A rate escalated to the unit where its magnitude is human-readable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaledRate {
    /// Magnitude in `unit`, sign preserved, unrounded.
    pub value: f64,
    /// Unit the magnitude is expressed against.
    pub unit: RateUnit,
}

impl ScaledRate {
    /// Escalate a per-second rate up the unit ladder.
    ///
    /// Walks coarser units until the magnitude reaches one (a magnitude
    /// of exactly one stops, so `1.0` stays in seconds) or the ladder is
    /// exhausted at years. An exactly-zero rate short-circuits to zero
    /// per second, which keeps the zero display stable instead of
    /// escalating to years.
    #[must_use]
    pub fn from_per_second(rate_per_second: f64) -> Self {
        if rate_per_second == 0.0 {
            return Self {
                value: 0.0,
                unit: RateUnit::Second,
            };
        }

        let mut value = rate_per_second;
        let mut unit = RateUnit::Second;
        while value.abs() < 1.0 {
            let Some((factor, next)) = unit.next() else {
                break;
            };
            value *= factor;
            unit = next;
        }

        Self { value, unit }
    }
}

impl fmt::Display for ScaledRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {TOKEN_SYMBOL} / {}",
            format_magnitude(self.value),
            self.unit.label()
        )
    }
}

// =============================================================================
// Magnitude formatting
// =============================================================================

/// Format a magnitude with at most three fraction digits, trailing zeros
/// trimmed and the integer part grouped in thousands.
///
/// Magnitudes outside [`Decimal`] range fall back to plain formatting.
fn format_magnitude(value: f64) -> String {
    let Ok(decimal) = Decimal::try_from(value) else {
        return format!("{value}");
    };
    let rounded = decimal
        .round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    group_thousands(&rounded.to_string())
}

/// Insert comma separators into the integer part of a plain decimal string.
fn group_thousands(raw: &str) -> String {
    let (sign, unsigned) = raw.strip_prefix('-').map_or(("", raw), |rest| ("-", rest));
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };

    let digits = int_part.as_bytes();
    let mut grouped = String::with_capacity(raw.len() + digits.len() / 3);
    grouped.push_str(sign);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(char::from(*digit));
    }

    if let Some(frac_part) = frac_part {
        grouped.push('.');
        grouped.push_str(frac_part);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stream::AccountAddress;
    use proptest::prelude::*;
    use test_case::test_case;

    fn record(start_time_ms: u64, duration_ms: u64, amount_apt: f64) -> StreamRecord {
        StreamRecord {
            sender: AccountAddress::new("0xabc"),
            recipient: AccountAddress::new("0xdef"),
            amount_apt,
            start_time_ms,
            duration_ms,
            stream_id: 7,
        }
    }

    #[test]
    fn net_rate_of_nothing_is_zero() {
        assert_eq!(net_rate_per_second(&[], &[]), 0.0);
    }

    #[test]
    fn net_rate_sums_inbound_minus_outbound() {
        let inbound = vec![record(1, 1_000, 2.0), record(1, 2_000, 2.0)];
        let outbound = vec![record(1, 1_000, 1.0)];
        // 0.002 + 0.001 - 0.001
        let net = net_rate_per_second(&inbound, &outbound);
        assert!((net - 0.002).abs() < 1e-12);
    }

    #[test]
    fn outbound_only_is_negative() {
        let outbound = vec![record(1, 1_000, 3_600.0)];
        let net = net_rate_per_second(&[], &outbound);
        assert!((net + 3.6).abs() < 1e-12);
    }

    #[test]
    fn zero_duration_streams_do_not_poison_the_sum() {
        let inbound = vec![record(1, 0, 500.0), record(1, 1_000, 1.0)];
        let net = net_rate_per_second(&inbound, &[]);
        assert!(net.is_finite());
        assert!((net - 0.001).abs() < 1e-12);
    }

    #[test]
    fn opposing_streams_cancel_to_zero_display() {
        let inbound = vec![record(1_000, 100_000, 100.0)];
        let outbound = vec![record(1_000, 50_000, 50.0)];
        let net = net_rate_per_second(&inbound, &outbound);
        assert_eq!(ScaledRate::from_per_second(net).to_string(), "0 APT / s");
    }

    #[test]
    fn second_scale_stream_displays_in_seconds() {
        let inbound = vec![record(1_000, 1_000, 3_600.0)];
        let net = net_rate_per_second(&inbound, &[]);
        assert_eq!(ScaledRate::from_per_second(net).to_string(), "3.6 APT / s");
    }

    #[test]
    fn hourly_stream_displays_daily_rate() {
        let inbound = vec![record(1_000, 3_600_000, 60.0)];
        let net = net_rate_per_second(&inbound, &[]);
        assert_eq!(
            ScaledRate::from_per_second(net).to_string(),
            "1.44 APT / day"
        );
    }

    #[test_case(0.0, "0 APT / s" ; "zero short circuits to seconds")]
    #[test_case(3.6, "3.6 APT / s" ; "above one stays in seconds")]
    #[test_case(1.0, "1 APT / s" ; "exactly one stays in seconds")]
    #[test_case(0.5, "30 APT / min" ; "sub one escalates to minutes")]
    #[test_case(0.001, "3.6 APT / hr" ; "milli rate escalates to hours")]
    #[test_case(-3.6, "-3.6 APT / s" ; "negative stays in seconds")]
    #[test_case(-0.001, "-3.6 APT / hr" ; "negative escalates to hours")]
    #[test_case(1e-9, "0.029 APT / year" ; "ladder exhausts at years")]
    fn scaled_rate_display(rate: f64, expected: &str) {
        assert_eq!(ScaledRate::from_per_second(rate).to_string(), expected);
    }

    #[test]
    fn escalation_stops_at_first_unit_reaching_one() {
        let scaled = ScaledRate::from_per_second(0.5);
        assert_eq!(scaled.unit, RateUnit::Minute);
        assert!((scaled.value - 30.0).abs() < 1e-12);
    }

    #[test]
    fn ladder_exhaustion_keeps_sub_one_value() {
        let scaled = ScaledRate::from_per_second(1e-9);
        assert_eq!(scaled.unit, RateUnit::Year);
        assert!(scaled.value < 1.0);
    }

    #[test]
    fn unit_labels() {
        assert_eq!(RateUnit::Second.label(), "s");
        assert_eq!(RateUnit::Minute.label(), "min");
        assert_eq!(RateUnit::Hour.label(), "hr");
        assert_eq!(RateUnit::Day.label(), "day");
        assert_eq!(RateUnit::Week.label(), "week");
        assert_eq!(RateUnit::Month.label(), "month");
        assert_eq!(RateUnit::Year.to_string(), "year");
    }

    #[test]
    fn magnitude_rounds_to_three_digits() {
        assert_eq!(format_magnitude(1.4444), "1.444");
        assert_eq!(format_magnitude(1.4446), "1.445");
        assert_eq!(format_magnitude(-1.4446), "-1.445");
    }

    #[test]
    fn magnitude_trims_trailing_zeros() {
        assert_eq!(format_magnitude(2.5), "2.5");
        assert_eq!(format_magnitude(2.0), "2");
        assert_eq!(format_magnitude(0.0), "0");
    }

    #[test]
    fn magnitude_groups_thousands() {
        assert_eq!(format_magnitude(1234.5678), "1,234.568");
        assert_eq!(format_magnitude(1_000_000.0), "1,000,000");
        assert_eq!(format_magnitude(-987_654.321), "-987,654.321");
        assert_eq!(format_magnitude(123.0), "123");
    }

    proptest! {
        #[test]
        fn aggregation_is_additive_across_partitions(
            a in prop::collection::vec((1u64..1_000_000_000, 0.0f64..1_000.0), 0..16),
            b in prop::collection::vec((1u64..1_000_000_000, 0.0f64..1_000.0), 0..16),
        ) {
            let build = |pairs: &[(u64, f64)]| -> Vec<StreamRecord> {
                pairs
                    .iter()
                    .map(|&(duration, amount)| record(1, duration, amount))
                    .collect()
            };

            let a_records = build(&a);
            let b_records = build(&b);
            let mut combined = a_records.clone();
            combined.extend(b_records.clone());

            let split = net_rate_per_second(&a_records, &[]) + net_rate_per_second(&b_records, &[]);
            let joint = net_rate_per_second(&combined, &[]);
            prop_assert!((joint - split).abs() < 1e-9);
        }

        #[test]
        fn escalation_preserves_sign(rate in -1e6f64..1e6) {
            prop_assume!(rate != 0.0);
            let scaled = ScaledRate::from_per_second(rate);
            prop_assert_eq!(scaled.value.is_sign_negative(), rate.is_sign_negative());
        }

        #[test]
        fn escalated_magnitude_reaches_one_or_exhausts(rate in -1e6f64..1e6) {
            prop_assume!(rate != 0.0);
            let scaled = ScaledRate::from_per_second(rate);
            prop_assert!(scaled.value.abs() >= 1.0 || scaled.unit == RateUnit::Year);
        }
    }
}
