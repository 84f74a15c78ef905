//! Monetary value helpers for HT (pre-tax) and TTC (tax-included) amounts.
//!
//! Pure functions, no state. Every amount surfaced to a caller goes through
//! [`round2`]; line sums come from [`sum_line_totals`], which is the single
//! aggregation primitive used by the reconciliation paths.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds to exactly 2 decimal places, ties away from zero.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// A line item exposing its stored HT/TTC totals.
///
/// Stored totals are used as-is: line totals are a sale-time snapshot and are
/// not re-derived from unit price and quantity.
pub trait PricedLine {
    fn total_price_ht(&self) -> Decimal;
    fn total_price_ttc(&self) -> Decimal;
}

impl PricedLine for crate::entities::order_item::Model {
    fn total_price_ht(&self) -> Decimal {
        self.total_price_ht
    }

    fn total_price_ttc(&self) -> Decimal {
        self.total_price_ttc
    }
}

impl PricedLine for crate::entities::credit_note_item::Model {
    fn total_price_ht(&self) -> Decimal {
        self.total_price_ht
    }

    fn total_price_ttc(&self) -> Decimal {
        self.total_price_ttc
    }
}

/// Summed HT/TTC totals of a sequence of line items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineTotals {
    pub total_ht: Decimal,
    pub total_ttc: Decimal,
}

impl LineTotals {
    pub fn new(total_ht: Decimal, total_ttc: Decimal) -> Self {
        Self {
            total_ht,
            total_ttc,
        }
    }
}

/// Sums `total_price_ht`/`total_price_ttc` across `items`, rounded to 2
/// decimals. An empty sequence returns the caller-supplied fallback (also
/// rounded), or zero totals when no fallback is given.
pub fn sum_line_totals<'a, T, I>(items: I, fallback: Option<LineTotals>) -> LineTotals
where
    T: PricedLine + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut count = 0usize;
    let mut total_ht = Decimal::ZERO;
    let mut total_ttc = Decimal::ZERO;

    for item in items {
        count += 1;
        total_ht += item.total_price_ht();
        total_ttc += item.total_price_ttc();
    }

    if count == 0 {
        let fallback = fallback.unwrap_or_default();
        return LineTotals::new(round2(fallback.total_ht), round2(fallback.total_ttc));
    }

    LineTotals::new(round2(total_ht), round2(total_ttc))
}
