use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::engine::{validate_date_order, EngineError};
use crate::model::DateSpan;

pub const DEFAULT_BASE_PRICE: Decimal = Decimal::from_parts(20, 0, 0, false, 0);
pub const DEFAULT_PRICE_PER_SEAT_DAY: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// Price list for a beach, together with the rounding applied to every quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tariff {
    pub base: Decimal,
    pub per_seat_day: Decimal,
    /// Decimal places kept in a price (currency minor unit).
    pub scale: u32,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_PRICE,
            per_seat_day: DEFAULT_PRICE_PER_SEAT_DAY,
            scale: 2,
        }
    }
}

impl Tariff {
    pub fn new(base: Decimal, per_seat_day: Decimal) -> Self {
        Self {
            base,
            per_seat_day,
            ..Self::default()
        }
    }

    /// `base + per_seat_day * seats * booked_days`, rounded half-to-even.
    pub fn price(&self, number_of_seats: u32, span: &DateSpan) -> Decimal {
        let seats = Decimal::from(number_of_seats);
        let days = Decimal::from(span.booked_days());
        (self.base + self.per_seat_day * seats * days)
            .round_dp_with_strategy(self.scale, RoundingStrategy::MidpointNearestEven)
    }

    /// Like [`Tariff::price`] for raw dates; fails when `end` precedes `start`.
    pub fn quote(
        &self,
        number_of_seats: u32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal, EngineError> {
        let span = validate_date_order(start, end)?;
        Ok(self.price(number_of_seats, &span))
    }
}
