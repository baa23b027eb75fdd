use std::fmt;

use chrono::NaiveDate;
use ulid::Ulid;

pub type ReservationId = Ulid;
pub type UmbrellaId = u32;

/// Login name of the identity that owns a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CustomerId(String);

impl CustomerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CustomerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Closed interval `[start, end]` of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateSpan {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start <= end, "DateSpan start must not be after end");
        Self { start, end }
    }

    /// Inclusive day count, 1 for a same-day span.
    pub fn booked_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Both endpoints are inclusive, so sharing a single day is an overlap.
    pub fn overlaps(&self, other: &DateSpan) -> bool {
        self.start <= other.end && self.end >= other.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: ReservationId,
    pub customer: CustomerId,
    pub number_of_seats: u32,
    pub span: DateSpan,
    pub umbrella_id: UmbrellaId,
}

impl Reservation {
    pub fn start_date(&self) -> NaiveDate {
        self.span.start
    }

    pub fn end_date(&self) -> NaiveDate {
        self.span.end
    }
}

impl fmt::Display for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} from {} to {}",
            self.id, self.customer, self.span.start, self.span.end
        )
    }
}

/// Unvalidated creation request as it arrives from the boundary.
///
/// Numeric fields are wide and signed so that out-of-range input survives
/// parsing and is reported by field validation instead of a parse error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationRequest {
    /// `None` books for the requesting actor.
    pub customer: Option<CustomerId>,
    pub number_of_seats: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub umbrella_id: i64,
}

/// The identity issuing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: CustomerId,
    pub manager: bool,
}

impl Actor {
    pub fn customer(id: impl Into<String>) -> Self {
        Self {
            id: CustomerId::new(id),
            manager: false,
        }
    }

    pub fn manager(id: impl Into<String>) -> Self {
        Self {
            id: CustomerId::new(id),
            manager: true,
        }
    }
}

/// All reservations on one umbrella, sorted by `span.start`.
#[derive(Debug, Clone)]
pub struct UmbrellaState {
    pub id: UmbrellaId,
    pub reservations: Vec<Reservation>,
}

impl UmbrellaState {
    pub fn new(id: UmbrellaId) -> Self {
        Self {
            id,
            reservations: Vec::new(),
        }
    }

    /// Insert reservation maintaining sort order by start date.
    pub fn insert(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .binary_search_by_key(&reservation.span.start, |r| r.span.start)
            .unwrap_or_else(|e| e);
        self.reservations.insert(pos, reservation);
    }

    pub fn remove(&mut self, id: ReservationId) -> Option<Reservation> {
        let pos = self.reservations.iter().position(|r| r.id == id)?;
        Some(self.reservations.remove(pos))
    }

    pub fn get(&self, id: ReservationId) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == id)
    }

    /// Reservations whose closed span intersects `query`.
    /// Everything at index >= right_bound starts after `query.end`.
    pub fn overlapping(&self, query: &DateSpan) -> impl Iterator<Item = &Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| r.span.start <= query.end);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.span.end >= query.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, m, d).unwrap()
    }

    fn reservation(start: NaiveDate, end: NaiveDate) -> Reservation {
        Reservation {
            id: Ulid::new(),
            customer: CustomerId::from("ada"),
            number_of_seats: 2,
            span: DateSpan::new(start, end),
            umbrella_id: 1,
        }
    }

    #[test]
    fn booked_days_is_inclusive() {
        assert_eq!(DateSpan::new(day(7, 1), day(7, 1)).booked_days(), 1);
        assert_eq!(DateSpan::new(day(7, 1), day(7, 2)).booked_days(), 2);
        assert_eq!(DateSpan::new(day(6, 30), day(7, 3)).booked_days(), 4);
    }

    #[test]
    fn span_overlap_is_closed() {
        let a = DateSpan::new(day(12, 20), day(12, 25));
        let touching = DateSpan::new(day(12, 25), day(12, 27));
        let after = DateSpan::new(day(12, 26), day(12, 27));
        assert!(a.overlaps(&touching));
        assert!(touching.overlaps(&a));
        assert!(!a.overlaps(&after));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn display_label() {
        let r = reservation(day(12, 20), day(12, 25));
        assert_eq!(
            r.to_string(),
            format!("{}: ada from 2030-12-20 to 2030-12-25", r.id)
        );
    }

    #[test]
    fn insert_keeps_start_order() {
        let mut us = UmbrellaState::new(1);
        us.insert(reservation(day(8, 10), day(8, 12)));
        us.insert(reservation(day(8, 1), day(8, 2)));
        us.insert(reservation(day(8, 5), day(8, 6)));
        let starts: Vec<_> = us.reservations.iter().map(|r| r.span.start).collect();
        assert_eq!(starts, vec![day(8, 1), day(8, 5), day(8, 10)]);
    }

    #[test]
    fn remove_middle_preserves_order() {
        let mut us = UmbrellaState::new(1);
        let rs: Vec<_> = (1..=3)
            .map(|i| reservation(day(8, i * 3), day(8, i * 3 + 1)))
            .collect();
        for r in &rs {
            us.insert(r.clone());
        }
        assert_eq!(us.remove(rs[1].id), Some(rs[1].clone()));
        assert_eq!(us.reservations, vec![rs[0].clone(), rs[2].clone()]);
        assert!(us.remove(rs[1].id).is_none());
    }

    #[test]
    fn overlapping_skips_past_and_future() {
        let mut us = UmbrellaState::new(1);
        us.insert(reservation(day(8, 1), day(8, 3)));
        us.insert(reservation(day(8, 9), day(8, 12)));
        us.insert(reservation(day(8, 20), day(8, 22)));

        let hits: Vec<_> = us
            .overlapping(&DateSpan::new(day(8, 5), day(8, 10)))
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].span.start, day(8, 9));
    }

    #[test]
    fn overlapping_includes_shared_endpoint() {
        let mut us = UmbrellaState::new(1);
        us.insert(reservation(day(8, 1), day(8, 5)));
        us.insert(reservation(day(8, 10), day(8, 12)));
        let hits: Vec<_> = us
            .overlapping(&DateSpan::new(day(8, 5), day(8, 10)))
            .collect();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn overlapping_long_reservation_spanning_query() {
        let mut us = UmbrellaState::new(1);
        us.insert(reservation(day(6, 1), day(9, 30)));
        let hits = us
            .overlapping(&DateSpan::new(day(7, 14), day(7, 14)))
            .count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn overlapping_empty_umbrella() {
        let us = UmbrellaState::new(1);
        assert_eq!(
            us.overlapping(&DateSpan::new(day(1, 1), day(12, 31))).count(),
            0
        );
    }
}
