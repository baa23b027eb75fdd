use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use crate::model::*;

// ── Availability Algorithm ────────────────────────────────────────

/// Umbrella ids carrying at least one reservation that overlaps `query`.
pub fn occupied_umbrellas<'a>(
    reservations: impl IntoIterator<Item = &'a Reservation>,
    query: &DateSpan,
) -> BTreeSet<UmbrellaId> {
    reservations
        .into_iter()
        .filter(|r| r.span.overlaps(query))
        .map(|r| r.umbrella_id)
        .collect()
}

/// Ascending complement of `occupied` within `ids`.
pub fn free_umbrellas(
    ids: RangeInclusive<UmbrellaId>,
    occupied: &BTreeSet<UmbrellaId>,
) -> Vec<UmbrellaId> {
    ids.filter(|id| !occupied.contains(id)).collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use ulid::Ulid;

    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, m, d).unwrap()
    }

    fn on(umbrella_id: UmbrellaId, start: NaiveDate, end: NaiveDate) -> Reservation {
        Reservation {
            id: Ulid::new(),
            customer: CustomerId::from("bea"),
            number_of_seats: 2,
            span: DateSpan::new(start, end),
            umbrella_id,
        }
    }

    #[test]
    fn occupied_collects_each_umbrella_once() {
        let rs = vec![
            on(3, day(7, 1), day(7, 3)),
            on(3, day(7, 5), day(7, 6)),
            on(7, day(7, 2), day(7, 2)),
            on(9, day(8, 1), day(8, 2)),
        ];
        let occupied = occupied_umbrellas(&rs, &DateSpan::new(day(7, 1), day(7, 31)));
        assert_eq!(occupied.into_iter().collect::<Vec<_>>(), vec![3, 7]);
    }

    #[test]
    fn free_is_sorted_complement() {
        let occupied: BTreeSet<_> = [2, 4].into_iter().collect();
        assert_eq!(free_umbrellas(1..=6, &occupied), vec![1, 3, 5, 6]);
    }

    #[test]
    fn free_ignores_ids_outside_range() {
        let occupied: BTreeSet<_> = [0, 11].into_iter().collect();
        assert_eq!(free_umbrellas(1..=3, &occupied), vec![1, 2, 3]);
    }

    #[test]
    fn nothing_free_when_all_occupied() {
        let occupied: BTreeSet<_> = (1..=4).collect();
        assert!(free_umbrellas(1..=4, &occupied).is_empty());
    }
}
