use chrono::NaiveDate;

use crate::limits::*;
use crate::model::*;

use super::error::{Field, FieldError};
use super::EngineError;

/// A reservation about to be stored, after field and date-order checks.
///
/// `id` is `None` for a fresh creation; when present, the stored reservation
/// with that id is skipped by the overlap check.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub id: Option<ReservationId>,
    pub umbrella_id: UmbrellaId,
    pub span: DateSpan,
}

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn check_range(field: Field, value: i64, min: i64, max: i64, errors: &mut Vec<FieldError>) {
    if value < min || value > max {
        errors.push(FieldError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
}

fn check_not_past(field: Field, date: NaiveDate, today: NaiveDate, errors: &mut Vec<FieldError>) {
    if date < today {
        errors.push(FieldError::PastDate { field, date });
    }
}

/// Per-field structural checks. Every failing field is reported.
pub fn validate_fields(request: &ReservationRequest, today: NaiveDate) -> Result<(), EngineError> {
    let mut errors = Vec::new();
    check_range(
        Field::NumberOfSeats,
        request.number_of_seats,
        MIN_SEAT.into(),
        MAX_SEAT.into(),
        &mut errors,
    );
    check_range(
        Field::UmbrellaId,
        request.umbrella_id,
        MIN_UMBRELLA_ID.into(),
        MAX_UMBRELLA_ID.into(),
        &mut errors,
    );
    check_not_past(Field::StartDate, request.start_date, today, &mut errors);
    check_not_past(Field::EndDate, request.end_date, today, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Invalid(errors))
    }
}

pub fn validate_date_order(start: NaiveDate, end: NaiveDate) -> Result<DateSpan, EngineError> {
    if start > end {
        return Err(EngineError::InvalidDateOrder { start, end });
    }
    Ok(DateSpan::new(start, end))
}

/// Closed-interval overlap check against reservations of the candidate's umbrella.
/// Reservations on other umbrellas are ignored even if passed in.
pub fn validate_no_overlap<'a>(
    candidate: &Candidate,
    existing: impl IntoIterator<Item = &'a Reservation>,
) -> Result<(), EngineError> {
    for r in existing {
        if r.umbrella_id != candidate.umbrella_id || Some(r.id) == candidate.id {
            continue;
        }
        if r.span.overlaps(&candidate.span) {
            return Err(EngineError::OverlapConflict {
                umbrella_id: candidate.umbrella_id,
                conflicting: r.id,
            });
        }
    }
    Ok(())
}

pub(crate) fn validate_customer(customer: &CustomerId) -> Result<(), EngineError> {
    if customer.as_str().is_empty() {
        return Err(EngineError::Invalid(vec![FieldError::Empty {
            field: Field::Customer,
        }]));
    }
    if customer.as_str().len() > MAX_CUSTOMER_LEN {
        return Err(EngineError::LimitExceeded("customer name too long"));
    }
    Ok(())
}
