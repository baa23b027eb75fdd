use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{ReservationId, UmbrellaId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    NumberOfSeats,
    UmbrellaId,
    StartDate,
    EndDate,
    Customer,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::NumberOfSeats => "number_of_seats",
            Field::UmbrellaId => "umbrella_id",
            Field::StartDate => "start_date",
            Field::EndDate => "end_date",
            Field::Customer => "customer",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structural failure attached to a single input field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{field}: {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: Field,
        min: i64,
        max: i64,
        value: i64,
    },
    #[error("{field}: reservation date {date} can't be in the past")]
    PastDate { field: Field, date: NaiveDate },
    #[error("{field}: must not be empty")]
    Empty { field: Field },
}

impl FieldError {
    pub fn field(&self) -> Field {
        match self {
            FieldError::OutOfRange { field, .. }
            | FieldError::PastDate { field, .. }
            | FieldError::Empty { field } => *field,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid reservation: {}", join_field_errors(.0))]
    Invalid(Vec<FieldError>),
    #[error("end date {end} must not be before start date {start}")]
    InvalidDateOrder { start: NaiveDate, end: NaiveDate },
    #[error("umbrella {umbrella_id} is already reserved in that period (reservation {conflicting})")]
    OverlapConflict {
        umbrella_id: UmbrellaId,
        conflicting: ReservationId,
    },
    #[error("reservation not found: {0}")]
    NotFound(ReservationId),
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
}

impl EngineError {
    /// Short label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            EngineError::Invalid(_) => "invalid",
            EngineError::InvalidDateOrder { .. } => "date_order",
            EngineError::OverlapConflict { .. } => "overlap",
            EngineError::NotFound(_) => "not_found",
            EngineError::Forbidden(_) => "forbidden",
            EngineError::LimitExceeded(_) => "limit",
        }
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
