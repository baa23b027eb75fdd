use crate::model::UmbrellaId;

pub const MIN_SEAT: u32 = 2;
pub const MAX_SEAT: u32 = 4;

pub const MIN_UMBRELLA_ID: UmbrellaId = 1;
pub const MAX_UMBRELLA_ID: UmbrellaId = 100;

/// Longest accepted customer name (matches common username column widths).
pub const MAX_CUSTOMER_LEN: usize = 150;

/// Hard cap on stored reservations for a single umbrella.
pub const MAX_RESERVATIONS_PER_UMBRELLA: usize = 10_000;
