mod availability;
mod error;
mod mutations;
mod queries;
mod store;
mod validation;

pub use availability::{free_umbrellas, occupied_umbrellas};
pub use error::{EngineError, Field, FieldError};
pub use store::InMemoryStore;
pub use validation::{validate_date_order, validate_fields, validate_no_overlap, Candidate};

use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use tokio::sync::RwLock;
use ulid::Generator;

use crate::limits::{MAX_UMBRELLA_ID, MIN_UMBRELLA_ID};
use crate::model::*;
use crate::pricing::Tariff;

pub type SharedUmbrellaState = Arc<RwLock<UmbrellaState>>;

pub struct Engine {
    pub(super) store: InMemoryStore,
    tariff: Tariff,
    /// Monotonic within a millisecond, so id order is creation order.
    ids: Mutex<Generator>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Tariff::default())
    }
}

impl Engine {
    pub fn new(tariff: Tariff) -> Self {
        Self {
            store: InMemoryStore::new(MIN_UMBRELLA_ID..=MAX_UMBRELLA_ID),
            tariff,
            ids: Mutex::new(Generator::new()),
        }
    }

    pub(super) fn next_id(&self) -> Result<ReservationId, EngineError> {
        let mut ids = self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        ids.generate()
            .map_err(|_| EngineError::LimitExceeded("reservation ids exhausted for this millisecond"))
    }

    /// Price derived on read from the reservation's fields.
    pub fn price_of(&self, reservation: &Reservation) -> Decimal {
        self.tariff
            .price(reservation.number_of_seats, &reservation.span)
    }

    pub fn reservation_count(&self) -> usize {
        self.store.reservation_count()
    }

    /// Lookup reservation → umbrella and acquire that umbrella's write lock.
    pub(super) async fn resolve_reservation_write(
        &self,
        id: &ReservationId,
    ) -> Result<tokio::sync::OwnedRwLockWriteGuard<UmbrellaState>, EngineError> {
        let umbrella_id = self
            .store
            .umbrella_for(id)
            .ok_or(EngineError::NotFound(*id))?;
        let us = self
            .store
            .get_umbrella(umbrella_id)
            .ok_or(EngineError::NotFound(*id))?;
        Ok(us.write_owned().await)
    }
}
