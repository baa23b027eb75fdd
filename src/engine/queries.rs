use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::access::{policy, Operation};
use crate::limits::*;
use crate::model::*;

use super::{free_umbrellas, occupied_umbrellas, validate_date_order, Engine, EngineError};

impl Engine {
    /// Managers get every reservation, everyone else only their own. Ordered by id.
    pub async fn list_reservations(&self, actor: &Actor) -> Vec<Reservation> {
        let policy = policy(Operation::ListReservations, actor);
        let mut out = Vec::new();
        for (_, us) in self.store.umbrellas() {
            let guard = us.read().await;
            out.extend(
                guard
                    .reservations
                    .iter()
                    .filter(|r| policy.permits(&actor.id, r))
                    .cloned(),
            );
        }
        out.sort_by_key(|r| r.id);
        out
    }

    pub async fn get_reservation(
        &self,
        id: ReservationId,
        actor: &Actor,
    ) -> Result<Reservation, EngineError> {
        let policy = policy(Operation::GetReservation, actor);
        let umbrella_id = self
            .store
            .umbrella_for(&id)
            .ok_or(EngineError::NotFound(id))?;
        let us = self
            .store
            .get_umbrella(umbrella_id)
            .ok_or(EngineError::NotFound(id))?;
        let guard = us.read().await;
        guard
            .get(id)
            .filter(|r| policy.permits(&actor.id, r))
            .cloned()
            .ok_or(EngineError::NotFound(id))
    }

    /// Umbrella ids with no reservation overlapping `[start, end]`, ascending.
    pub async fn free_umbrellas(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<UmbrellaId>, EngineError> {
        let query = validate_date_order(start, end)?;
        let mut occupied = BTreeSet::new();
        for (_, us) in self.store.umbrellas() {
            let guard = us.read().await;
            occupied.extend(occupied_umbrellas(guard.overlapping(&query), &query));
        }
        Ok(free_umbrellas(MIN_UMBRELLA_ID..=MAX_UMBRELLA_ID, &occupied))
    }
}
