use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::model::*;

use super::SharedUmbrellaState;

/// Per-umbrella reservation lists plus a reservation → umbrella index.
pub struct InMemoryStore {
    umbrellas: DashMap<UmbrellaId, SharedUmbrellaState>,
    reservation_to_umbrella: DashMap<ReservationId, UmbrellaId>,
}

impl InMemoryStore {
    /// One (empty) state per umbrella in `ids`.
    pub fn new(ids: impl IntoIterator<Item = UmbrellaId>) -> Self {
        let umbrellas = DashMap::new();
        for id in ids {
            umbrellas.insert(id, Arc::new(RwLock::new(UmbrellaState::new(id))));
        }
        Self {
            umbrellas,
            reservation_to_umbrella: DashMap::new(),
        }
    }

    // ── Umbrellas ────────────────────────────────────────────

    pub fn get_umbrella(&self, id: UmbrellaId) -> Option<SharedUmbrellaState> {
        self.umbrellas.get(&id).map(|e| e.value().clone())
    }

    /// Snapshot of all umbrella handles in ascending id order.
    /// Handles are cloned out so no map shard stays locked across an await.
    pub fn umbrellas(&self) -> Vec<(UmbrellaId, SharedUmbrellaState)> {
        let mut all: Vec<_> = self
            .umbrellas
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    // ── Reservation index ────────────────────────────────────

    pub fn umbrella_for(&self, reservation_id: &ReservationId) -> Option<UmbrellaId> {
        self.reservation_to_umbrella
            .get(reservation_id)
            .map(|e| *e.value())
    }

    pub fn reservation_count(&self) -> usize {
        self.reservation_to_umbrella.len()
    }

    // ── Mutation (caller holds the umbrella's write lock) ────

    pub fn insert(&self, us: &mut UmbrellaState, reservation: Reservation) {
        self.reservation_to_umbrella
            .insert(reservation.id, reservation.umbrella_id);
        us.insert(reservation);
    }

    pub fn remove(&self, us: &mut UmbrellaState, id: ReservationId) -> Option<Reservation> {
        let removed = us.remove(id)?;
        self.reservation_to_umbrella.remove(&id);
        Some(removed)
    }
}
