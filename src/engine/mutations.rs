use chrono::NaiveDate;
use tracing::{debug, info};

use crate::access::{policy, Operation};
use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::validation::{today, validate_customer};
use super::{validate_date_order, validate_fields, validate_no_overlap, Candidate, Engine, EngineError};

impl Engine {
    /// Validate and store a reservation, judging past dates against the local calendar day.
    pub async fn create_reservation(
        &self,
        actor: &Actor,
        request: ReservationRequest,
    ) -> Result<Reservation, EngineError> {
        self.create_reservation_on(actor, request, today()).await
    }

    /// [`Engine::create_reservation`] with an explicit "today".
    pub async fn create_reservation_on(
        &self,
        actor: &Actor,
        request: ReservationRequest,
        today: NaiveDate,
    ) -> Result<Reservation, EngineError> {
        let result = self.try_create(actor, request, today).await;
        match &result {
            Ok(r) => {
                info!(
                    reservation = %r.id,
                    customer = %r.customer,
                    umbrella = r.umbrella_id,
                    start = %r.span.start,
                    end = %r.span.end,
                    "reservation created"
                );
                metrics::counter!(observability::RESERVATIONS_CREATED_TOTAL).increment(1);
                metrics::gauge!(observability::RESERVATIONS_ACTIVE)
                    .set(self.reservation_count() as f64);
            }
            Err(e) => {
                debug!(actor = %actor.id, "reservation rejected: {e}");
                metrics::counter!(observability::RESERVATIONS_REJECTED_TOTAL, "reason" => e.reason())
                    .increment(1);
            }
        }
        result
    }

    async fn try_create(
        &self,
        actor: &Actor,
        request: ReservationRequest,
        today: NaiveDate,
    ) -> Result<Reservation, EngineError> {
        let policy = policy(Operation::CreateReservation, actor);
        let customer = match &request.customer {
            Some(named) if *named != actor.id && !policy.may_name_customer => {
                return Err(EngineError::Forbidden(
                    "only managers may book for another customer",
                ));
            }
            Some(named) => named.clone(),
            None => actor.id.clone(),
        };
        validate_customer(&customer)?;

        validate_fields(&request, today)?;
        let span = validate_date_order(request.start_date, request.end_date)?;

        // Field checks above bound both values to their u32 ranges.
        let umbrella_id = request.umbrella_id as UmbrellaId;
        let number_of_seats = request.number_of_seats as u32;

        let us = self
            .store
            .get_umbrella(umbrella_id)
            .ok_or(EngineError::LimitExceeded("umbrella not configured"))?;
        // Held across check-and-insert so concurrent requests for this umbrella serialize.
        let mut guard = us.write().await;
        if guard.reservations.len() >= MAX_RESERVATIONS_PER_UMBRELLA {
            return Err(EngineError::LimitExceeded("too many reservations on umbrella"));
        }

        let candidate = Candidate {
            id: None,
            umbrella_id,
            span,
        };
        validate_no_overlap(&candidate, guard.overlapping(&span))?;

        let reservation = Reservation {
            id: self.next_id()?,
            customer,
            number_of_seats,
            span,
            umbrella_id,
        };
        self.store.insert(&mut guard, reservation.clone());
        Ok(reservation)
    }

    /// Remove a reservation owned by `actor` (any reservation for managers).
    /// Reservations outside the actor's scope are reported as not found.
    pub async fn delete_reservation(
        &self,
        id: ReservationId,
        actor: &Actor,
    ) -> Result<Reservation, EngineError> {
        let policy = policy(Operation::DeleteReservation, actor);
        let mut guard = self.resolve_reservation_write(&id).await?;
        match guard.get(id) {
            Some(r) if policy.permits(&actor.id, r) => {}
            _ => return Err(EngineError::NotFound(id)),
        }
        let removed = self
            .store
            .remove(&mut guard, id)
            .ok_or(EngineError::NotFound(id))?;
        drop(guard);

        info!(reservation = %id, actor = %actor.id, "reservation deleted");
        metrics::counter!(observability::RESERVATIONS_DELETED_TOTAL).increment(1);
        metrics::gauge!(observability::RESERVATIONS_ACTIVE).set(self.reservation_count() as f64);
        Ok(removed)
    }
}
