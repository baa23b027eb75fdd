//! Operation → capability mapping, evaluated once per engine call.

use crate::model::{Actor, CustomerId, Reservation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateReservation,
    ListReservations,
    GetReservation,
    DeleteReservation,
}

/// Which reservations an operation may see or act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Own,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub scope: Scope,
    /// Whether the request may book on behalf of another customer.
    pub may_name_customer: bool,
}

pub fn policy(op: Operation, actor: &Actor) -> Policy {
    let scope = if actor.manager { Scope::All } else { Scope::Own };
    match op {
        Operation::CreateReservation => Policy {
            scope,
            may_name_customer: actor.manager,
        },
        Operation::ListReservations | Operation::GetReservation | Operation::DeleteReservation => {
            Policy {
                scope,
                may_name_customer: false,
            }
        }
    }
}

impl Policy {
    pub fn permits(&self, actor: &CustomerId, reservation: &Reservation) -> bool {
        match self.scope {
            Scope::All => true,
            Scope::Own => reservation.customer == *actor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_is_scoped_to_own_reservations() {
        let actor = Actor::customer("carla");
        for op in [
            Operation::ListReservations,
            Operation::GetReservation,
            Operation::DeleteReservation,
        ] {
            assert_eq!(policy(op, &actor).scope, Scope::Own);
        }
        assert!(!policy(Operation::CreateReservation, &actor).may_name_customer);
    }

    #[test]
    fn manager_sees_all_and_books_for_others() {
        let actor = Actor::manager("marco");
        assert_eq!(policy(Operation::ListReservations, &actor).scope, Scope::All);
        assert_eq!(policy(Operation::DeleteReservation, &actor).scope, Scope::All);
        assert!(policy(Operation::CreateReservation, &actor).may_name_customer);
    }

    #[test]
    fn permits_follows_scope() {
        use chrono::NaiveDate;
        use crate::model::DateSpan;

        let d = NaiveDate::from_ymd_opt(2030, 7, 1).unwrap();
        let r = Reservation {
            id: ulid::Ulid::new(),
            customer: CustomerId::from("carla"),
            number_of_seats: 2,
            span: DateSpan::new(d, d),
            umbrella_id: 4,
        };
        let own = policy(Operation::GetReservation, &Actor::customer("dino"));
        assert!(!own.permits(&CustomerId::from("dino"), &r));
        assert!(own.permits(&CustomerId::from("carla"), &r));
        let all = policy(Operation::GetReservation, &Actor::manager("marco"));
        assert!(all.permits(&CustomerId::from("marco"), &r));
    }
}
