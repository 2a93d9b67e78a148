use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A Reservation is one membership holding. Membership numbers are unique and
/// handed out in ascending order.
///
/// Paid/installment state is always recomputed from the sum of successful
/// charges against the reservation, never incremented in place. `Disabled` is
/// the one exception: staff set it directly, and re-enabling recomputes the
/// state from the charge sum.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reservation {
    pub id: Uuid,
    pub membership_number: i64,
    pub membership_id: Uuid,
    pub user_id: Uuid,
    pub state: ReservationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "TEXT")]
pub enum ReservationState {
    New,
    Installment,
    Paid,
    Disabled,
}

impl Reservation {
    pub fn paid(&self) -> bool {
        self.state == ReservationState::Paid
    }

    pub fn installment(&self) -> bool {
        self.state == ReservationState::Installment
    }

    pub fn disabled(&self) -> bool {
        self.state == ReservationState::Disabled
    }
}
