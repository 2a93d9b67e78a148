use std::sync::Arc;

use uuid::Uuid;

use crate::{
    domain::*,
    error::{AppError, Result},
    payments::amount_owed,
    repository::{ChargeRepository, MembershipRepository, ReservationRepository},
};

pub struct ReservationService {
    reservation_repo: Arc<dyn ReservationRepository>,
    membership_repo: Arc<dyn MembershipRepository>,
    charge_repo: Arc<dyn ChargeRepository>,
}

impl ReservationService {
    pub fn new(
        reservation_repo: Arc<dyn ReservationRepository>,
        membership_repo: Arc<dyn MembershipRepository>,
        charge_repo: Arc<dyn ChargeRepository>,
    ) -> Self {
        Self {
            reservation_repo,
            membership_repo,
            charge_repo,
        }
    }

    /// Claims a membership for a user. Free memberships are paid from the
    /// start; everything else begins unpaid.
    pub async fn claim_membership(&self, user: &User, membership_id: Uuid) -> Result<Reservation> {
        let membership = self
            .membership_repo
            .find_by_id(membership_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))?;

        if !membership.active_at(chrono::Utc::now()) {
            return Err(AppError::BadRequest(format!(
                "{} memberships are no longer available",
                membership.name
            )));
        }

        let state = if membership.free() {
            ReservationState::Paid
        } else {
            ReservationState::New
        };

        let reservation = self
            .reservation_repo
            .create(user.id, membership.id, state)
            .await?;

        tracing::info!(
            member_number = reservation.membership_number,
            membership = %membership.name,
            "Membership claimed"
        );

        Ok(reservation)
    }

    /// Staff action; independent of payment state.
    pub async fn disable(&self, id: Uuid) -> Result<Reservation> {
        self.reservation_repo
            .update_state(id, ReservationState::Disabled)
            .await
    }

    /// Re-enabling never trusts the pre-disable state; it recomputes from
    /// the successful charge sum.
    pub async fn enable(&self, id: Uuid) -> Result<Reservation> {
        let reservation = self
            .reservation_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))?;

        if !reservation.disabled() {
            return Ok(reservation);
        }

        let membership = self
            .membership_repo
            .find_by_id(reservation.membership_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))?;

        let charges = self
            .charge_repo
            .list_for_buyable(&BuyableRef::reservation(reservation.id))
            .await?;
        let paid = amount_owed::paid_cents(&charges);

        let state = if membership.free() || paid >= membership.price_cents && paid > 0 {
            ReservationState::Paid
        } else if paid > 0 {
            ReservationState::Installment
        } else {
            ReservationState::New
        };

        self.reservation_repo.update_state(id, state).await
    }

    /// Outstanding balance for a reservation, with the loaded pieces the
    /// payment handlers need alongside it.
    pub async fn amount_owed(
        &self,
        reservation: &Reservation,
    ) -> Result<(Buyable, Vec<Charge>, i64)> {
        let membership = self
            .membership_repo
            .find_by_id(reservation.membership_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))?;

        let buyable = Buyable::Reservation {
            reservation: reservation.clone(),
            membership,
        };
        let charges = self.charge_repo.list_for_buyable(&buyable.reference()).await?;
        let owed = amount_owed::amount_owed_cents(&buyable, &charges);

        Ok((buyable, charges, owed))
    }
}
