use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::*;
use crate::error::Result;

pub mod cart_repository;
pub mod charge_repository;
pub mod membership_repository;
pub mod reservation_repository;
pub mod stripe_event_repository;
pub mod token_repository;
pub mod user_repository;

pub use cart_repository::SqliteCartRepository;
pub use charge_repository::SqliteChargeRepository;
pub use membership_repository::SqliteMembershipRepository;
pub use reservation_repository::SqliteReservationRepository;
pub use stripe_event_repository::SqliteStripeEventRepository;
pub use token_repository::SqliteSiteSelectionTokenRepository;
pub use user_repository::SqliteUserRepository;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: CreateUserRequest) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn set_stripe_customer_id(&self, id: Uuid, customer_id: &str) -> Result<User>;
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    async fn create(&self, membership: Membership) -> Result<Membership>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Membership>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Membership>>;
    async fn list_active(&self, at: DateTime<Utc>) -> Result<Vec<Membership>>;
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Creates a reservation with the next ascending membership number.
    async fn create(
        &self,
        user_id: Uuid,
        membership_id: Uuid,
        state: ReservationState,
    ) -> Result<Reservation>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reservation>>;
    async fn find_by_membership_number(&self, number: i64) -> Result<Option<Reservation>>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Reservation>>;
    async fn update_state(&self, id: Uuid, state: ReservationState) -> Result<Reservation>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn create(&self, user_id: Uuid, status: CartStatus) -> Result<Cart>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Cart>>;
    async fn find_open_for_user(&self, user_id: Uuid, status: CartStatus) -> Result<Option<Cart>>;
    async fn add_item(&self, item: CartItem) -> Result<CartItem>;
    async fn items(&self, cart_id: Uuid) -> Result<Vec<CartItem>>;
    async fn update_status(&self, id: Uuid, status: CartStatus) -> Result<Cart>;
}

#[async_trait]
pub trait ChargeRepository: Send + Sync {
    async fn create(&self, charge: Charge) -> Result<Charge>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Charge>>;
    /// Webhook correlation: find the charge carrying a checkout-session or
    /// provider charge id.
    async fn find_by_provider_ref(&self, provider_ref: &str) -> Result<Option<Charge>>;
    async fn list_for_buyable(&self, buyable: &BuyableRef) -> Result<Vec<Charge>>;
    async fn update(&self, charge: &Charge) -> Result<Charge>;
    /// Pending charges of one origin created before the cutoff, oldest
    /// first. Feeds the reconciliation sweep.
    async fn list_stale_pending(
        &self,
        origin: ChargeOrigin,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<Charge>>;
}

#[async_trait]
pub trait SiteSelectionTokenRepository: Send + Sync {
    async fn create(&self, token: SiteSelectionToken) -> Result<SiteSelectionToken>;
    /// Claims the unclaimed token pre-generated for this membership number.
    /// Returns NotFound when none exists; callers treat that as a
    /// data-integrity failure.
    async fn claim_for_voter(&self, voter_id: &str, reservation_id: Uuid)
        -> Result<SiteSelectionToken>;
    async fn find_by_reservation(&self, reservation_id: Uuid)
        -> Result<Option<SiteSelectionToken>>;
}

#[async_trait]
pub trait StripeEventRepository: Send + Sync {
    /// Records a webhook event id. Returns false when the id was already
    /// recorded, i.e. this delivery is a retry and must not be re-applied.
    async fn record(&self, event_id: &str, event_type: &str) -> Result<bool>;
}
