#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use conclave::{
    domain::*,
    notifications::NotifierManager,
    payments::{
        BuyableLoader, ChargeCustomer, FakeStripeGateway, PendingCheckoutSweep, RecordCashCharge,
        SettleCharge, StartStripeCheckout, StripeCheckoutFailed, StripeCheckoutSucceeded,
    },
    repository::*,
    service::{cart_service::CartService, reservation_service::ReservationService},
};

pub const CURRENCY: &str = "usd";

pub struct Harness {
    pub pool: SqlitePool,
    pub gateway: Arc<FakeStripeGateway>,
    pub user_repo: Arc<dyn UserRepository>,
    pub membership_repo: Arc<dyn MembershipRepository>,
    pub reservation_repo: Arc<dyn ReservationRepository>,
    pub cart_repo: Arc<dyn CartRepository>,
    pub charge_repo: Arc<dyn ChargeRepository>,
    pub token_repo: Arc<dyn SiteSelectionTokenRepository>,
    pub stripe_event_repo: Arc<dyn StripeEventRepository>,
    pub reservation_service: ReservationService,
    pub cart_service: CartService,
    pub charge_customer: ChargeCustomer,
    pub start_checkout: StartStripeCheckout,
    pub checkout_succeeded: StripeCheckoutSucceeded,
    pub checkout_failed: StripeCheckoutFailed,
    pub cash: RecordCashCharge,
}

pub async fn harness() -> anyhow::Result<Harness> {
    harness_with(FakeStripeGateway::new()).await
}

pub async fn harness_with(gateway: FakeStripeGateway) -> anyhow::Result<Harness> {
    // One connection: the in-memory database lives and dies with it.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let gateway = Arc::new(gateway);
    let user_repo: Arc<dyn UserRepository> = Arc::new(SqliteUserRepository::new(pool.clone()));
    let membership_repo: Arc<dyn MembershipRepository> =
        Arc::new(SqliteMembershipRepository::new(pool.clone()));
    let reservation_repo: Arc<dyn ReservationRepository> =
        Arc::new(SqliteReservationRepository::new(pool.clone()));
    let cart_repo: Arc<dyn CartRepository> = Arc::new(SqliteCartRepository::new(pool.clone()));
    let charge_repo: Arc<dyn ChargeRepository> =
        Arc::new(SqliteChargeRepository::new(pool.clone()));
    let token_repo: Arc<dyn SiteSelectionTokenRepository> =
        Arc::new(SqliteSiteSelectionTokenRepository::new(pool.clone()));
    let stripe_event_repo: Arc<dyn StripeEventRepository> =
        Arc::new(SqliteStripeEventRepository::new(pool.clone()));
    let notifier_manager = Arc::new(NotifierManager::new());

    let reservation_service = ReservationService::new(
        reservation_repo.clone(),
        membership_repo.clone(),
        charge_repo.clone(),
    );
    let cart_service = CartService::new(
        cart_repo.clone(),
        membership_repo.clone(),
        reservation_repo.clone(),
        charge_repo.clone(),
    );

    let charge_customer = ChargeCustomer::new(
        gateway.clone(),
        charge_repo.clone(),
        user_repo.clone(),
        SettleCharge::new(pool.clone()),
        CURRENCY.to_string(),
    );
    let start_checkout = StartStripeCheckout::new(
        gateway.clone(),
        charge_repo.clone(),
        user_repo.clone(),
        CURRENCY.to_string(),
    );
    let checkout_succeeded = StripeCheckoutSucceeded::new(
        charge_repo.clone(),
        user_repo.clone(),
        token_repo.clone(),
        SettleCharge::new(pool.clone()),
        BuyableLoader::new(pool.clone()),
        notifier_manager.clone(),
    );
    let checkout_failed = StripeCheckoutFailed::new(charge_repo.clone());
    let cash = RecordCashCharge::new(
        charge_repo.clone(),
        SettleCharge::new(pool.clone()),
        CURRENCY.to_string(),
    );

    Ok(Harness {
        pool,
        gateway,
        user_repo,
        membership_repo,
        reservation_repo,
        cart_repo,
        charge_repo,
        token_repo,
        stripe_event_repo,
        reservation_service,
        cart_service,
        charge_customer,
        start_checkout,
        checkout_succeeded,
        checkout_failed,
        cash,
    })
}

impl Harness {
    pub async fn create_user(&self, email: &str) -> anyhow::Result<User> {
        Ok(self
            .user_repo
            .create(CreateUserRequest {
                email: email.to_string(),
                display_name: "Test Member".to_string(),
            })
            .await?)
    }

    pub async fn create_membership(&self, name: &str, price_cents: i64) -> anyhow::Result<Membership> {
        let now = Utc::now();
        Ok(self
            .membership_repo
            .create(Membership {
                id: Uuid::new_v4(),
                name: name.to_string(),
                price_cents,
                active_from: now - chrono::Duration::days(1),
                active_to: None,
                created_at: now,
                updated_at: now,
            })
            .await?)
    }

    /// User + membership + claimed reservation in one go.
    pub async fn member_with_reservation(
        &self,
        email: &str,
        membership_name: &str,
        price_cents: i64,
    ) -> anyhow::Result<(User, Membership, Reservation)> {
        let user = self.create_user(email).await?;
        let membership = self.create_membership(membership_name, price_cents).await?;
        let reservation = self
            .reservation_service
            .claim_membership(&user, membership.id)
            .await?;
        Ok((user, membership, reservation))
    }

    pub async fn reservation_owed(
        &self,
        reservation: &Reservation,
    ) -> anyhow::Result<(Buyable, i64)> {
        let reservation = self
            .reservation_repo
            .find_by_id(reservation.id)
            .await?
            .expect("reservation exists");
        let (buyable, _charges, owed) = self.reservation_service.amount_owed(&reservation).await?;
        Ok((buyable, owed))
    }

    pub async fn reservation_state(&self, id: Uuid) -> anyhow::Result<ReservationState> {
        Ok(self
            .reservation_repo
            .find_by_id(id)
            .await?
            .expect("reservation exists")
            .state)
    }

    pub fn sweep(&self, max_age: chrono::Duration) -> PendingCheckoutSweep {
        PendingCheckoutSweep::new(
            self.gateway.clone(),
            self.charge_repo.clone(),
            Arc::new(StripeCheckoutSucceeded::new(
                self.charge_repo.clone(),
                self.user_repo.clone(),
                self.token_repo.clone(),
                SettleCharge::new(self.pool.clone()),
                BuyableLoader::new(self.pool.clone()),
                Arc::new(NotifierManager::new()),
            )),
            Arc::new(StripeCheckoutFailed::new(self.charge_repo.clone())),
            max_age,
        )
    }
}
