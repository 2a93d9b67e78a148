pub mod cart_service;
pub mod reservation_service;

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::notifications::NotifierManager;
use crate::repository::*;
use cart_service::CartService;
use reservation_service::ReservationService;

pub struct ServiceContext {
    pub user_repo: Arc<dyn UserRepository>,
    pub membership_repo: Arc<dyn MembershipRepository>,
    pub reservation_repo: Arc<dyn ReservationRepository>,
    pub cart_repo: Arc<dyn CartRepository>,
    pub charge_repo: Arc<dyn ChargeRepository>,
    pub token_repo: Arc<dyn SiteSelectionTokenRepository>,
    pub stripe_event_repo: Arc<dyn StripeEventRepository>,
    pub notifier_manager: Arc<NotifierManager>,
    pub reservation_service: Arc<ReservationService>,
    pub cart_service: Arc<CartService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        membership_repo: Arc<dyn MembershipRepository>,
        reservation_repo: Arc<dyn ReservationRepository>,
        cart_repo: Arc<dyn CartRepository>,
        charge_repo: Arc<dyn ChargeRepository>,
        token_repo: Arc<dyn SiteSelectionTokenRepository>,
        notifier_manager: Arc<NotifierManager>,
        db_pool: SqlitePool,
    ) -> Self {
        let stripe_event_repo = Arc::new(SqliteStripeEventRepository::new(db_pool.clone()));

        let reservation_service = Arc::new(ReservationService::new(
            reservation_repo.clone(),
            membership_repo.clone(),
            charge_repo.clone(),
        ));
        let cart_service = Arc::new(CartService::new(
            cart_repo.clone(),
            membership_repo.clone(),
            reservation_repo.clone(),
            charge_repo.clone(),
        ));

        Self {
            user_repo,
            membership_repo,
            reservation_repo,
            cart_repo,
            charge_repo,
            token_repo,
            stripe_event_repo,
            notifier_manager,
            reservation_service,
            cart_service,
            db_pool,
        }
    }
}
