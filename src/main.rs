use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use conclave::{
    api,
    config::Settings,
    notifications::{email::EmailNotifier, NotifierManager},
    payments::{
        BuyableLoader, ChargeCustomer, MoneyCommands, PendingCheckoutSweep, RecordCashCharge,
        SettleCharge, StartStripeCheckout, StripeCheckoutFailed, StripeCheckoutSucceeded,
        StripeClient,
    },
    repository,
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conclave=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!(
        "Starting Conclave server on {}:{}",
        settings.server.host,
        settings.server.port
    );

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    // Initialize repositories
    let user_repo = Arc::new(repository::SqliteUserRepository::new(db_pool.clone()));
    let membership_repo = Arc::new(repository::SqliteMembershipRepository::new(db_pool.clone()));
    let reservation_repo = Arc::new(repository::SqliteReservationRepository::new(db_pool.clone()));
    let cart_repo = Arc::new(repository::SqliteCartRepository::new(db_pool.clone()));
    let charge_repo = Arc::new(repository::SqliteChargeRepository::new(db_pool.clone()));
    let token_repo = Arc::new(repository::SqliteSiteSelectionTokenRepository::new(
        db_pool.clone(),
    ));

    // Initialize notifier manager
    let notifier_manager = Arc::new(NotifierManager::new());
    if let Some(email) = EmailNotifier::new(settings.email.clone()) {
        notifier_manager.register(Arc::new(email)).await;
    } else {
        tracing::info!("Email notifications disabled");
    }

    // Create service context
    let service_context = Arc::new(ServiceContext::new(
        user_repo.clone(),
        membership_repo,
        reservation_repo,
        cart_repo,
        charge_repo.clone(),
        token_repo.clone(),
        notifier_manager.clone(),
        db_pool.clone(),
    ));

    let cash = Arc::new(RecordCashCharge::new(
        charge_repo.clone(),
        SettleCharge::new(db_pool.clone()),
        settings.stripe.currency.clone(),
    ));

    // Initialize Stripe-backed money commands if configured
    let money = if settings.stripe.enabled {
        if let Some(api_key) = settings.stripe.secret_key.clone() {
            tracing::info!("Stripe payment processing enabled");
            let gateway = Arc::new(StripeClient::new(api_key));
            let currency = settings.stripe.currency.clone();

            let checkout_succeeded = Arc::new(StripeCheckoutSucceeded::new(
                charge_repo.clone(),
                user_repo.clone(),
                token_repo.clone(),
                SettleCharge::new(db_pool.clone()),
                BuyableLoader::new(db_pool.clone()),
                notifier_manager.clone(),
            ));
            let checkout_failed = Arc::new(StripeCheckoutFailed::new(charge_repo.clone()));

            // Stuck pending checkouts get reconciled against the provider
            // in the background.
            let sweep = PendingCheckoutSweep::new(
                gateway.clone(),
                charge_repo.clone(),
                checkout_succeeded.clone(),
                checkout_failed.clone(),
                chrono::Duration::minutes(settings.payments.pending_max_age_minutes),
            );
            tokio::spawn(sweep.run(std::time::Duration::from_secs(
                settings.payments.sweep_interval_minutes * 60,
            )));

            Some(Arc::new(MoneyCommands {
                charge_customer: ChargeCustomer::new(
                    gateway.clone(),
                    charge_repo.clone(),
                    user_repo.clone(),
                    SettleCharge::new(db_pool.clone()),
                    currency.clone(),
                ),
                start_checkout: StartStripeCheckout::new(
                    gateway,
                    charge_repo.clone(),
                    user_repo.clone(),
                    currency,
                ),
                checkout_succeeded,
                checkout_failed,
            }))
        } else {
            tracing::warn!("Stripe enabled but missing configuration");
            None
        }
    } else {
        tracing::info!("Stripe payment processing disabled");
        None
    };

    // Create API app
    let app = api::create_app(service_context, money, cash, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        settings.server.host, settings.server.port
    ))
    .await?;

    tracing::info!(
        "Server listening on http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}
