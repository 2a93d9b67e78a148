use chrono::Utc;
use clap::Parser;
use fake::{faker::internet::en::SafeEmail, faker::name::en::Name, Fake};
use rand::{distributions::Alphanumeric, Rng};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use uuid::Uuid;

use conclave::{
    domain::{CreateUserRequest, Membership, SiteSelectionToken},
    payments::{RecordCashCharge, SettleCharge},
    repository::{
        MembershipRepository, ReservationRepository, SiteSelectionTokenRepository,
        SqliteChargeRepository, SqliteMembershipRepository, SqliteReservationRepository,
        SqliteSiteSelectionTokenRepository, SqliteUserRepository, UserRepository,
    },
    service::reservation_service::ReservationService,
};

#[derive(Parser)]
#[command(about = "Seed the database with demo memberships, users and site selection tokens")]
struct Args {
    #[arg(long, default_value = "sqlite:conclave.db")]
    database_url: String,

    /// Demo users to create alongside the fixed price list.
    #[arg(long, default_value_t = 5)]
    users: usize,

    /// Election name the site selection tokens are minted for.
    #[arg(long, default_value = "2028")]
    election: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("🌱 Starting database seeding...");

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await?;

    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let user_repo = Arc::new(SqliteUserRepository::new(db_pool.clone()));
    let membership_repo = Arc::new(SqliteMembershipRepository::new(db_pool.clone()));
    let reservation_repo = Arc::new(SqliteReservationRepository::new(db_pool.clone()));
    let charge_repo = Arc::new(SqliteChargeRepository::new(db_pool.clone()));
    let token_repo = Arc::new(SqliteSiteSelectionTokenRepository::new(db_pool.clone()));

    let reservation_service = ReservationService::new(
        reservation_repo.clone(),
        membership_repo.clone(),
        charge_repo.clone(),
    );
    let cash = RecordCashCharge::new(
        charge_repo.clone(),
        SettleCharge::new(db_pool.clone()),
        "usd".to_string(),
    );

    println!("🎟  Creating membership price list...");
    let now = Utc::now();
    let price_list = [
        ("Adult", 370_00),
        ("Young Adult", 225_00),
        ("Unwaged", 225_00),
        ("Child", 105_00),
        ("Kid-in-tow", 0),
        ("Supporting", 75_00),
    ];
    let mut memberships = Vec::new();
    for (name, price_cents) in price_list {
        let membership = membership_repo
            .create(Membership {
                id: Uuid::new_v4(),
                name: name.to_string(),
                price_cents,
                active_from: now,
                active_to: None,
                created_at: now,
                updated_at: now,
            })
            .await?;
        memberships.push(membership);
    }
    println!("  ✅ Created {} membership levels", memberships.len());

    println!("👥 Creating demo users and reservations...");
    let adult = memberships.iter().find(|m| m.name == "Adult").unwrap();
    let supporting = memberships.iter().find(|m| m.name == "Supporting").unwrap();

    for i in 0..args.users {
        let user = user_repo
            .create(CreateUserRequest {
                email: SafeEmail().fake(),
                display_name: Name().fake(),
            })
            .await?;

        // Alternate between a paid-off supporting membership and an adult
        // membership with one installment on it.
        let reservation = if i % 2 == 0 {
            let reservation = reservation_service.claim_membership(&user, supporting.id).await?;
            let (buyable, _charges, owed) = reservation_service.amount_owed(&reservation).await?;
            cash.call(&buyable, &user, owed, Some("Seed: paid in full")).await?;
            reservation
        } else {
            let reservation = reservation_service.claim_membership(&user, adult.id).await?;
            let (buyable, _charges, _owed) = reservation_service.amount_owed(&reservation).await?;
            cash.call(&buyable, &user, 75_00, Some("Seed: first installment")).await?;
            reservation
        };

        // Every member gets a pre-generated site selection token keyed by
        // their membership number.
        token_repo
            .create(SiteSelectionToken {
                id: Uuid::new_v4(),
                election: args.election.clone(),
                voter_id: reservation.membership_number.to_string(),
                token: random_token(),
                claimed_by_reservation_id: None,
                claimed_at: None,
                created_at: now,
            })
            .await?;
    }
    println!("  ✅ Created {} users with reservations and site selection tokens", args.users);

    println!("\n✨ Database seeding complete!");
    Ok(())
}

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}
