mod common;

use chrono::Utc;
use common::harness;
use conclave::domain::{Charge, ChargeOrigin, ChargeState};
use serde_json::json;

#[tokio::test]
async fn test_charge_crud_and_lookups() -> anyhow::Result<()> {
    let h = harness().await?;
    let (user, _membership, reservation) = h
        .member_with_reservation("repo@example.com", "Adult", 370_00)
        .await?;

    let mut charge = Charge::new_pending(
        user.id,
        conclave::domain::BuyableRef::reservation(reservation.id),
        ChargeOrigin::StripeCheckout,
        75_00,
        "usd",
        "Pending payment",
    );
    charge.provider_ref = Some("cs_test_123".to_string());
    let created = h.charge_repo.create(charge).await?;
    assert_eq!(created.state, ChargeState::Pending);
    assert_eq!(created.amount_cents, 75_00);

    // Webhook correlation key
    let found = h
        .charge_repo
        .find_by_provider_ref("cs_test_123")
        .await?
        .expect("charge by session id");
    assert_eq!(found.id, created.id);

    // Update settles the charge and stores the audit blob
    let mut updated = found.clone();
    updated.state = ChargeState::Successful;
    updated.provider_response = Some(json!({"id": "cs_test_123", "payment_status": "paid"}));
    updated.comment = "settled".to_string();
    let saved = h.charge_repo.update(&updated).await?;
    assert_eq!(saved.state, ChargeState::Successful);
    assert_eq!(
        saved.provider_response.as_ref().and_then(|v| v["payment_status"].as_str()),
        Some("paid")
    );

    let for_buyable = h.charge_repo.list_for_buyable(&created.buyable).await?;
    assert_eq!(for_buyable.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_stale_pending_listing_filters_by_origin_and_age() -> anyhow::Result<()> {
    let h = harness().await?;
    let (user, _membership, reservation) = h
        .member_with_reservation("stale@example.com", "Adult", 370_00)
        .await?;
    let buyable = conclave::domain::BuyableRef::reservation(reservation.id);

    let mut checkout = Charge::new_pending(
        user.id,
        buyable,
        ChargeOrigin::StripeCheckout,
        75_00,
        "usd",
        "Pending payment",
    );
    checkout.provider_ref = Some("cs_old".to_string());
    h.charge_repo.create(checkout).await?;

    let direct = Charge::new_pending(
        user.id,
        buyable,
        ChargeOrigin::StripeDirect,
        75_00,
        "usd",
        "Pending payment",
    );
    h.charge_repo.create(direct).await?;

    // Only checkout-origin pending charges are sweepable
    let stale = h
        .charge_repo
        .list_stale_pending(ChargeOrigin::StripeCheckout, Utc::now() + chrono::Duration::seconds(1))
        .await?;
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].provider_ref.as_deref(), Some("cs_old"));

    // Nothing is stale for a cutoff in the past
    let stale = h
        .charge_repo
        .list_stale_pending(
            ChargeOrigin::StripeCheckout,
            Utc::now() - chrono::Duration::hours(1),
        )
        .await?;
    assert!(stale.is_empty());
    Ok(())
}
