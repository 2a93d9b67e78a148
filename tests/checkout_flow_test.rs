mod common;

use common::{harness, harness_with};
use chrono::Utc;
use conclave::{
    domain::{ChargeState, ReservationState, SiteSelectionToken},
    payments::{CheckoutSessionStatus, FakeStripeGateway},
};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_checkout_success_pays_reservation() -> anyhow::Result<()> {
    let h = harness().await?;
    let (user, membership, reservation) = h
        .member_with_reservation("alice@example.com", "Adult", 300_00)
        .await?;

    let (_buyable, owed) = h.reservation_owed(&reservation).await?;
    let start = h
        .start_checkout
        .call(
            &reservation,
            &membership,
            &user,
            owed,
            None,
            false,
            "https://conclave.test/success",
            "https://conclave.test/cancel",
        )
        .await?;

    assert!(start.started());
    assert!(start.checkout_url.is_some());
    assert_eq!(start.charge.state, ChargeState::Pending);
    let session_id = start.charge.provider_ref.clone().expect("session id");

    // Webhook delivers the provider's verdict
    let settlement = h
        .checkout_succeeded
        .call(&start.charge, json!({"id": session_id, "payment_status": "paid"}))
        .await?;

    assert!(settlement.charge.successful());
    assert!(settlement.fully_paid);
    assert_eq!(
        h.reservation_state(reservation.id).await?,
        ReservationState::Paid
    );
    // Description reflects the final settled state
    assert!(settlement.charge.comment.contains("Paid"));
    Ok(())
}

#[tokio::test]
async fn test_checkout_partial_payment_marks_installment() -> anyhow::Result<()> {
    let h = harness().await?;
    let (user, membership, reservation) = h
        .member_with_reservation("bob@example.com", "Adult", 300_00)
        .await?;

    let (_buyable, owed) = h.reservation_owed(&reservation).await?;
    let start = h
        .start_checkout
        .call(
            &reservation,
            &membership,
            &user,
            owed,
            Some(100_00),
            false,
            "https://conclave.test/success",
            "https://conclave.test/cancel",
        )
        .await?;
    assert!(start.started());

    let settlement = h
        .checkout_succeeded
        .call(&start.charge, json!({"payment_status": "paid"}))
        .await?;

    assert!(!settlement.fully_paid);
    assert_eq!(settlement.outstanding_cents, 200_00);
    assert_eq!(
        h.reservation_state(reservation.id).await?,
        ReservationState::Installment
    );
    assert!(settlement.charge.comment.contains("Installment"));
    Ok(())
}

#[tokio::test]
async fn test_checkout_failure_leaves_reservation_alone() -> anyhow::Result<()> {
    let h = harness().await?;
    let (user, membership, reservation) = h
        .member_with_reservation("carol@example.com", "Adult", 300_00)
        .await?;

    let (_buyable, owed) = h.reservation_owed(&reservation).await?;
    let start = h
        .start_checkout
        .call(
            &reservation,
            &membership,
            &user,
            owed,
            None,
            false,
            "https://conclave.test/success",
            "https://conclave.test/cancel",
        )
        .await?;

    let failed = h
        .checkout_failed
        .call(&start.charge, json!({"status": "expired"}))
        .await?;

    assert_eq!(failed.state, ChargeState::Failed);
    assert_eq!(failed.comment, "Stripe checkout failed.");
    assert!(failed.provider_response.is_some());
    assert_eq!(
        h.reservation_state(reservation.id).await?,
        ReservationState::New
    );
    Ok(())
}

#[tokio::test]
async fn test_checkout_success_is_idempotent() -> anyhow::Result<()> {
    let h = harness().await?;
    let (user, membership, reservation) = h
        .member_with_reservation("dave@example.com", "Supporting", 75_00)
        .await?;

    let (_buyable, owed) = h.reservation_owed(&reservation).await?;
    let start = h
        .start_checkout
        .call(
            &reservation,
            &membership,
            &user,
            owed,
            None,
            false,
            "https://conclave.test/success",
            "https://conclave.test/cancel",
        )
        .await?;

    let payload = json!({"payment_status": "paid"});
    let first = h.checkout_succeeded.call(&start.charge, payload.clone()).await?;
    assert!(first.fully_paid);

    // A replayed delivery finds the charge already settled and changes
    // nothing.
    let reloaded = h
        .charge_repo
        .find_by_id(start.charge.id)
        .await?
        .expect("charge exists");
    let second = h.checkout_succeeded.call(&reloaded, payload).await?;
    assert!(second.fully_paid);

    let charges = h
        .charge_repo
        .list_for_buyable(&start.charge.buyable)
        .await?;
    let successful: i64 = charges
        .iter()
        .filter(|c| c.successful())
        .map(|c| c.amount_cents)
        .sum();
    assert_eq!(successful, 75_00);
    assert_eq!(
        h.reservation_state(reservation.id).await?,
        ReservationState::Paid
    );
    Ok(())
}

#[tokio::test]
async fn test_session_creation_failure_records_failed_charge() -> anyhow::Result<()> {
    let h = harness_with(FakeStripeGateway::new().fail_sessions("Stripe is down")).await?;
    let (user, membership, reservation) = h
        .member_with_reservation("erin@example.com", "Adult", 300_00)
        .await?;

    let (_buyable, owed) = h.reservation_owed(&reservation).await?;
    let start = h
        .start_checkout
        .call(
            &reservation,
            &membership,
            &user,
            owed,
            None,
            false,
            "https://conclave.test/success",
            "https://conclave.test/cancel",
        )
        .await?;

    assert!(!start.started());
    assert!(start.errors.iter().any(|e| e.contains("Stripe is down")));
    assert_eq!(start.charge.state, ChargeState::Failed);
    assert!(start.charge.comment.contains("Stripe is down"));
    Ok(())
}

#[tokio::test]
async fn test_site_payment_claims_token() -> anyhow::Result<()> {
    let h = harness().await?;
    let (user, membership, reservation) = h
        .member_with_reservation("frank@example.com", "Adult", 300_00)
        .await?;

    h.token_repo
        .create(SiteSelectionToken {
            id: Uuid::new_v4(),
            election: "2028".to_string(),
            voter_id: reservation.membership_number.to_string(),
            token: "ABCDEF1234".to_string(),
            claimed_by_reservation_id: None,
            claimed_at: None,
            created_at: Utc::now(),
        })
        .await?;

    let start = h
        .start_checkout
        .call(
            &reservation,
            &membership,
            &user,
            50_00,
            Some(50_00),
            true,
            "https://conclave.test/success",
            "https://conclave.test/cancel",
        )
        .await?;
    assert!(start.started());
    assert!(start.charge.site);

    h.checkout_succeeded
        .call(&start.charge, json!({"payment_status": "paid"}))
        .await?;

    let token = h
        .token_repo
        .find_by_reservation(reservation.id)
        .await?
        .expect("token claimed");
    assert_eq!(token.token, "ABCDEF1234");
    assert!(token.claimed_at.is_some());

    // Site money never counts toward the membership price
    assert_eq!(
        h.reservation_state(reservation.id).await?,
        ReservationState::New
    );
    let (_buyable, owed) = h.reservation_owed(&reservation).await?;
    assert_eq!(owed, 300_00);
    Ok(())
}

#[tokio::test]
async fn test_site_payment_without_token_fails_loudly() -> anyhow::Result<()> {
    let h = harness().await?;
    let (user, membership, reservation) = h
        .member_with_reservation("grace@example.com", "Adult", 300_00)
        .await?;

    let start = h
        .start_checkout
        .call(
            &reservation,
            &membership,
            &user,
            50_00,
            Some(50_00),
            true,
            "https://conclave.test/success",
            "https://conclave.test/cancel",
        )
        .await?;

    let result = h
        .checkout_succeeded
        .call(&start.charge, json!({"payment_status": "paid"}))
        .await;
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_sweep_finalizes_stale_pending_charges() -> anyhow::Result<()> {
    let h = harness().await?;
    let (user, membership, reservation) = h
        .member_with_reservation("holly@example.com", "Supporting", 75_00)
        .await?;

    let (_buyable, owed) = h.reservation_owed(&reservation).await?;
    let paid_start = h
        .start_checkout
        .call(
            &reservation,
            &membership,
            &user,
            owed,
            None,
            false,
            "https://conclave.test/success",
            "https://conclave.test/cancel",
        )
        .await?;
    let paid_session = paid_start.charge.provider_ref.clone().expect("session id");
    h.gateway
        .set_session_outcome(&paid_session, CheckoutSessionStatus::Complete, true);

    // Zero max-age makes every pending charge stale immediately
    let summary = h.sweep(chrono::Duration::zero()).run_once().await?;
    assert_eq!(summary.examined, 1);
    assert_eq!(summary.settled, 1);
    assert_eq!(
        h.reservation_state(reservation.id).await?,
        ReservationState::Paid
    );

    // A second pass has nothing left to do
    let summary = h.sweep(chrono::Duration::zero()).run_once().await?;
    assert_eq!(summary.examined, 0);
    Ok(())
}

#[tokio::test]
async fn test_sweep_expires_abandoned_checkouts() -> anyhow::Result<()> {
    let h = harness().await?;
    let (user, membership, reservation) = h
        .member_with_reservation("ivan@example.com", "Adult", 300_00)
        .await?;

    let (_buyable, owed) = h.reservation_owed(&reservation).await?;
    let start = h
        .start_checkout
        .call(
            &reservation,
            &membership,
            &user,
            owed,
            None,
            false,
            "https://conclave.test/success",
            "https://conclave.test/cancel",
        )
        .await?;

    // Unscripted sessions report expired
    let summary = h.sweep(chrono::Duration::zero()).run_once().await?;
    assert_eq!(summary.expired, 1);

    let charge = h
        .charge_repo
        .find_by_id(start.charge.id)
        .await?
        .expect("charge exists");
    assert_eq!(charge.state, ChargeState::Failed);
    assert_eq!(
        h.reservation_state(reservation.id).await?,
        ReservationState::New
    );
    Ok(())
}

#[tokio::test]
async fn test_webhook_event_dedup() -> anyhow::Result<()> {
    let h = harness().await?;

    assert!(h
        .stripe_event_repo
        .record("evt_123", "checkout.session.completed")
        .await?);
    // Provider retry of the same event id
    assert!(!h
        .stripe_event_repo
        .record("evt_123", "checkout.session.completed")
        .await?);
    // Different event still goes through
    assert!(h
        .stripe_event_repo
        .record("evt_124", "checkout.session.expired")
        .await?);
    Ok(())
}
