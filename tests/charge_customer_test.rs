mod common;

use common::{harness, harness_with};
use conclave::{
    domain::{ChargeState, ReservationState},
    payments::FakeStripeGateway,
};

#[tokio::test]
async fn test_installments_reach_paid() -> anyhow::Result<()> {
    let h = harness().await?;
    let (user, _membership, reservation) = h
        .member_with_reservation("alice@example.com", "Adult", 300_00)
        .await?;

    // First installment
    let (buyable, owed) = h.reservation_owed(&reservation).await?;
    assert_eq!(owed, 300_00);
    let outcome = h
        .charge_customer
        .call(&buyable, &user, "tok_visa", owed, Some(100_00))
        .await?;
    assert!(outcome.success);
    assert_eq!(outcome.charge.amount_cents, 100_00);
    assert!(!outcome.fully_paid);
    assert_eq!(outcome.outstanding_cents, 200_00);
    assert_eq!(
        h.reservation_state(reservation.id).await?,
        ReservationState::Installment
    );

    // Second charge clears the balance
    let (buyable, owed) = h.reservation_owed(&reservation).await?;
    assert_eq!(owed, 200_00);
    let outcome = h
        .charge_customer
        .call(&buyable, &user, "tok_visa", owed, Some(200_00))
        .await?;
    assert!(outcome.success);
    assert!(outcome.fully_paid);
    assert_eq!(
        h.reservation_state(reservation.id).await?,
        ReservationState::Paid
    );

    // The settled charge carries the generated description
    assert!(outcome.charge.comment.contains("Paid"));
    assert!(outcome.charge.comment.contains("Adult"));
    Ok(())
}

#[tokio::test]
async fn test_refuses_to_overpay() -> anyhow::Result<()> {
    let h = harness().await?;
    let (user, _membership, reservation) = h
        .member_with_reservation("bob@example.com", "Supporting", 75_00)
        .await?;

    let (buyable, owed) = h.reservation_owed(&reservation).await?;
    let outcome = h
        .charge_customer
        .call(&buyable, &user, "tok_visa", owed, Some(owed))
        .await?;
    assert!(outcome.success);

    // Paid in full; any further amount must be refused before the provider
    // is involved.
    let (buyable, owed) = h.reservation_owed(&reservation).await?;
    assert_eq!(owed, 0);
    let outcome = h
        .charge_customer
        .call(&buyable, &user, "tok_visa", owed, Some(50_00))
        .await?;
    assert!(!outcome.success);
    assert!(outcome
        .errors
        .iter()
        .any(|e| e.contains("refusing to overpay")));
    assert_eq!(outcome.charge.state, ChargeState::Failed);
    assert!(outcome.charge.comment.contains("refusing to overpay"));

    // Only the one successful charge counts; the sum never exceeds price
    let charges = h
        .charge_repo
        .list_for_buyable(&outcome.charge.buyable)
        .await?;
    let successful: i64 = charges
        .iter()
        .filter(|c| c.successful())
        .map(|c| c.amount_cents)
        .sum();
    assert_eq!(successful, 75_00);

    // No second provider charge was submitted
    assert_eq!(h.gateway.charge_requests().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_declined_charge_keeps_reservation_state() -> anyhow::Result<()> {
    let h = harness_with(FakeStripeGateway::new().decline_charges("Your card was declined")).await?;
    let (user, _membership, reservation) = h
        .member_with_reservation("carol@example.com", "Adult", 370_00)
        .await?;

    let (buyable, owed) = h.reservation_owed(&reservation).await?;
    let outcome = h
        .charge_customer
        .call(&buyable, &user, "tok_chargeDeclined", owed, None)
        .await?;

    assert!(!outcome.success);
    assert_eq!(outcome.charge.state, ChargeState::Failed);
    // The provider's raw response is kept for audit
    assert!(outcome.charge.provider_response.is_some());
    assert!(!outcome.charge.comment.is_empty());
    // No money moved, so the reservation does not regress or advance
    assert_eq!(
        h.reservation_state(reservation.id).await?,
        ReservationState::New
    );
    Ok(())
}

#[tokio::test]
async fn test_provider_error_during_customer_setup() -> anyhow::Result<()> {
    let h =
        harness_with(FakeStripeGateway::new().fail_customer_setup("API connection refused")).await?;
    let (user, _membership, reservation) = h
        .member_with_reservation("dan@example.com", "Adult", 370_00)
        .await?;

    let (buyable, owed) = h.reservation_owed(&reservation).await?;
    let outcome = h
        .charge_customer
        .call(&buyable, &user, "tok_visa", owed, None)
        .await?;

    assert!(!outcome.success);
    assert!(outcome.errors.iter().any(|e| e.contains("refused")));
    assert_eq!(outcome.charge.state, ChargeState::Failed);
    // Nothing was submitted to the provider
    assert!(h.gateway.charge_requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_customer_setup_is_idempotent() -> anyhow::Result<()> {
    let h = harness().await?;
    let (user, _membership, reservation) = h
        .member_with_reservation("erin@example.com", "Adult", 370_00)
        .await?;

    let (buyable, owed) = h.reservation_owed(&reservation).await?;
    let outcome = h
        .charge_customer
        .call(&buyable, &user, "tok_visa", owed, Some(75_00))
        .await?;
    assert!(outcome.success);

    // The stored provider identity is reused on the next charge
    let user = h
        .user_repo
        .find_by_id(user.id)
        .await?
        .expect("user exists");
    assert!(user.stripe_customer_id.is_some());

    let (buyable, owed) = h.reservation_owed(&reservation).await?;
    let outcome = h
        .charge_customer
        .call(&buyable, &user, "tok_visa", owed, Some(75_00))
        .await?;
    assert!(outcome.success);

    assert_eq!(h.gateway.customers_created(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_attempts_always_leave_audit_rows() -> anyhow::Result<()> {
    let h = harness().await?;
    let (user, _membership, reservation) = h
        .member_with_reservation("frank@example.com", "Supporting", 75_00)
        .await?;

    let (buyable, owed) = h.reservation_owed(&reservation).await?;
    let outcome = h
        .charge_customer
        .call(&buyable, &user, "tok_visa", owed, Some(-5))
        .await?;
    assert!(!outcome.success);

    let charges = h
        .charge_repo
        .list_for_buyable(&outcome.charge.buyable)
        .await?;
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].state, ChargeState::Failed);
    assert!(charges[0].comment.contains("more than 0 cents"));
    Ok(())
}
