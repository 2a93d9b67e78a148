mod common;

use common::harness;
use conclave::domain::ReservationState;

#[tokio::test]
async fn test_free_membership_is_paid_from_the_start() -> anyhow::Result<()> {
    let h = harness().await?;
    let user = h.create_user("kid@example.com").await?;
    let membership = h.create_membership("Kid-in-tow", 0).await?;

    let reservation = h
        .reservation_service
        .claim_membership(&user, membership.id)
        .await?;
    assert_eq!(reservation.state, ReservationState::Paid);
    Ok(())
}

#[tokio::test]
async fn test_membership_numbers_ascend() -> anyhow::Result<()> {
    let h = harness().await?;
    let user = h.create_user("numbers@example.com").await?;
    let membership = h.create_membership("Adult", 370_00).await?;

    let first = h
        .reservation_service
        .claim_membership(&user, membership.id)
        .await?;
    let second = h
        .reservation_service
        .claim_membership(&user, membership.id)
        .await?;
    assert_eq!(first.state, ReservationState::New);
    assert_eq!(second.membership_number, first.membership_number + 1);
    Ok(())
}

#[tokio::test]
async fn test_disable_and_reenable_recomputes_from_charges() -> anyhow::Result<()> {
    let h = harness().await?;
    let (user, _membership, reservation) = h
        .member_with_reservation("staff-case@example.com", "Adult", 300_00)
        .await?;

    // One installment on record
    let (buyable, _owed) = h.reservation_owed(&reservation).await?;
    let outcome = h.cash.call(&buyable, &user, 100_00, None).await?;
    assert!(outcome.success);
    assert_eq!(
        h.reservation_state(reservation.id).await?,
        ReservationState::Installment
    );

    // Staff disable wins over payment state
    h.reservation_service.disable(reservation.id).await?;
    assert_eq!(
        h.reservation_state(reservation.id).await?,
        ReservationState::Disabled
    );

    // Re-enable derives the state from the charge sum, not from what it was
    let enabled = h.reservation_service.enable(reservation.id).await?;
    assert_eq!(enabled.state, ReservationState::Installment);
    Ok(())
}

#[tokio::test]
async fn test_charges_do_not_reenable_disabled_reservations() -> anyhow::Result<()> {
    let h = harness().await?;
    let (user, _membership, reservation) = h
        .member_with_reservation("disabled@example.com", "Adult", 300_00)
        .await?;

    h.reservation_service.disable(reservation.id).await?;

    let (buyable, _owed) = h.reservation_owed(&reservation).await?;
    let outcome = h.cash.call(&buyable, &user, 300_00, None).await?;
    assert!(outcome.success);

    // The money is on record but the reservation stays disabled until staff
    // re-enable it, at which point the sum says paid.
    assert_eq!(
        h.reservation_state(reservation.id).await?,
        ReservationState::Disabled
    );
    let enabled = h.reservation_service.enable(reservation.id).await?;
    assert_eq!(enabled.state, ReservationState::Paid);
    Ok(())
}

#[tokio::test]
async fn test_cash_charge_respects_overpay_rule() -> anyhow::Result<()> {
    let h = harness().await?;
    let (user, _membership, reservation) = h
        .member_with_reservation("cash@example.com", "Supporting", 75_00)
        .await?;

    let (buyable, _owed) = h.reservation_owed(&reservation).await?;
    let outcome = h.cash.call(&buyable, &user, 80_00, Some("Paid at kiosk")).await?;
    assert!(!outcome.success);
    assert!(outcome
        .errors
        .iter()
        .any(|e| e.contains("refusing to overpay")));

    let outcome = h.cash.call(&buyable, &user, 75_00, Some("Paid at kiosk")).await?;
    assert!(outcome.success);
    // Staff note survives settlement
    assert_eq!(outcome.charge.comment, "Paid at kiosk");
    assert_eq!(
        h.reservation_state(reservation.id).await?,
        ReservationState::Paid
    );
    Ok(())
}
