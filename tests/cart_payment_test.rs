mod common;

use common::harness;
use conclave::domain::{CartStatus, ReservationState};

#[tokio::test]
async fn test_paying_cart_in_full_closes_it_and_pays_items() -> anyhow::Result<()> {
    let h = harness().await?;
    let user = h.create_user("cart@example.com").await?;
    let adult = h.create_membership("Adult", 300_00).await?;
    let supporting = h.create_membership("Supporting", 75_00).await?;

    let cart = h.cart_service.open_cart(&user).await?;
    h.cart_service
        .add_membership_item(&cart, &user, adult.id, "Ada Lovelace")
        .await?;
    h.cart_service
        .add_membership_item(&cart, &user, supporting.id, "Tim Berners-Lee")
        .await?;

    let (buyable, _charges, owed) = h.cart_service.amount_owed(&cart).await?;
    assert_eq!(owed, 375_00);

    let outcome = h
        .charge_customer
        .call(&buyable, &user, "tok_visa", owed, None)
        .await?;
    assert!(outcome.success);
    assert!(outcome.fully_paid);

    let cart = h.cart_repo.find_by_id(cart.id).await?.expect("cart exists");
    assert_eq!(cart.status, CartStatus::Paid);
    assert!(cart.active_to.is_some());

    // Every reservation in the cart is paid off with it
    for item in h.cart_repo.items(cart.id).await? {
        let reservation_id = item.reservation_id.expect("item has reservation");
        assert_eq!(
            h.reservation_state(reservation_id).await?,
            ReservationState::Paid
        );
    }

    // Cart descriptions name the contents
    assert!(outcome.charge.comment.contains("Ada Lovelace"));
    Ok(())
}

#[tokio::test]
async fn test_partial_cart_payment_keeps_cart_open() -> anyhow::Result<()> {
    let h = harness().await?;
    let user = h.create_user("cart2@example.com").await?;
    let adult = h.create_membership("Adult", 300_00).await?;

    let cart = h.cart_service.open_cart(&user).await?;
    h.cart_service
        .add_membership_item(&cart, &user, adult.id, "Grace Hopper")
        .await?;

    let (buyable, _charges, owed) = h.cart_service.amount_owed(&cart).await?;
    let outcome = h
        .charge_customer
        .call(&buyable, &user, "tok_visa", owed, Some(100_00))
        .await?;
    assert!(outcome.success);
    assert!(!outcome.fully_paid);

    let cart = h.cart_repo.find_by_id(cart.id).await?.expect("cart exists");
    assert_eq!(cart.status, CartStatus::ForNow);
    assert!(cart.active_to.is_none());

    let (_buyable, _charges, owed) = h.cart_service.amount_owed(&cart).await?;
    assert_eq!(owed, 200_00);
    Ok(())
}

#[tokio::test]
async fn test_cart_overpay_refused() -> anyhow::Result<()> {
    let h = harness().await?;
    let user = h.create_user("cart3@example.com").await?;
    let supporting = h.create_membership("Supporting", 75_00).await?;

    let cart = h.cart_service.open_cart(&user).await?;
    h.cart_service
        .add_membership_item(&cart, &user, supporting.id, "Katherine Johnson")
        .await?;

    let (buyable, _charges, owed) = h.cart_service.amount_owed(&cart).await?;
    let outcome = h
        .charge_customer
        .call(&buyable, &user, "tok_visa", owed, Some(100_00))
        .await?;
    assert!(!outcome.success);
    assert!(outcome
        .errors
        .iter()
        .any(|e| e.contains("refusing to overpay")));
    Ok(())
}

#[tokio::test]
async fn test_open_cart_is_reused() -> anyhow::Result<()> {
    let h = harness().await?;
    let user = h.create_user("cart4@example.com").await?;

    let first = h.cart_service.open_cart(&user).await?;
    let second = h.cart_service.open_cart(&user).await?;
    assert_eq!(first.id, second.id);
    Ok(())
}
