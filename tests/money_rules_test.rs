//! Unit-level checks on the pure money helpers: balance derivation, the
//! charge amount rules, installment options, and description clamping.

use chrono::Utc;
use uuid::Uuid;

use conclave::{
    domain::{
        clamp_comment, Buyable, Charge, ChargeOrigin, ChargeState, Membership, Reservation,
        ReservationState, MAX_COMMENT_LENGTH,
    },
    payments::{amount_owed, check_charge_amount, PaymentAmountOptions},
};

fn reservation_buyable(price_cents: i64) -> Buyable {
    let now = Utc::now();
    let membership = Membership {
        id: Uuid::new_v4(),
        name: "Adult".to_string(),
        price_cents,
        active_from: now,
        active_to: None,
        created_at: now,
        updated_at: now,
    };
    let reservation = Reservation {
        id: Uuid::new_v4(),
        membership_number: 42,
        membership_id: membership.id,
        user_id: Uuid::new_v4(),
        state: ReservationState::New,
        created_at: now,
        updated_at: now,
    };
    Buyable::Reservation {
        reservation,
        membership,
    }
}

fn charge(buyable: &Buyable, state: ChargeState, amount_cents: i64, site: bool) -> Charge {
    let mut charge = Charge::new_pending(
        Uuid::new_v4(),
        buyable.reference(),
        ChargeOrigin::StripeDirect,
        amount_cents,
        "usd",
        "test",
    );
    charge.state = state;
    charge.site = site;
    charge
}

#[test]
fn test_amount_owed_counts_only_successful_non_site_charges() {
    let buyable = reservation_buyable(300_00);
    let charges = vec![
        charge(&buyable, ChargeState::Successful, 100_00, false),
        charge(&buyable, ChargeState::Failed, 100_00, false),
        charge(&buyable, ChargeState::Pending, 50_00, false),
        charge(&buyable, ChargeState::Successful, 50_00, true),
    ];

    assert_eq!(amount_owed::paid_cents(&charges), 100_00);
    assert_eq!(amount_owed::amount_owed_cents(&buyable, &charges), 200_00);
    assert!(!amount_owed::fully_paid(&buyable, &charges));
}

#[test]
fn test_overpayment_on_record_reads_as_fully_paid() {
    let buyable = reservation_buyable(100_00);
    let charges = vec![charge(&buyable, ChargeState::Successful, 120_00, false)];

    // Negative balance means fully paid, never a balance to charge
    assert_eq!(amount_owed::amount_owed_cents(&buyable, &charges), -20_00);
    assert!(amount_owed::fully_paid(&buyable, &charges));
}

#[test]
fn test_charge_amount_rules() {
    assert!(check_charge_amount(Some(50_00), 100_00).is_empty());
    assert!(check_charge_amount(Some(100_00), 100_00).is_empty());

    let errors = check_charge_amount(None, 100_00);
    assert_eq!(errors, vec!["charge amount is missing".to_string()]);

    let errors = check_charge_amount(Some(0), 100_00);
    assert!(errors.iter().any(|e| e.contains("more than 0 cents")));

    let errors = check_charge_amount(Some(150_00), 100_00);
    assert!(errors.iter().any(|e| e.contains("refusing to overpay")));

    // Negative amount against a zero balance trips both rules
    let errors = check_charge_amount(Some(-1), 0);
    assert_eq!(errors.len(), 2);
}

#[test]
fn test_payment_amount_options_step_up_to_the_balance() {
    let options = PaymentAmountOptions::new(75_00, 50_00);

    assert_eq!(
        options.amounts(230_00),
        vec![75_00, 125_00, 175_00, 225_00, 230_00]
    );
    // Small balances collapse to a single pay-in-full option
    assert_eq!(options.amounts(40_00), vec![40_00]);
    // The exact minimum is offered once, not duplicated
    assert_eq!(options.amounts(75_00), vec![75_00]);
    assert!(options.amounts(0).is_empty());
    assert!(options.amounts(-10).is_empty());
}

#[test]
fn test_comment_clamping_respects_char_boundaries() {
    let short = "paid in full";
    assert_eq!(clamp_comment(short), short);

    let long = "x".repeat(400);
    assert_eq!(clamp_comment(&long).len(), MAX_COMMENT_LENGTH);

    // A multi-byte character straddling the limit is dropped, not split
    let mut tricky = "y".repeat(MAX_COMMENT_LENGTH - 1);
    tricky.push('é');
    let clamped = clamp_comment(&tricky);
    assert!(clamped.len() <= MAX_COMMENT_LENGTH);
    assert!(clamped.chars().all(|c| c == 'y'));
}
