mod helpers;

use carsouq_backend::auth::{self, Action, Actor, Role};
use carsouq_backend::error::AppError;
use carsouq_backend::models::*;
use chrono::{Duration, Utc};
use helpers::*;
use rust_decimal::Decimal;

// =============================================================================
// Minimum next bid
// =============================================================================

#[test]
fn test_minimum_next_bid_without_bids_is_start_price() {
    let auction = sample_auction(1000, 100);
    assert_eq!(auction.minimum_next_bid(), Decimal::new(1000, 0));
}

#[test]
fn test_minimum_next_bid_with_last_price_adds_increment() {
    let mut auction = sample_auction(1000, 100);
    auction.last_price = Some(Decimal::new(1000, 0));
    auction.bid_count = 1;
    assert_eq!(auction.minimum_next_bid(), Decimal::new(1100, 0));
}

// =============================================================================
// Bid placement
// =============================================================================

#[test]
fn test_first_bid_below_start_price_rejected() {
    let auction = sample_auction(1000, 100);
    let now = Utc::now();

    let err = auction.apply_bid(Decimal::new(999, 0), now).unwrap_err();
    assert_eq!(
        err,
        BidRejection::TooLow {
            minimum: Decimal::new(1000, 0)
        }
    );
    // Computed minimum is part of the message the caller sees
    assert!(err.to_string().contains("1000"));
}

#[test]
fn test_first_bid_at_start_price_accepted() {
    let auction = sample_auction(1000, 100);
    let now = Utc::now();

    let placement = auction.apply_bid(Decimal::new(1000, 0), now).unwrap();
    assert_eq!(placement.last_price, Decimal::new(1000, 0));
    assert_eq!(placement.bid_count, 1);
    assert!(placement.anti_snipe.is_none());
    assert_eq!(placement.end_time, auction.end_time);
}

#[test]
fn test_second_bid_must_clear_increment() {
    let mut auction = sample_auction(1000, 100);
    auction.last_price = Some(Decimal::new(1000, 0));
    auction.bid_count = 1;
    let now = Utc::now();

    // 1050 does not clear 1000 + 100
    let err = auction.apply_bid(Decimal::new(1050, 0), now).unwrap_err();
    assert_eq!(
        err,
        BidRejection::TooLow {
            minimum: Decimal::new(1100, 0)
        }
    );

    let placement = auction.apply_bid(Decimal::new(1100, 0), now).unwrap();
    assert_eq!(placement.last_price, Decimal::new(1100, 0));
    assert_eq!(placement.bid_count, 2);
}

#[test]
fn test_bid_on_closed_auction_rejected() {
    let mut auction = sample_auction(1000, 100);
    auction.status = "closed".to_string();
    let now = Utc::now();

    let err = auction.apply_bid(Decimal::new(1000, 0), now).unwrap_err();
    assert!(matches!(err, BidRejection::NotActive { .. }));
}

#[test]
fn test_bid_before_start_rejected() {
    let mut auction = sample_auction(1000, 100);
    auction.start_time = Utc::now() + Duration::hours(1);
    let now = Utc::now();

    let err = auction.apply_bid(Decimal::new(1000, 0), now).unwrap_err();
    assert_eq!(err, BidRejection::NotStarted);
}

#[test]
fn test_bid_after_end_rejected() {
    let auction = sample_auction(1000, 100);
    let late = auction.end_time + Duration::seconds(1);

    let err = auction.apply_bid(Decimal::new(1000, 0), late).unwrap_err();
    assert_eq!(err, BidRejection::Ended);

    // Exactly at end_time the auction is over as well
    let err = auction.apply_bid(Decimal::new(1000, 0), auction.end_time).unwrap_err();
    assert_eq!(err, BidRejection::Ended);
}

#[test]
fn test_rejection_is_idempotent() {
    let auction = sample_auction(1000, 100);
    let now = Utc::now();

    // Rejections return no placement, so nothing to persist; retrying with a
    // higher price succeeds against unchanged state
    assert!(auction.apply_bid(Decimal::new(999, 0), now).is_err());
    assert!(auction.apply_bid(Decimal::new(999, 0), now).is_err());
    assert!(auction.apply_bid(Decimal::new(1000, 0), now).is_ok());
}

#[test]
fn test_accepted_prices_are_monotonic() {
    let mut auction = sample_auction(1000, 100);
    let now = Utc::now();
    let mut previous = Decimal::ZERO;

    for price in [1000i64, 1100, 1300, 2000] {
        let placement = auction.apply_bid(Decimal::new(price, 0), now).unwrap();
        assert!(placement.last_price > previous);
        previous = placement.last_price;
        auction.last_price = Some(placement.last_price);
        auction.bid_count = placement.bid_count;
    }

    assert_eq!(auction.bid_count, 4);
    assert_eq!(auction.last_price, Some(Decimal::new(2000, 0)));
}

// =============================================================================
// Anti-snipe
// =============================================================================

#[test]
fn test_bid_inside_snipe_window_extends_end_time() {
    let mut auction = sample_auction(1000, 100);
    let now = Utc::now();
    // End in 200s, window 300s: the bid lands inside the window
    auction.end_time = now + Duration::seconds(200);

    let placement = auction.apply_bid(Decimal::new(1000, 0), now).unwrap();
    let snipe = placement.anti_snipe.expect("anti-snipe should trigger");
    assert_eq!(snipe.extension_seconds, 300);
    assert_eq!(snipe.new_end_time, now + Duration::seconds(300));
    assert_eq!(placement.end_time, snipe.new_end_time);
}

#[test]
fn test_bid_outside_snipe_window_leaves_end_time() {
    let mut auction = sample_auction(1000, 100);
    let now = Utc::now();
    auction.end_time = now + Duration::seconds(400);

    let placement = auction.apply_bid(Decimal::new(1000, 0), now).unwrap();
    assert!(placement.anti_snipe.is_none());
    assert_eq!(placement.end_time, auction.end_time);
}

#[test]
fn test_snipe_window_boundary_triggers() {
    let mut auction = sample_auction(1000, 100);
    let now = Utc::now();
    // Exactly window seconds before the end
    auction.end_time = now + Duration::seconds(300);

    assert!(auction.should_trigger_anti_snipe(now));
    let placement = auction.apply_bid(Decimal::new(1000, 0), now).unwrap();
    assert!(placement.anti_snipe.is_some());
}

#[test]
fn test_extension_repeats_without_cap() {
    let mut auction = sample_auction(1000, 100);
    let mut now = Utc::now();
    auction.end_time = now + Duration::seconds(100);

    // Every qualifying late bid pushes the end out again
    for (i, price) in [1000i64, 1100, 1200].iter().enumerate() {
        let placement = auction.apply_bid(Decimal::new(*price, 0), now).unwrap();
        assert!(placement.anti_snipe.is_some(), "extension {} should fire", i);
        auction.last_price = Some(placement.last_price);
        auction.bid_count = placement.bid_count;
        auction.end_time = placement.end_time;
        now = now + Duration::seconds(60);
    }
}

// =============================================================================
// Closing
// =============================================================================

#[test]
fn test_close_with_no_bids_has_no_winner() {
    let auction = sample_auction(1000, 100);
    let outcome = auction.close_outcome(None);

    assert_eq!(outcome.winner_id, None);
    assert_eq!(outcome.winning_bid_id, None);
    assert_eq!(outcome.reserve_met, None);
}

#[test]
fn test_close_under_reserve_has_no_winner() {
    let mut auction = sample_auction(800, 100);
    auction.reserve_price = Some(Decimal::new(1500, 0));
    let highest = sample_bid(auction.id, 1200, Utc::now());

    let outcome = auction.close_outcome(Some(&highest));
    assert_eq!(outcome.reserve_met, Some(false));
    assert_eq!(outcome.winner_id, None);
    assert_eq!(outcome.winning_bid_id, None);
}

#[test]
fn test_close_meeting_reserve_declares_winner() {
    let mut auction = sample_auction(800, 100);
    auction.reserve_price = Some(Decimal::new(1000, 0));
    let highest = sample_bid(auction.id, 1200, Utc::now());

    let outcome = auction.close_outcome(Some(&highest));
    assert_eq!(outcome.reserve_met, Some(true));
    assert_eq!(outcome.winner_id, Some(highest.bidder_id));
    assert_eq!(outcome.winning_bid_id, Some(highest.id));
}

#[test]
fn test_close_without_reserve_declares_winner() {
    let auction = sample_auction(800, 100);
    let highest = sample_bid(auction.id, 900, Utc::now());

    let outcome = auction.close_outcome(Some(&highest));
    assert_eq!(outcome.reserve_met, None);
    assert_eq!(outcome.winner_id, Some(highest.bidder_id));
}

#[test]
fn test_terminal_states_reject_transitions() {
    let mut auction = sample_auction(1000, 100);
    assert!(auction.check_transitionable().is_ok());

    auction.status = "closed".to_string();
    assert_eq!(
        auction.check_transitionable().unwrap_err(),
        CloseRejection::AlreadyClosed
    );

    auction.status = "cancelled".to_string();
    assert_eq!(
        auction.check_transitionable().unwrap_err(),
        CloseRejection::Cancelled
    );
}

// =============================================================================
// Withdrawal
// =============================================================================

#[test]
fn test_highest_bid_cannot_be_withdrawn() {
    let auction = sample_auction(1000, 100);
    let bid = sample_bid(auction.id, 1200, Utc::now());

    let err = bid
        .check_withdrawable(&auction, true, Utc::now())
        .unwrap_err();
    assert_eq!(err, WithdrawalRejection::HighestBid);
}

#[test]
fn test_lower_bid_can_be_withdrawn() {
    let auction = sample_auction(1000, 100);
    let bid = sample_bid(auction.id, 1000, Utc::now());

    assert!(bid.check_withdrawable(&auction, false, Utc::now()).is_ok());
}

#[test]
fn test_withdrawn_bid_cannot_be_withdrawn_again() {
    let auction = sample_auction(1000, 100);
    let mut bid = sample_bid(auction.id, 1000, Utc::now());
    bid.status = "withdrawn".to_string();
    bid.withdrawn_at = Some(Utc::now());

    let err = bid
        .check_withdrawable(&auction, false, Utc::now())
        .unwrap_err();
    assert_eq!(err, WithdrawalRejection::AlreadyWithdrawn);
}

#[test]
fn test_withdrawal_rejected_on_inactive_auction() {
    let mut auction = sample_auction(1000, 100);
    auction.status = "closed".to_string();
    let bid = sample_bid(auction.id, 1000, Utc::now());

    let err = bid
        .check_withdrawable(&auction, false, Utc::now())
        .unwrap_err();
    assert!(matches!(err, WithdrawalRejection::AuctionNotActive { .. }));
}

#[test]
fn test_withdrawal_rejected_after_auction_ended() {
    let auction = sample_auction(1000, 100);
    let bid = sample_bid(auction.id, 1000, Utc::now());
    let late = auction.end_time + Duration::seconds(1);

    let err = bid.check_withdrawable(&auction, false, late).unwrap_err();
    assert_eq!(err, WithdrawalRejection::AuctionEnded);
}

#[test]
fn test_withdrawal_reports_most_specific_reason() {
    // A withdrawn highest bid on an ended, closed auction fails every check;
    // the caller must see "already withdrawn" first
    let mut auction = sample_auction(1000, 100);
    auction.status = "closed".to_string();
    let mut bid = sample_bid(auction.id, 1200, Utc::now());
    bid.status = "withdrawn".to_string();
    let late = auction.end_time + Duration::seconds(1);

    let err = bid.check_withdrawable(&auction, true, late).unwrap_err();
    assert_eq!(err, WithdrawalRejection::AlreadyWithdrawn);

    // With an active bid the highest-bid reason wins over auction state
    bid.status = "active".to_string();
    let err = bid.check_withdrawable(&auction, true, late).unwrap_err();
    assert_eq!(err, WithdrawalRejection::HighestBid);

    // Non-highest: auction state wins over timing
    let err = bid.check_withdrawable(&auction, false, late).unwrap_err();
    assert!(matches!(err, WithdrawalRejection::AuctionNotActive { .. }));
}

// =============================================================================
// Authorization policy
// =============================================================================

#[test]
fn test_view_bids_restricted_to_owner_and_staff() {
    let auction = sample_auction(1000, 100);
    let owner = Actor::new(auction.owner_id, Role::User);

    assert!(auth::authorize(&owner, Action::ViewBids, &auction, None).is_ok());
    assert!(auth::authorize(&admin_actor(), Action::ViewBids, &auction, None).is_ok());
    assert!(auth::authorize(&moderator_actor(), Action::ViewBids, &auction, None).is_ok());
    assert!(auth::authorize(&user_actor(), Action::ViewBids, &auction, None).is_err());
}

#[test]
fn test_only_placer_may_withdraw() {
    let auction = sample_auction(1000, 100);
    let bid = sample_bid(auction.id, 1000, Utc::now());
    let placer = Actor::new(bid.bidder_id, Role::User);

    assert!(auth::authorize(&placer, Action::WithdrawBid, &auction, Some(&bid)).is_ok());
    // Not even admins withdraw on behalf of users
    assert!(auth::authorize(&admin_actor(), Action::WithdrawBid, &auction, Some(&bid)).is_err());
}

#[test]
fn test_close_allowed_for_owner_and_admin_only() {
    let auction = sample_auction(1000, 100);
    let owner = Actor::new(auction.owner_id, Role::User);

    assert!(auth::authorize(&owner, Action::CloseAuction, &auction, None).is_ok());
    assert!(auth::authorize(&admin_actor(), Action::CloseAuction, &auction, None).is_ok());
    assert!(auth::authorize(&moderator_actor(), Action::CloseAuction, &auction, None).is_err());
    assert!(auth::authorize(&user_actor(), Action::CloseAuction, &auction, None).is_err());
}

#[test]
fn test_owner_cannot_cancel_once_bids_exist() {
    let mut auction = sample_auction(1000, 100);
    let owner = Actor::new(auction.owner_id, Role::User);

    assert!(auth::authorize(&owner, Action::CancelAuction, &auction, None).is_ok());

    auction.bid_count = 1;
    let err = auth::authorize(&owner, Action::CancelAuction, &auction, None).unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // Admin may cancel regardless of bids
    assert!(auth::authorize(&admin_actor(), Action::CancelAuction, &auction, None).is_ok());
}

#[test]
fn test_private_field_visibility() {
    let auction = sample_auction(1000, 100);
    let owner = Actor::new(auction.owner_id, Role::User);

    assert!(auth::can_view_private_fields(&owner, &auction));
    assert!(auth::can_view_private_fields(&admin_actor(), &auction));
    assert!(auth::can_view_private_fields(&moderator_actor(), &auction));
    assert!(!auth::can_view_private_fields(&user_actor(), &auction));
}

// =============================================================================
// Creation terms
// =============================================================================

#[test]
fn test_validate_terms() {
    let now = Utc::now();
    let later = now + Duration::hours(1);

    assert!(Auction::validate_terms(
        Decimal::new(1000, 0),
        None,
        Decimal::new(100, 0),
        now,
        later
    )
    .is_ok());

    // Negative start price
    assert!(Auction::validate_terms(
        Decimal::new(-1, 0),
        None,
        Decimal::new(100, 0),
        now,
        later
    )
    .is_err());

    // Zero increment
    assert!(Auction::validate_terms(
        Decimal::new(1000, 0),
        None,
        Decimal::ZERO,
        now,
        later
    )
    .is_err());

    // End before start
    assert!(Auction::validate_terms(
        Decimal::new(1000, 0),
        None,
        Decimal::new(100, 0),
        later,
        now
    )
    .is_err());

    // Reserve must exceed start price
    assert!(Auction::validate_terms(
        Decimal::new(1000, 0),
        Some(Decimal::new(1000, 0)),
        Decimal::new(100, 0),
        now,
        later
    )
    .is_err());
    assert!(Auction::validate_terms(
        Decimal::new(1000, 0),
        Some(Decimal::new(1001, 0)),
        Decimal::new(100, 0),
        now,
        later
    )
    .is_ok());
}

// =============================================================================
// Status conversions and error mapping
// =============================================================================

#[test]
fn test_auction_status_conversion() {
    assert_eq!(AuctionStatus::Active.as_str(), "active");
    assert_eq!(AuctionStatus::Closed.as_str(), "closed");
    assert_eq!(AuctionStatus::Cancelled.as_str(), "cancelled");
    assert_eq!(AuctionStatus::from_str("CLOSED").unwrap(), AuctionStatus::Closed);
    assert!(AuctionStatus::from_str("bogus").is_err());
}

#[test]
fn test_bid_status_conversion() {
    assert_eq!(BidStatus::Active.as_str(), "active");
    assert_eq!(BidStatus::Withdrawn.as_str(), "withdrawn");
    assert_eq!(BidStatus::from_str("withdrawn").unwrap(), BidStatus::Withdrawn);
}

#[test]
fn test_role_conversion() {
    assert_eq!(Role::from_str("admin").unwrap(), Role::Admin);
    assert_eq!(Role::from_str("MODERATOR").unwrap(), Role::Moderator);
    assert_eq!(Role::User.as_str(), "user");
    assert!(Role::from_str("superuser").is_err());
}

#[test]
fn test_rejections_map_to_http_statuses() {
    let too_low: AppError = BidRejection::TooLow {
        minimum: Decimal::new(1000, 0),
    }
    .into();
    assert_eq!(too_low.status_code(), 400);
    assert!(too_low.client_message().contains("1000"));

    let ended: AppError = BidRejection::Ended.into();
    assert_eq!(ended.status_code(), 409);

    let highest: AppError = WithdrawalRejection::HighestBid.into();
    assert_eq!(highest.status_code(), 422);

    let withdrawn: AppError = WithdrawalRejection::AlreadyWithdrawn.into();
    assert_eq!(withdrawn.status_code(), 409);

    let closed: AppError = CloseRejection::AlreadyClosed.into();
    assert_eq!(closed.status_code(), 409);
}
