//! Domain models for the CarSouq auction backend.
//!
//! This module contains the database-backed models for the auction core and
//! the pure state-transition functions that drive bid placement, closing and
//! withdrawal. The transition functions take current state plus a command
//! input and return the next state, so every invariant is testable without a
//! database; persistence is a separate, explicit step in the repositories.

pub mod auction;
pub mod bid;

// Re-export all models for convenient access
pub use auction::{
    AntiSnipe, Auction, AuctionStatus, BidPlacement, BidRejection, CloseOutcome, CloseRejection,
};
pub use bid::{Bid, BidStatus, WithdrawalRejection};
