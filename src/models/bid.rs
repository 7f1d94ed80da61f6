use crate::error::AppError;
use crate::models::auction::Auction;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

/// Bid status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidStatus {
    Active,
    Withdrawn,
}

impl BidStatus {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "active" => Ok(BidStatus::Active),
            "withdrawn" => Ok(BidStatus::Withdrawn),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            BidStatus::Active => "active",
            BidStatus::Withdrawn => "withdrawn",
        }
    }
}

impl From<String> for BidStatus {
    fn from(s: String) -> Self {
        Self::from_str(&s).unwrap_or(BidStatus::Active)
    }
}

impl From<BidStatus> for String {
    fn from(status: BidStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Bid model representing a single price offer against an auction.
///
/// The price is write-once; only `status` and `withdrawn_at` ever change
/// after creation. Bids are never deleted, withdrawn or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Bid {
    pub id: Uuid,
    pub auction_id: Uuid,
    pub bidder_id: Uuid,
    pub price: Decimal,
    pub comment: Option<String>,
    pub status: String, // Stored as TEXT, use BidStatus enum for type safety
    pub withdrawn_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Reasons a withdrawal is rejected, ordered most specific first
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WithdrawalRejection {
    #[error("Bid has already been withdrawn")]
    AlreadyWithdrawn,

    #[error("The highest bid cannot be withdrawn")]
    HighestBid,

    #[error("Auction is {status} and bids can no longer be withdrawn")]
    AuctionNotActive { status: String },

    #[error("Auction has already ended")]
    AuctionEnded,
}

impl From<WithdrawalRejection> for AppError {
    fn from(rejection: WithdrawalRejection) -> Self {
        match rejection {
            WithdrawalRejection::HighestBid => AppError::BusinessRule(rejection.to_string()),
            _ => AppError::Conflict(rejection.to_string()),
        }
    }
}

impl Bid {
    /// Get status as an enum
    pub fn status_enum(&self) -> BidStatus {
        BidStatus::from_str(&self.status).unwrap_or(BidStatus::Active)
    }

    /// Check if bid is active
    pub fn is_active(&self) -> bool {
        self.status_enum() == BidStatus::Active
    }

    /// Check if bid has been withdrawn
    pub fn is_withdrawn(&self) -> bool {
        self.status_enum() == BidStatus::Withdrawn
    }

    /// Check the bid may be withdrawn. The checks run in a fixed order so a
    /// caller failing several conditions sees the most specific reason:
    /// already withdrawn, then highest bid, then auction state, then timing.
    pub fn check_withdrawable(
        &self,
        auction: &Auction,
        is_highest: bool,
        now: DateTime<Utc>,
    ) -> Result<(), WithdrawalRejection> {
        if self.is_withdrawn() {
            return Err(WithdrawalRejection::AlreadyWithdrawn);
        }
        if is_highest {
            return Err(WithdrawalRejection::HighestBid);
        }
        if !auction.is_active() {
            return Err(WithdrawalRejection::AuctionNotActive {
                status: auction.status.clone(),
            });
        }
        if auction.has_ended(now) {
            return Err(WithdrawalRejection::AuctionEnded);
        }
        Ok(())
    }
}
