use crate::error::AppError;
use crate::models::bid::Bid;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

/// Auction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    Active,
    Closed,
    Cancelled,
}

impl AuctionStatus {
    /// Convert from database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "active" => Ok(AuctionStatus::Active),
            "closed" => Ok(AuctionStatus::Closed),
            "cancelled" => Ok(AuctionStatus::Cancelled),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }

    /// Convert to database string
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::Active => "active",
            AuctionStatus::Closed => "closed",
            AuctionStatus::Cancelled => "cancelled",
        }
    }
}

impl From<String> for AuctionStatus {
    fn from(s: String) -> Self {
        Self::from_str(&s).unwrap_or(AuctionStatus::Active)
    }
}

impl From<AuctionStatus> for String {
    fn from(status: AuctionStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Auction model, one per auction-type ad
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Auction {
    pub id: Uuid,
    pub ad_id: Uuid,
    pub owner_id: Uuid,
    pub start_price: Decimal,
    pub reserve_price: Option<Decimal>,
    pub last_price: Option<Decimal>,
    pub minimum_bid_increment: Decimal,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub anti_snip_window_seconds: i32,
    pub anti_snip_extension_seconds: i32,
    pub auto_close: bool,
    pub is_last_price_visible: bool,
    pub status: String, // Stored as TEXT, use AuctionStatus enum for type safety
    pub bid_count: i64,
    pub winner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reasons a bid placement is rejected. No state is mutated on rejection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BidRejection {
    #[error("Auction is {status} and no longer accepts bids")]
    NotActive { status: String },

    #[error("Auction has not started yet")]
    NotStarted,

    #[error("Auction has already ended")]
    Ended,

    #[error("Bid must be at least {minimum}")]
    TooLow { minimum: Decimal },
}

impl From<BidRejection> for AppError {
    fn from(rejection: BidRejection) -> Self {
        match rejection {
            BidRejection::TooLow { .. } => AppError::Validation(rejection.to_string()),
            _ => AppError::Conflict(rejection.to_string()),
        }
    }
}

/// Reasons an auction cannot be closed or cancelled
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CloseRejection {
    #[error("Auction is already closed")]
    AlreadyClosed,

    #[error("Auction is cancelled")]
    Cancelled,
}

impl From<CloseRejection> for AppError {
    fn from(rejection: CloseRejection) -> Self {
        AppError::Conflict(rejection.to_string())
    }
}

/// Anti-snipe extension applied by a late bid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AntiSnipe {
    pub new_end_time: DateTime<Utc>,
    pub extension_seconds: i32,
}

/// Next auction state produced by an accepted bid. The caller persists the
/// new bid row and these fields inside the same transaction that holds the
/// auction row lock.
#[derive(Debug, Clone, PartialEq)]
pub struct BidPlacement {
    pub last_price: Decimal,
    pub bid_count: i64,
    pub end_time: DateTime<Utc>,
    pub anti_snipe: Option<AntiSnipe>,
}

/// Result of determining the winner at close time
#[derive(Debug, Clone, PartialEq)]
pub struct CloseOutcome {
    pub winner_id: Option<Uuid>,
    pub winning_bid_id: Option<Uuid>,
    /// Some(met) when a reserve price is set, None otherwise
    pub reserve_met: Option<bool>,
}

impl Auction {
    /// Get status as an enum
    pub fn status_enum(&self) -> AuctionStatus {
        AuctionStatus::from_str(&self.status).unwrap_or(AuctionStatus::Active)
    }

    /// Check if auction is active
    pub fn is_active(&self) -> bool {
        self.status_enum() == AuctionStatus::Active
    }

    /// The lowest price a new bid must meet or exceed
    pub fn minimum_next_bid(&self) -> Decimal {
        match self.last_price {
            Some(last) => last + self.minimum_bid_increment,
            None => self.start_price,
        }
    }

    /// Check if the auction end time has passed
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }

    /// Check if the auction accepts bids at the given instant
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && now >= self.start_time && now < self.end_time
    }

    /// Check if a bid landing now falls inside the anti-snipe window
    pub fn should_trigger_anti_snipe(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time - Duration::seconds(self.anti_snip_window_seconds as i64)
    }

    /// Evaluate a bid against the current auction state and return the next
    /// state. Must be called with the auction row locked; rejections leave
    /// the auction untouched.
    pub fn apply_bid(&self, price: Decimal, now: DateTime<Utc>) -> Result<BidPlacement, BidRejection> {
        if !self.is_active() {
            return Err(BidRejection::NotActive {
                status: self.status.clone(),
            });
        }
        if now < self.start_time {
            return Err(BidRejection::NotStarted);
        }
        if self.has_ended(now) {
            return Err(BidRejection::Ended);
        }

        let minimum = self.minimum_next_bid();
        if price < minimum {
            return Err(BidRejection::TooLow { minimum });
        }

        // A qualifying late bid pushes the end time out. There is no cap on
        // how often this can repeat; late bidding wars extend the auction.
        let anti_snipe = if self.should_trigger_anti_snipe(now) {
            Some(AntiSnipe {
                new_end_time: now + Duration::seconds(self.anti_snip_extension_seconds as i64),
                extension_seconds: self.anti_snip_extension_seconds,
            })
        } else {
            None
        };

        Ok(BidPlacement {
            last_price: price,
            bid_count: self.bid_count + 1,
            end_time: anti_snipe
                .as_ref()
                .map(|a| a.new_end_time)
                .unwrap_or(self.end_time),
            anti_snipe,
        })
    }

    /// Check the auction can leave the active state
    pub fn check_transitionable(&self) -> Result<(), CloseRejection> {
        match self.status_enum() {
            AuctionStatus::Active => Ok(()),
            AuctionStatus::Closed => Err(CloseRejection::AlreadyClosed),
            AuctionStatus::Cancelled => Err(CloseRejection::Cancelled),
        }
    }

    /// Determine the winner from the highest active bid at close time.
    ///
    /// With a reserve price set, the winner is declared only when the highest
    /// bid meets it; the auction closes either way. With no active bids there
    /// is no winner and no reserve verdict.
    pub fn close_outcome(&self, highest_bid: Option<&Bid>) -> CloseOutcome {
        match highest_bid {
            Some(bid) => match self.reserve_price {
                Some(reserve) => {
                    let met = bid.price >= reserve;
                    CloseOutcome {
                        winner_id: met.then_some(bid.bidder_id),
                        winning_bid_id: met.then_some(bid.id),
                        reserve_met: Some(met),
                    }
                }
                None => CloseOutcome {
                    winner_id: Some(bid.bidder_id),
                    winning_bid_id: Some(bid.id),
                    reserve_met: None,
                },
            },
            None => CloseOutcome {
                winner_id: None,
                winning_bid_id: None,
                reserve_met: None,
            },
        }
    }

    /// Validate pricing and timing terms for a new auction
    pub fn validate_terms(
        start_price: Decimal,
        reserve_price: Option<Decimal>,
        minimum_bid_increment: Decimal,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<(), String> {
        if start_price < Decimal::ZERO {
            return Err("Start price must not be negative".to_string());
        }
        if minimum_bid_increment <= Decimal::ZERO {
            return Err("Minimum bid increment must be greater than zero".to_string());
        }
        if end_time <= start_time {
            return Err("End time must be after start time".to_string());
        }
        if let Some(reserve) = reserve_price {
            if reserve <= start_price {
                return Err("Reserve price must exceed start price".to_string());
            }
        }
        Ok(())
    }
}
