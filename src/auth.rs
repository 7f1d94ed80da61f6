//! Authorization policy for the auction surface.
//!
//! Authentication itself is an external collaborator: the gateway in front
//! of this service resolves the session and forwards the caller's identity
//! as trusted headers. This module is the single place that decides which
//! (actor, action, resource) combinations are allowed, instead of scattering
//! role checks through the handlers.

use crate::error::{AppError, AppResult};
use crate::models::{Auction, Bid};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller role as resolved by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    /// Convert from header/database string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

/// Authenticated caller identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }

    /// Check if the actor has elevated (admin or moderator) privileges
    pub fn is_staff(&self) -> bool {
        self.is_admin() || self.is_moderator()
    }
}

/// Actions an actor can attempt against an auction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateAuction,
    PlaceBid,
    ViewBids,
    ViewBid,
    WithdrawBid,
    CloseAuction,
    CancelAuction,
}

/// Decide whether `actor` may perform `action` against `auction`.
///
/// `bid` must be supplied for bid-scoped actions (ViewBid, WithdrawBid).
/// Checks run before any state mutation; a denial never touches the store.
pub fn authorize(
    actor: &Actor,
    action: Action,
    auction: &Auction,
    bid: Option<&Bid>,
) -> AppResult<()> {
    let allowed = match action {
        Action::CreateAuction => actor.is_admin(),
        Action::PlaceBid => true,
        Action::ViewBids => actor.user_id == auction.owner_id || actor.is_staff(),
        Action::ViewBid => {
            let is_bid_owner = bid.map(|b| b.bidder_id == actor.user_id).unwrap_or(false);
            is_bid_owner || actor.user_id == auction.owner_id || actor.is_staff()
        }
        // Only the placer may withdraw; admins do not withdraw on behalf of users
        Action::WithdrawBid => bid.map(|b| b.bidder_id == actor.user_id).unwrap_or(false),
        Action::CloseAuction => actor.user_id == auction.owner_id || actor.is_admin(),
        Action::CancelAuction => {
            if actor.is_admin() {
                true
            } else if actor.user_id == auction.owner_id {
                // Owners lose the right to cancel once bidding has started
                if auction.bid_count > 0 {
                    return Err(AppError::Forbidden(
                        "Auction with bids can only be cancelled by an administrator".to_string(),
                    ));
                }
                true
            } else {
                false
            }
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Not allowed to perform {:?} on this auction",
            action
        )))
    }
}

/// Whether the actor may see the owner-only pricing fields (last price when
/// hidden, reserve price)
pub fn can_view_private_fields(actor: &Actor, auction: &Auction) -> bool {
    actor.user_id == auction.owner_id || actor.is_staff()
}
