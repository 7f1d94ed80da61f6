//! HTTP API for the auction backend.
//!
//! Thin axum handlers over the services: extract the caller identity,
//! deserialize the request, delegate, and shape the
//! `{status, code?, message, data?}` response envelope. Authentication is
//! terminated at the gateway, which forwards the caller as `x-user-id` and
//! `x-user-role` headers.

use crate::auth::{self, Actor, Role};
use crate::error::{AppError, AppResult};
use crate::models::{AntiSnipe, Auction, Bid};
use crate::AppState;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;
use uuid::Uuid;

// =============================================================================
// Response envelope
// =============================================================================

/// Build a success envelope
fn success<T: Serialize>(message: &str, data: T) -> AppResult<Json<serde_json::Value>> {
    Ok(Json(serde_json::json!({
        "status": "success",
        "message": message,
        "data": serde_json::to_value(data)?,
    })))
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!("Internal error: {:?}", self);
        }

        let body = Json(serde_json::json!({
            "status": "error",
            "code": self.code(),
            "message": self.client_message(),
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// Actor extraction
// =============================================================================

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing x-user-id header".to_string()))?;

        let user_id = Uuid::parse_str(user_id)
            .map_err(|_| AppError::Unauthorized("Invalid x-user-id header".to_string()))?;

        let role = match parts.headers.get("x-user-role").and_then(|v| v.to_str().ok()) {
            Some(s) => Role::from_str(s).map_err(AppError::Unauthorized)?,
            None => Role::User,
        };

        Ok(Actor::new(user_id, role))
    }
}

// =============================================================================
// Request / response shapes
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateAuctionRequest {
    pub ad_id: Uuid,
    pub owner_id: Uuid,
    pub start_price: Decimal,
    pub reserve_price: Option<Decimal>,
    pub minimum_bid_increment: Option<Decimal>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub anti_snip_window_seconds: Option<i32>,
    pub anti_snip_extension_seconds: Option<i32>,
    pub auto_close: Option<bool>,
    pub is_last_price_visible: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceBidRequest {
    pub price: Decimal,
    pub comment: Option<String>,
}

/// Auction as exposed to a caller. Owner-only pricing fields are masked for
/// everyone else: `last_price` per the auction's visibility flag, the
/// reserve always.
#[derive(Debug, Serialize)]
pub struct AuctionView {
    pub id: Uuid,
    pub ad_id: Uuid,
    pub owner_id: Uuid,
    pub start_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserve_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_price: Option<Decimal>,
    pub minimum_bid_increment: Decimal,
    pub minimum_next_bid: Decimal,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub auto_close: bool,
    pub is_last_price_visible: bool,
    pub status: String,
    pub bid_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<Uuid>,
}

impl AuctionView {
    fn from_auction(auction: &Auction, show_private: bool) -> Self {
        let last_price_visible = show_private || auction.is_last_price_visible;
        Self {
            id: auction.id,
            ad_id: auction.ad_id,
            owner_id: auction.owner_id,
            start_price: auction.start_price,
            reserve_price: auction.reserve_price.filter(|_| show_private),
            last_price: auction.last_price.filter(|_| last_price_visible),
            minimum_bid_increment: auction.minimum_bid_increment,
            minimum_next_bid: auction.minimum_next_bid(),
            start_time: auction.start_time,
            end_time: auction.end_time,
            auto_close: auction.auto_close,
            is_last_price_visible: auction.is_last_price_visible,
            status: auction.status.clone(),
            bid_count: auction.bid_count,
            winner_id: auction.winner_id,
        }
    }
}

#[derive(Debug, Serialize)]
struct AntiSnipeView {
    triggered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extension_seconds: Option<i32>,
}

impl AntiSnipeView {
    fn from_outcome(anti_snipe: Option<&AntiSnipe>) -> Self {
        Self {
            triggered: anti_snipe.is_some(),
            new_end_time: anti_snipe.map(|a| a.new_end_time),
            extension_seconds: anti_snipe.map(|a| a.extension_seconds),
        }
    }
}

#[derive(Debug, Serialize)]
struct CloseView {
    winner_id: Option<Uuid>,
    winning_bid: Option<Bid>,
    reserve_met: Option<bool>,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /auctions
async fn handle_create_auction(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(req): Json<CreateAuctionRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let auction = state
        .bidding_service
        .create_auction(
            &actor,
            req.ad_id,
            req.owner_id,
            req.start_price,
            req.reserve_price,
            req.minimum_bid_increment.unwrap_or(Decimal::new(100, 0)),
            req.start_time,
            req.end_time,
            req.anti_snip_window_seconds.unwrap_or(300),
            req.anti_snip_extension_seconds.unwrap_or(300),
            req.auto_close.unwrap_or(true),
            req.is_last_price_visible.unwrap_or(true),
        )
        .await?;

    success("Auction created", AuctionView::from_auction(&auction, true))
}

/// GET /auctions/:id
async fn handle_get_auction(
    State(state): State<Arc<AppState>>,
    Path(auction_id): Path<Uuid>,
    actor: Actor,
) -> AppResult<Json<serde_json::Value>> {
    let auction = state.bidding_service.get_auction(auction_id).await?;
    let show_private = auth::can_view_private_fields(&actor, &auction);

    success("Auction", AuctionView::from_auction(&auction, show_private))
}

/// POST /auctions/:id/bids
async fn handle_place_bid(
    State(state): State<Arc<AppState>>,
    Path(auction_id): Path<Uuid>,
    actor: Actor,
    Json(req): Json<PlaceBidRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let result = state
        .bidding_service
        .place_bid(auction_id, &actor, req.price, req.comment.as_deref())
        .await?;

    success(
        "Bid placed",
        serde_json::json!({
            "bid": result.bid,
            "anti_snipe": AntiSnipeView::from_outcome(result.anti_snipe.as_ref()),
        }),
    )
}

/// GET /auctions/:id/bids
async fn handle_list_bids(
    State(state): State<Arc<AppState>>,
    Path(auction_id): Path<Uuid>,
    actor: Actor,
) -> AppResult<Json<serde_json::Value>> {
    let bids = state.bidding_service.list_bids(auction_id, &actor).await?;

    success("Active bids", bids)
}

/// GET /auctions/:id/bids/:bid_id
async fn handle_get_bid(
    State(state): State<Arc<AppState>>,
    Path((auction_id, bid_id)): Path<(Uuid, Uuid)>,
    actor: Actor,
) -> AppResult<Json<serde_json::Value>> {
    let bid = state
        .bidding_service
        .get_bid(auction_id, bid_id, &actor)
        .await?;

    success("Bid", bid)
}

/// DELETE /auctions/:id/bids/:bid_id
async fn handle_withdraw_bid(
    State(state): State<Arc<AppState>>,
    Path((auction_id, bid_id)): Path<(Uuid, Uuid)>,
    actor: Actor,
) -> AppResult<Json<serde_json::Value>> {
    let bid = state
        .withdrawal_service
        .withdraw(auction_id, bid_id, &actor)
        .await?;

    success("Bid withdrawn", bid)
}

/// PATCH /auctions/:id/close
async fn handle_close_auction(
    State(state): State<Arc<AppState>>,
    Path(auction_id): Path<Uuid>,
    actor: Actor,
) -> AppResult<Json<serde_json::Value>> {
    let result = state.closing_service.close(auction_id, &actor).await?;

    let message = result.message.clone();
    success(
        &message,
        CloseView {
            winner_id: result.auction.winner_id,
            winning_bid: result.winning_bid,
            reserve_met: result.reserve_met,
        },
    )
}

/// DELETE /auctions/:id
async fn handle_cancel_auction(
    State(state): State<Arc<AppState>>,
    Path(auction_id): Path<Uuid>,
    actor: Actor,
) -> AppResult<Json<serde_json::Value>> {
    let auction = state.closing_service.cancel(auction_id, &actor).await?;

    success(
        "Auction cancelled",
        AuctionView::from_auction(&auction, true),
    )
}

// =============================================================================
// Router
// =============================================================================

/// Build the full HTTP router
pub fn routes(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/auctions", post(handle_create_auction))
        .route(
            "/auctions/:id",
            get(handle_get_auction).delete(handle_cancel_auction),
        )
        .route("/auctions/:id/close", patch(handle_close_auction))
        .route(
            "/auctions/:id/bids",
            post(handle_place_bid).get(handle_list_bids),
        )
        .route(
            "/auctions/:id/bids/:bid_id",
            get(handle_get_bid).delete(handle_withdraw_bid),
        )
        .layer(cors)
        .with_state(state)
}
