use crate::error::RepositoryError;
use crate::models::{Auction, AuctionStatus, BidPlacement};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const AUCTION_COLUMNS: &str = "id, ad_id, owner_id, start_price, reserve_price, last_price, \
     minimum_bid_increment, start_time, end_time, anti_snip_window_seconds, \
     anti_snip_extension_seconds, auto_close, is_last_price_visible, status, \
     bid_count, winner_id, created_at, updated_at";

/// Repository for auction data access
pub struct AuctionRepository {
    pool: PgPool,
}

impl AuctionRepository {
    /// Create a new AuctionRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new auction for an auction-type ad
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        ad_id: Uuid,
        owner_id: Uuid,
        start_price: Decimal,
        reserve_price: Option<Decimal>,
        minimum_bid_increment: Decimal,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        anti_snip_window_seconds: i32,
        anti_snip_extension_seconds: i32,
        auto_close: bool,
        is_last_price_visible: bool,
    ) -> Result<Auction, RepositoryError> {
        let auction = sqlx::query_as::<_, Auction>(&format!(
            r#"
            INSERT INTO auctions
                (id, ad_id, owner_id, start_price, reserve_price, minimum_bid_increment,
                 start_time, end_time, anti_snip_window_seconds, anti_snip_extension_seconds,
                 auto_close, is_last_price_visible, status, bid_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'active', 0)
            RETURNING {AUCTION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(ad_id)
        .bind(owner_id)
        .bind(start_price)
        .bind(reserve_price)
        .bind(minimum_bid_increment)
        .bind(start_time)
        .bind(end_time)
        .bind(anti_snip_window_seconds)
        .bind(anti_snip_extension_seconds)
        .bind(auto_close)
        .bind(is_last_price_visible)
        .fetch_one(&self.pool)
        .await?;

        Ok(auction)
    }

    /// Find an auction by UUID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Auction>, RepositoryError> {
        let auction = sqlx::query_as::<_, Auction>(&format!(
            "SELECT {AUCTION_COLUMNS} FROM auctions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(auction)
    }

    /// Find the auction attached to an ad
    pub async fn find_by_ad(&self, ad_id: Uuid) -> Result<Option<Auction>, RepositoryError> {
        let auction = sqlx::query_as::<_, Auction>(&format!(
            "SELECT {AUCTION_COLUMNS} FROM auctions WHERE ad_id = $1"
        ))
        .bind(ad_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(auction)
    }

    /// Load an auction under an exclusive row lock. Serializes concurrent
    /// writers on the same auction; bids on different auctions proceed in
    /// parallel. Must run inside the caller's transaction.
    pub async fn find_for_update(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Auction>, RepositoryError> {
        let auction = sqlx::query_as::<_, Auction>(&format!(
            "SELECT {AUCTION_COLUMNS} FROM auctions WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(auction)
    }

    /// Persist the auction-side effects of an accepted bid: new last price,
    /// incremented bid count and (when anti-snipe fired) the extended end
    /// time. Runs in the same transaction as the bid insert.
    pub async fn apply_placement(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        placement: &BidPlacement,
    ) -> Result<Auction, RepositoryError> {
        let auction = sqlx::query_as::<_, Auction>(&format!(
            r#"
            UPDATE auctions
            SET last_price = $2, bid_count = $3, end_time = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {AUCTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(placement.last_price)
        .bind(placement.bid_count)
        .bind(placement.end_time)
        .fetch_one(conn)
        .await?;

        Ok(auction)
    }

    /// Transition an auction to a terminal status, recording the winner on
    /// close when one was determined
    pub async fn mark_terminal(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        status: AuctionStatus,
        winner_id: Option<Uuid>,
    ) -> Result<Auction, RepositoryError> {
        let auction = sqlx::query_as::<_, Auction>(&format!(
            r#"
            UPDATE auctions
            SET status = $2, winner_id = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {AUCTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(winner_id)
        .fetch_one(conn)
        .await?;

        Ok(auction)
    }

    /// Ids of active auto-close auctions whose end time has passed. Read
    /// without locks; each auction is then closed in its own transaction.
    pub async fn find_due_for_close(&self, limit: i64) -> Result<Vec<Uuid>, RepositoryError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id FROM auctions
            WHERE status = 'active' AND auto_close = TRUE AND end_time <= NOW()
            ORDER BY end_time ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
