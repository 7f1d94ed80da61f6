use crate::error::RepositoryError;
use crate::models::Bid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const BID_COLUMNS: &str =
    "id, auction_id, bidder_id, price, comment, status, withdrawn_at, created_at";

/// Repository for bid data access
pub struct BidRepository {
    pool: PgPool,
}

impl BidRepository {
    /// Create a new BidRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new bid. Runs inside the placement transaction, with the
    /// auction row already locked.
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        auction_id: Uuid,
        bidder_id: Uuid,
        price: Decimal,
        comment: Option<&str>,
    ) -> Result<Bid, RepositoryError> {
        let bid = sqlx::query_as::<_, Bid>(&format!(
            r#"
            INSERT INTO bids (id, auction_id, bidder_id, price, comment, status)
            VALUES ($1, $2, $3, $4, $5, 'active')
            RETURNING {BID_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(auction_id)
        .bind(bidder_id)
        .bind(price)
        .bind(comment)
        .fetch_one(conn)
        .await?;

        Ok(bid)
    }

    /// Find a bid by UUID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Bid>, RepositoryError> {
        let bid =
            sqlx::query_as::<_, Bid>(&format!("SELECT {BID_COLUMNS} FROM bids WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(bid)
    }

    /// Load a bid under an exclusive row lock for the withdrawal transaction
    pub async fn find_for_update(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Bid>, RepositoryError> {
        let bid = sqlx::query_as::<_, Bid>(&format!(
            "SELECT {BID_COLUMNS} FROM bids WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(bid)
    }

    /// All active bids on an auction, highest first (ties by earliest
    /// placement)
    pub async fn find_active_by_auction(
        &self,
        auction_id: Uuid,
    ) -> Result<Vec<Bid>, RepositoryError> {
        let bids = sqlx::query_as::<_, Bid>(&format!(
            r#"
            SELECT {BID_COLUMNS} FROM bids
            WHERE auction_id = $1 AND status = 'active'
            ORDER BY price DESC, created_at ASC
            "#
        ))
        .bind(auction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bids)
    }

    /// The current highest active bid, re-read inside the caller's
    /// transaction so close and withdrawal decide against committed state
    pub async fn find_highest_active(
        &self,
        conn: &mut PgConnection,
        auction_id: Uuid,
    ) -> Result<Option<Bid>, RepositoryError> {
        let bid = sqlx::query_as::<_, Bid>(&format!(
            r#"
            SELECT {BID_COLUMNS} FROM bids
            WHERE auction_id = $1 AND status = 'active'
            ORDER BY price DESC, created_at ASC
            LIMIT 1
            "#
        ))
        .bind(auction_id)
        .fetch_optional(conn)
        .await?;

        Ok(bid)
    }

    /// Mark a bid withdrawn. Price is never touched; the bid stays in the
    /// ledger.
    pub async fn mark_withdrawn(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        withdrawn_at: DateTime<Utc>,
    ) -> Result<Bid, RepositoryError> {
        let bid = sqlx::query_as::<_, Bid>(&format!(
            r#"
            UPDATE bids
            SET status = 'withdrawn', withdrawn_at = $2
            WHERE id = $1
            RETURNING {BID_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(withdrawn_at)
        .fetch_one(conn)
        .await?;

        Ok(bid)
    }

    /// Count every bid ever placed on an auction, withdrawn included
    pub async fn count_by_auction(&self, auction_id: Uuid) -> Result<i64, RepositoryError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM bids WHERE auction_id = $1")
                .bind(auction_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
