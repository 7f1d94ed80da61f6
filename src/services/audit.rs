use crate::error::{AppError, AppResult};
use crate::models::{AntiSnipe, Auction, Bid};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub timestamp: i64,
    pub event_type: String, // "bid_placed", "auction_closed", etc.
    pub auction_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub details: serde_json::Value,
}

/// Audit trail service recording every mutating auction operation.
///
/// Callers treat the sink as fire-and-forget: a logging failure is reported
/// to the caller as an error value but must never fail or roll back the
/// operation that produced the entry.
pub struct AuditTrailService {
    #[allow(dead_code)]
    log_file: PathBuf,
    file_handle: Arc<Mutex<std::fs::File>>,
}

impl AuditTrailService {
    /// Create a new audit trail service
    pub fn new(log_directory: PathBuf) -> AppResult<Self> {
        // Ensure directory exists
        std::fs::create_dir_all(&log_directory)
            .map_err(|e| AppError::Message(format!("Failed to create log directory: {}", e)))?;

        // Create log file with date
        let date = chrono::Utc::now().format("%Y-%m-%d");
        let log_file = log_directory.join(format!("audit_{}.log", date));

        // Open file in append mode
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(|e| AppError::Message(format!("Failed to open audit log file: {}", e)))?;

        info!("Audit trail initialized: {:?}", log_file);

        Ok(Self {
            log_file,
            file_handle: Arc::new(Mutex::new(file)),
        })
    }

    /// Log an audit entry
    pub async fn log(&self, entry: AuditLogEntry) -> AppResult<()> {
        let json = serde_json::to_string(&entry).map_err(AppError::Serialization)?;

        let mut file = self.file_handle.lock().await;
        writeln!(file, "{}", json)
            .map_err(|e| AppError::Message(format!("Failed to write audit log: {}", e)))?;

        file.flush()
            .map_err(|e| AppError::Message(format!("Failed to flush audit log: {}", e)))?;

        Ok(())
    }

    /// Log auction creation
    pub async fn log_auction_created(&self, auction: &Auction, creator: Uuid) -> AppResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "auction_created".to_string(),
            auction_id: Some(auction.id),
            user_id: Some(creator),
            details: serde_json::json!({
                "ad_id": auction.ad_id.to_string(),
                "owner_id": auction.owner_id.to_string(),
                "start_price": auction.start_price.to_string(),
                "end_time": auction.end_time.to_rfc3339(),
            }),
        };

        self.log(entry).await
    }

    /// Log bid placement
    pub async fn log_bid_placed(&self, bid: &Bid, anti_snipe: Option<&AntiSnipe>) -> AppResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "bid_placed".to_string(),
            auction_id: Some(bid.auction_id),
            user_id: Some(bid.bidder_id),
            details: serde_json::json!({
                "bid_id": bid.id.to_string(),
                "price": bid.price.to_string(),
                "anti_snipe_triggered": anti_snipe.is_some(),
                "new_end_time": anti_snipe.map(|a| a.new_end_time.to_rfc3339()),
            }),
        };

        self.log(entry).await
    }

    /// Log bid withdrawal
    pub async fn log_bid_withdrawn(&self, bid: &Bid) -> AppResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "bid_withdrawn".to_string(),
            auction_id: Some(bid.auction_id),
            user_id: Some(bid.bidder_id),
            details: serde_json::json!({
                "bid_id": bid.id.to_string(),
                "price": bid.price.to_string(),
                "withdrawn_at": bid.withdrawn_at.map(|t| t.to_rfc3339()),
            }),
        };

        self.log(entry).await
    }

    /// Log auction close
    pub async fn log_auction_closed(
        &self,
        auction_id: Uuid,
        winner_id: Option<Uuid>,
        winning_price: Option<Decimal>,
        reserve_met: Option<bool>,
        closed_by: Option<Uuid>,
    ) -> AppResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "auction_closed".to_string(),
            auction_id: Some(auction_id),
            user_id: closed_by,
            details: serde_json::json!({
                "winner_id": winner_id.map(|id| id.to_string()),
                "winning_price": winning_price.map(|p| p.to_string()),
                "reserve_met": reserve_met,
                "closed_by_sweep": closed_by.is_none(),
            }),
        };

        self.log(entry).await
    }

    /// Log auction cancellation
    pub async fn log_auction_cancelled(&self, auction_id: Uuid, cancelled_by: Uuid) -> AppResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "auction_cancelled".to_string(),
            auction_id: Some(auction_id),
            user_id: Some(cancelled_by),
            details: serde_json::json!({}),
        };

        self.log(entry).await
    }
}
