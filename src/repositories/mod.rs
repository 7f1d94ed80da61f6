//! Data access layer for auctions and bids.
//!
//! Methods taking a `&mut PgConnection` run inside a caller-owned
//! transaction; the services own the transaction boundary so that the row
//! lock, validation and every write commit or roll back together.

pub mod auction_repository;
pub mod bid_repository;

pub use auction_repository::AuctionRepository;
pub use bid_repository::BidRepository;
