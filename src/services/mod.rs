pub mod audit;
pub mod bidding_service;
pub mod closing_service;
pub mod sweeper;
pub mod withdrawal_service;

pub use audit::AuditTrailService;
pub use bidding_service::{BiddingService, PlaceBidResult};
pub use closing_service::{CloseResult, ClosingService};
pub use sweeper::AutoCloseSweeper;
pub use withdrawal_service::WithdrawalService;
