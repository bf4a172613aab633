//! Core business logic - framework-agnostic commission, wallet, and settlement operations.

/// Commission creation at checkout, lookups, and the pending-commission cursor
pub mod commission;
/// Release date resolution and the maturity predicate
pub mod maturity;
/// Referral code generation and resolution across legacy aliases
pub mod referral;
/// Human-readable settlement summaries
pub mod report;
/// The settlement pass and the exactly-once release
pub mod settlement;
/// Key-value bookkeeping
pub mod system_state;
/// Sellers, wallet credits, and withdrawal requests
pub mod wallet;
