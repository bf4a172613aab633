//! Unified error types for the settlement service.
//!
//! Storage failures are wrapped as [`Error::Database`] and treated as transient:
//! the record involved is left untouched and picked up again by the next pass.

use thiserror::Error;

/// Errors produced by commission, wallet, and settlement operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Query or write against the database failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure (config file, signal handler)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Commission record cannot be settled as stored
    #[error("Commission {id} is malformed: {reason}")]
    MalformedCommission {
        /// Commission id
        id: i64,
        /// Which field is unusable and why
        reason: String,
    },

    /// No seller carries the referral code of a commission
    #[error("No seller found for referral code '{referral_code}'")]
    SellerNotFound {
        /// Referral code that was looked up
        referral_code: String,
    },

    /// Seller id does not exist
    #[error("Seller {id} not found")]
    SellerIdNotFound {
        /// Seller id
        id: i64,
    },

    /// Withdrawal request id does not exist or is no longer pending
    #[error("Withdrawal request {id} not found")]
    WithdrawalNotFound {
        /// Withdrawal request id
        id: i64,
    },

    /// Amount is zero, negative, or not finite where a positive amount is required
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// Offending amount
        amount: f64,
    },

    /// Wallet has nothing to withdraw
    #[error("Insufficient wallet balance: {current:.2}")]
    InsufficientFunds {
        /// Balance at the time of the request
        current: f64,
    },

    /// A conditional write lost a race with another writer
    #[error("Concurrent update detected on {what}")]
    ConcurrentUpdate {
        /// The record that changed underneath the writer
        what: String,
    },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
