//! Settlement pass - Releases matured commissions into seller wallets.
//!
//! A pass pages through the pending commissions, resolves when each becomes payable
//! and which seller it is owed to, and releases the matured ones. Every pass is
//! independent and may overlap with another pass:
//!
//! - the wallet credit and the `pending -> released` flip run in one database
//!   transaction;
//! - the flip is conditional on the commission still being `pending`, and the
//!   transaction is rolled back when it matches nothing, so a commission released
//!   by a concurrent pass is never credited twice;
//! - a crash before commit leaves both the wallet and the commission untouched,
//!   and the next pass retries.
//!
//! A problem with one record is logged and counted; it never aborts the pass.

use crate::{
    config::SettlementOptions,
    core::{
        commission::PendingCommissions,
        maturity::{is_matured, resolve_maturity},
        referral::resolve_referral_code,
        system_state::set_last_settlement_pass,
        wallet::{credit_wallet_atomic, find_seller_by_referral_code},
    },
    entities::{Commission, CommissionStatus, commission},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, error, info, warn};

/// Result of attempting the release write for one commission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Wallet credited and commission marked released
    Released,
    /// Another pass released the commission first; nothing was written
    AlreadyReleased,
}

/// What a pass decided for one pending commission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommissionOutcome {
    /// Release date still in the future
    NotMatured,
    /// Credited to the seller's wallet
    Released {
        /// Seller whose wallet was credited
        seller_id: i64,
        /// Amount credited
        amount: f64,
    },
    /// Released by a concurrent pass in the meantime
    AlreadyReleased,
}

/// Counts of what one settlement pass did.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementSummary {
    /// Instant the pass evaluated maturity against
    pub run_at: DateTime<Utc>,
    /// Pending commissions looked at
    pub examined: usize,
    /// Commissions released by this pass
    pub released: usize,
    /// Sum of the amounts released by this pass
    pub total_released_amount: f64,
    /// Commissions not yet payable
    pub not_matured: usize,
    /// Commissions another pass released first
    pub already_released: usize,
    /// Commissions skipped for a bad release date, referral code, or amount
    pub skipped_malformed: usize,
    /// Commissions skipped because no seller has their referral code
    pub skipped_no_seller: usize,
    /// Commissions whose processing hit a storage error
    pub failed: usize,
    /// A later page could not be fetched and the pass ended early
    pub interrupted: bool,
    /// The pass stopped at `max_releases_per_pass`
    pub release_cap_reached: bool,
}

impl SettlementSummary {
    /// Creates an empty summary for a pass evaluated at `run_at`.
    #[must_use]
    pub const fn new(run_at: DateTime<Utc>) -> Self {
        Self {
            run_at,
            examined: 0,
            released: 0,
            total_released_amount: 0.0,
            not_matured: 0,
            already_released: 0,
            skipped_malformed: 0,
            skipped_no_seller: 0,
            failed: 0,
            interrupted: false,
            release_cap_reached: false,
        }
    }

    fn record(&mut self, outcome: CommissionOutcome) {
        match outcome {
            CommissionOutcome::NotMatured => self.not_matured += 1,
            CommissionOutcome::Released { amount, .. } => {
                self.released += 1;
                self.total_released_amount += amount;
            }
            CommissionOutcome::AlreadyReleased => self.already_released += 1,
        }
    }

    fn record_error(&mut self, commission_id: i64, error: &Error) {
        match error {
            Error::MalformedCommission { .. } => {
                warn!(commission_id, "Skipping commission: {error}");
                self.skipped_malformed += 1;
            }
            Error::SellerNotFound { .. } => {
                warn!(commission_id, "Skipping commission: {error}");
                self.skipped_no_seller += 1;
            }
            _ => {
                error!(commission_id, "Failed to process commission: {error}");
                self.failed += 1;
            }
        }
    }
}

/// Credits a seller's wallet and marks the commission released, exactly once.
///
/// Both writes run in one transaction. The wallet increment is issued first and the
/// status flip last; the flip only matches while the commission is still `pending`.
/// If it matches nothing the transaction is rolled back, undoing the increment.
pub async fn release_commission(
    db: &DatabaseConnection,
    commission_id: i64,
    seller_id: i64,
    amount: f64,
    now: DateTime<Utc>,
) -> Result<ReleaseOutcome> {
    let txn = db.begin().await?;

    credit_wallet_atomic(&txn, seller_id, amount).await?;

    let flipped = Commission::update_many()
        .col_expr(
            commission::Column::Status,
            Expr::value(CommissionStatus::Released.into_value()),
        )
        .col_expr(commission::Column::IsAddedToWallet, Expr::value(true))
        .col_expr(commission::Column::ReleasedAt, Expr::value(now))
        .filter(commission::Column::Id.eq(commission_id))
        .filter(commission::Column::Status.eq(CommissionStatus::Pending))
        .exec(&txn)
        .await?;

    if flipped.rows_affected == 0 {
        txn.rollback().await?;
        debug!(commission_id, "Commission already released by another pass");
        return Ok(ReleaseOutcome::AlreadyReleased);
    }

    txn.commit().await?;
    Ok(ReleaseOutcome::Released)
}

/// Decides and applies the settlement of one pending commission.
///
/// # Errors
/// - [`Error::MalformedCommission`] for an unresolvable release date, a missing
///   referral code, or a non-positive amount
/// - [`Error::SellerNotFound`] when no seller owns the referral code
/// - [`Error::Database`] when storage fails
pub async fn process_commission(
    db: &DatabaseConnection,
    commission: &commission::Model,
    now: DateTime<Utc>,
) -> Result<CommissionOutcome> {
    let Some(maturity) = resolve_maturity(commission) else {
        return Err(Error::MalformedCommission {
            id: commission.id,
            reason: format!(
                "unparseable wallet release date {:?}",
                commission.wallet_release_legacy
            ),
        });
    };

    if !is_matured(maturity, now) {
        debug!(commission_id = commission.id, %maturity, "Commission not matured yet");
        return Ok(CommissionOutcome::NotMatured);
    }

    let Some(referral_code) = resolve_referral_code(commission) else {
        return Err(Error::MalformedCommission {
            id: commission.id,
            reason: "missing referral code".to_string(),
        });
    };

    let amount = commission.commission_amount;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::MalformedCommission {
            id: commission.id,
            reason: format!("commission amount {amount} is not positive"),
        });
    }

    let seller = find_seller_by_referral_code(db, referral_code)
        .await?
        .ok_or_else(|| Error::SellerNotFound {
            referral_code: referral_code.to_string(),
        })?;

    match release_commission(db, commission.id, seller.id, amount, now).await? {
        ReleaseOutcome::Released => {
            info!(
                commission_id = commission.id,
                seller_id = seller.id,
                referral_code,
                amount,
                "Released commission to wallet"
            );
            Ok(CommissionOutcome::Released {
                seller_id: seller.id,
                amount,
            })
        }
        ReleaseOutcome::AlreadyReleased => Ok(CommissionOutcome::AlreadyReleased),
    }
}

/// Runs one settlement pass against the pending commissions as of `now`.
///
/// Only a failure to fetch the first page of pending commissions is returned as an
/// error; the next scheduled pass is the retry. Everything else is logged and
/// counted in the returned summary. The completion time is recorded only when the
/// scan reached the end or the release limit.
pub async fn run_settlement_pass(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
    options: &SettlementOptions,
) -> Result<SettlementSummary> {
    info!(%now, "Starting settlement pass");

    let mut summary = SettlementSummary::new(now);
    let mut cursor = PendingCommissions::new(options.page_size);
    let mut first_page = true;

    'pages: loop {
        let page = match cursor.next_page(db).await {
            Ok(page) => page,
            Err(e) if first_page => {
                error!("Failed to query pending commissions: {e}");
                return Err(e);
            }
            Err(e) => {
                error!(
                    after_id = cursor.position(),
                    "Failed to fetch next page of pending commissions, ending pass early: {e}"
                );
                summary.interrupted = true;
                break;
            }
        };
        first_page = false;

        if page.is_empty() {
            break;
        }

        for commission in page {
            if summary.released >= options.max_releases_per_pass {
                info!(
                    released = summary.released,
                    "Release limit reached, remaining commissions wait for the next pass"
                );
                summary.release_cap_reached = true;
                break 'pages;
            }

            summary.examined += 1;
            match process_commission(db, &commission, now).await {
                Ok(outcome) => summary.record(outcome),
                Err(e) => summary.record_error(commission.id, &e),
            }
        }
    }

    if summary.examined == 0 && !summary.interrupted {
        info!("No pending commissions found");
    }

    if summary.interrupted {
        warn!("Settlement pass interrupted, last completed pass left unchanged");
    } else if let Err(e) = set_last_settlement_pass(db, now).await {
        warn!("Failed to record settlement pass completion: {e}");
    }

    info!(
        examined = summary.examined,
        released = summary.released,
        amount = summary.total_released_amount,
        skipped_malformed = summary.skipped_malformed,
        skipped_no_seller = summary.skipped_no_seller,
        failed = summary.failed,
        "Settlement pass completed"
    );
    Ok(summary)
}
