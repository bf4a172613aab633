//! Commission business logic - Creation at checkout and lookups.
//!
//! Commissions are created when a sale carrying a referral code is paid for, and are
//! only ever mutated afterwards by the settlement pass. They are never deleted.

use crate::{
    config::CommissionPolicy,
    core::referral::resolve_referral_code,
    entities::{Commission, CommissionStatus, commission},
    errors::{Error, Result},
};
use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::{Condition, QueryOrder, QuerySelect, Set, prelude::*, sea_query::Expr};
use tracing::{debug, info};

/// Sale details handed over by the checkout flow.
#[derive(Debug, Clone)]
pub struct NewCommission {
    /// Referral code the buyer entered
    pub referral_code: String,
    /// Price paid for the product
    pub sale_amount: f64,
    /// Buyer user id
    pub buyer_id: String,
    /// Payment gateway reference
    pub payment_id: String,
    /// Product name
    pub product_name: String,
    /// Estimated delivery time in days; the policy default applies when absent
    pub delivery_days: Option<i64>,
}

/// Computes the instant a commission becomes payable: estimated delivery plus
/// the grace period, counted from the payment instant.
#[must_use]
pub fn compute_release_date(
    paid_at: DateTime<Utc>,
    delivery_days: i64,
    policy: &CommissionPolicy,
) -> DateTime<Utc> {
    paid_at + TimeDelta::days(delivery_days + policy.grace_period_days)
}

/// Records a new pending commission for a paid sale.
///
/// The amount is `sale_amount * policy.rate`. The referral code is written to the
/// canonical `referral_code` column only.
pub async fn create_commission<C>(
    db: &C,
    new: NewCommission,
    policy: &CommissionPolicy,
    now: DateTime<Utc>,
) -> Result<commission::Model>
where
    C: ConnectionTrait,
{
    let referral_code = new.referral_code.trim().to_string();
    if referral_code.is_empty() {
        return Err(Error::Config {
            message: "Referral code cannot be empty".to_string(),
        });
    }
    if !new.sale_amount.is_finite() || new.sale_amount <= 0.0 {
        return Err(Error::InvalidAmount {
            amount: new.sale_amount,
        });
    }

    let delivery_days = new
        .delivery_days
        .filter(|days| *days >= 0)
        .unwrap_or(policy.default_delivery_days);
    let release_date = compute_release_date(now, delivery_days, policy);

    let model = commission::ActiveModel {
        referral_code: Set(Some(referral_code)),
        codee: Set(None),
        code: Set(None),
        commission_amount: Set(new.sale_amount * policy.rate),
        sale_amount: Set(new.sale_amount),
        buyer_id: Set(new.buyer_id),
        payment_id: Set(new.payment_id),
        product_name: Set(new.product_name),
        wallet_release_date: Set(Some(release_date)),
        wallet_release_legacy: Set(None),
        status: Set(CommissionStatus::Pending),
        is_added_to_wallet: Set(false),
        released_at: Set(None),
        created_at: Set(now),
        ..Default::default()
    };

    let created = model.insert(db).await?;
    info!(
        commission_id = created.id,
        amount = created.commission_amount,
        release_date = %release_date,
        "Recorded commission"
    );
    Ok(created)
}

/// Finds a commission by its unique ID.
pub async fn get_commission_by_id<C>(db: &C, commission_id: i64) -> Result<Option<commission::Model>>
where
    C: ConnectionTrait,
{
    Commission::find_by_id(commission_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Fetches one page of pending commissions with `id > after_id`, in id order.
pub async fn get_pending_commissions_page<C>(
    db: &C,
    after_id: i64,
    page_size: u64,
) -> Result<Vec<commission::Model>>
where
    C: ConnectionTrait,
{
    Commission::find()
        .filter(commission::Column::Status.eq(CommissionStatus::Pending))
        .filter(commission::Column::Id.gt(after_id))
        .order_by_asc(commission::Column::Id)
        .limit(page_size)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Keyset cursor over the pending commissions, fetched lazily in pages.
///
/// The cursor only remembers the last id it handed out, so it can be restarted
/// from any point and never holds more than one page in memory.
#[derive(Debug, Clone)]
pub struct PendingCommissions {
    after_id: i64,
    page_size: u64,
    exhausted: bool,
}

impl PendingCommissions {
    /// Starts a cursor at the beginning of the pending set.
    #[must_use]
    pub const fn new(page_size: u64) -> Self {
        Self::starting_after(0, page_size)
    }

    /// Starts a cursor just after `after_id`.
    #[must_use]
    pub const fn starting_after(after_id: i64, page_size: u64) -> Self {
        Self {
            after_id,
            page_size,
            exhausted: false,
        }
    }

    /// Id of the last commission returned so far.
    #[must_use]
    pub const fn position(&self) -> i64 {
        self.after_id
    }

    /// Fetches the next page; an empty vector means the cursor is exhausted.
    pub async fn next_page<C>(&mut self, db: &C) -> Result<Vec<commission::Model>>
    where
        C: ConnectionTrait,
    {
        if self.exhausted {
            return Ok(Vec::new());
        }

        let page = get_pending_commissions_page(db, self.after_id, self.page_size).await?;
        match page.last() {
            Some(last) => self.after_id = last.id,
            None => self.exhausted = true,
        }
        if (page.len() as u64) < self.page_size {
            self.exhausted = true;
        }
        debug!(
            fetched = page.len(),
            after_id = self.after_id,
            "Fetched pending commissions page"
        );
        Ok(page)
    }
}

/// Retrieves every commission owed to a referral code, newest first.
///
/// Matches the canonical column and both legacy aliases, as the wallet page lists them.
pub async fn get_commissions_for_referral_code<C>(
    db: &C,
    referral_code: &str,
) -> Result<Vec<commission::Model>>
where
    C: ConnectionTrait,
{
    Commission::find()
        .filter(
            Condition::any()
                .add(commission::Column::ReferralCode.eq(referral_code))
                .add(commission::Column::Codee.eq(referral_code))
                .add(commission::Column::Code.eq(referral_code)),
        )
        .order_by_desc(commission::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Copies legacy `codee`/`code` values into `referral_code` where it is missing.
///
/// The aliases themselves are left untouched. Only the canonical column is written,
/// and only while it is still empty, so running this concurrently with itself or
/// with a settlement pass is harmless. Returns the number of records normalised.
pub async fn backfill_referral_codes<C>(db: &C) -> Result<u64>
where
    C: ConnectionTrait,
{
    let candidates = Commission::find()
        .filter(
            Condition::any()
                .add(commission::Column::ReferralCode.is_null())
                .add(commission::Column::ReferralCode.eq("")),
        )
        .all(db)
        .await?;

    let mut normalised = 0;
    for candidate in candidates {
        let Some(code) = resolve_referral_code(&candidate).map(str::to_string) else {
            continue;
        };

        let result = Commission::update_many()
            .col_expr(commission::Column::ReferralCode, Expr::value(code))
            .filter(commission::Column::Id.eq(candidate.id))
            .filter(
                Condition::any()
                    .add(commission::Column::ReferralCode.is_null())
                    .add(commission::Column::ReferralCode.eq("")),
            )
            .exec(db)
            .await?;
        normalised += result.rows_affected;
    }

    if normalised > 0 {
        info!("Normalised referral code on {normalised} legacy commissions");
    }
    Ok(normalised)
}
