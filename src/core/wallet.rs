//! Seller wallet business logic - Sellers, wallet credits, and withdrawals.
//!
//! The wallet balance has two writers: the settlement pass (credits) and withdrawal
//! requests (debits). Both only ever apply deltas at the database level
//! (`wallet_amount = wallet_amount + delta`), so neither can overwrite a change
//! made by the other between its read and its write.

use crate::{
    core::referral::generate_referral_code,
    entities::{Seller, WithdrawalRequest, WithdrawalStatus, seller, withdrawal_request},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, warn};

const MAX_CODE_ATTEMPTS: usize = 32;

/// Creates a seller with a freshly generated unique referral code and an empty wallet.
pub async fn create_seller(
    db: &DatabaseConnection,
    display_name: String,
    email: Option<String>,
    uid: Option<String>,
) -> Result<seller::Model> {
    if display_name.trim().is_empty() {
        return Err(Error::Config {
            message: "Seller name cannot be empty".to_string(),
        });
    }

    for _ in 0..MAX_CODE_ATTEMPTS {
        let candidate = generate_referral_code();
        if find_seller_by_referral_code(db, &candidate).await?.is_none() {
            return create_seller_with_code(db, display_name.trim().to_string(), email, uid, candidate)
                .await;
        }
    }

    Err(Error::Config {
        message: format!("Could not generate a unique referral code in {MAX_CODE_ATTEMPTS} attempts"),
    })
}

/// Creates a seller with a caller-chosen referral code and an empty wallet.
pub async fn create_seller_with_code<C>(
    db: &C,
    display_name: String,
    email: Option<String>,
    uid: Option<String>,
    referral_code: String,
) -> Result<seller::Model>
where
    C: ConnectionTrait,
{
    let seller = seller::ActiveModel {
        uid: Set(uid),
        display_name: Set(display_name),
        email: Set(email),
        referral_code: Set(referral_code),
        wallet_amount: Set(0.0),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let created = seller.insert(db).await?;
    info!(
        seller_id = created.id,
        referral_code = %created.referral_code,
        "Created seller"
    );
    Ok(created)
}

/// Finds the seller owning a referral code.
pub async fn find_seller_by_referral_code<C>(
    db: &C,
    referral_code: &str,
) -> Result<Option<seller::Model>>
where
    C: ConnectionTrait,
{
    Seller::find()
        .filter(seller::Column::ReferralCode.eq(referral_code))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a seller by its unique ID.
pub async fn get_seller_by_id<C>(db: &C, seller_id: i64) -> Result<Option<seller::Model>>
where
    C: ConnectionTrait,
{
    Seller::find_by_id(seller_id).one(db).await.map_err(Into::into)
}

/// Atomically adds `amount_delta` to a seller's wallet.
///
/// Performs a single SQL update, `wallet_amount = wallet_amount + delta`, rather than
/// reading the balance and writing back a computed value. Callers pass a transaction
/// when the credit must commit together with other writes.
pub async fn credit_wallet_atomic<C>(db: &C, seller_id: i64, amount_delta: f64) -> Result<()>
where
    C: ConnectionTrait,
{
    if !amount_delta.is_finite() {
        return Err(Error::InvalidAmount {
            amount: amount_delta,
        });
    }

    let result = Seller::update_many()
        .col_expr(
            seller::Column::WalletAmount,
            Expr::col(seller::Column::WalletAmount).add(amount_delta),
        )
        .filter(seller::Column::Id.eq(seller_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::SellerIdNotFound { id: seller_id });
    }
    Ok(())
}

/// Atomically removes `amount` from a seller's wallet, provided the wallet still
/// holds at least that much.
///
/// The update is `wallet_amount = wallet_amount - amount WHERE wallet_amount >= amount`,
/// so credits applied since the caller read the balance are kept. A wallet holding
/// less than `amount` reports [`Error::ConcurrentUpdate`] and is left unchanged.
pub async fn debit_wallet_atomic<C>(db: &C, seller_id: i64, amount: f64) -> Result<()>
where
    C: ConnectionTrait,
{
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }

    let debit = Seller::update_many()
        .col_expr(
            seller::Column::WalletAmount,
            Expr::col(seller::Column::WalletAmount).sub(amount),
        )
        .filter(seller::Column::Id.eq(seller_id))
        .filter(seller::Column::WalletAmount.gte(amount))
        .exec(db)
        .await?;

    if debit.rows_affected == 0 {
        warn!(seller_id, amount, "Wallet balance changed before debit");
        return Err(Error::ConcurrentUpdate {
            what: format!("wallet of seller {seller_id}"),
        });
    }
    Ok(())
}

/// Moves the whole current wallet balance into a pending withdrawal request.
///
/// The balance `b` is read inside a transaction, then removed with a conditional
/// decrement (`wallet_amount = wallet_amount - b WHERE wallet_amount >= b`). A
/// commission credited after the read stays in the wallet instead of being zeroed away.
pub async fn request_withdrawal(
    db: &DatabaseConnection,
    seller_id: i64,
    payout_destination: &str,
) -> Result<withdrawal_request::Model> {
    let payout_destination = payout_destination.trim();
    if payout_destination.is_empty() {
        return Err(Error::Config {
            message: "Payout destination cannot be empty".to_string(),
        });
    }

    let txn = db.begin().await?;

    let seller = Seller::find_by_id(seller_id)
        .one(&txn)
        .await?
        .ok_or(Error::SellerIdNotFound { id: seller_id })?;

    let amount = seller.wallet_amount;
    if amount.is_nan() || amount <= 0.0 {
        return Err(Error::InsufficientFunds { current: amount });
    }

    debit_wallet_atomic(&txn, seller_id, amount).await?;

    let request = withdrawal_request::ActiveModel {
        seller_id: Set(seller_id),
        referral_code: Set(seller.referral_code.clone()),
        payout_destination: Set(payout_destination.to_string()),
        amount: Set(amount),
        status: Set(WithdrawalStatus::Pending),
        requested_at: Set(Utc::now()),
        paid_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(
        seller_id,
        withdrawal_id = request.id,
        amount,
        "Withdrawal requested"
    );
    Ok(request)
}

/// Marks a pending withdrawal request as paid.
///
/// Only a `pending` request can be marked; anything else reports
/// [`Error::WithdrawalNotFound`].
pub async fn mark_withdrawal_paid<C>(
    db: &C,
    withdrawal_id: i64,
    now: DateTime<Utc>,
) -> Result<withdrawal_request::Model>
where
    C: ConnectionTrait,
{
    let result = WithdrawalRequest::update_many()
        .col_expr(
            withdrawal_request::Column::Status,
            Expr::value(WithdrawalStatus::Paid.into_value()),
        )
        .col_expr(withdrawal_request::Column::PaidAt, Expr::value(now))
        .filter(withdrawal_request::Column::Id.eq(withdrawal_id))
        .filter(withdrawal_request::Column::Status.eq(WithdrawalStatus::Pending))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::WithdrawalNotFound { id: withdrawal_id });
    }

    WithdrawalRequest::find_by_id(withdrawal_id)
        .one(db)
        .await?
        .ok_or(Error::WithdrawalNotFound { id: withdrawal_id })
}

/// Lists a seller's withdrawal requests, newest first.
pub async fn get_withdrawals_for_seller<C>(
    db: &C,
    seller_id: i64,
) -> Result<Vec<withdrawal_request::Model>>
where
    C: ConnectionTrait,
{
    WithdrawalRequest::find()
        .filter(withdrawal_request::Column::SellerId.eq(seller_id))
        .order_by_desc(withdrawal_request::Column::RequestedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_seller_generates_code_and_empty_wallet() -> Result<()> {
        let db = setup_test_db().await?;

        let seller = create_seller(&db, "Asha".to_string(), Some("asha@example.com".to_string()), None)
            .await?;
        assert!(seller.referral_code.starts_with("RK"));
        assert_eq!(seller.referral_code.len(), 8);
        assert_eq!(seller.wallet_amount, 0.0);

        let found = find_seller_by_referral_code(&db, &seller.referral_code).await?;
        assert_eq!(found.map(|s| s.id), Some(seller.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_seller_rejects_blank_name() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_seller(&db, "  ".to_string(), None, None).await;
        assert!(matches!(result, Err(Error::Config { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_referral_code_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_seller(&db, "RKAB12CD", 0.0).await?;

        let result = create_seller_with_code(
            &db,
            "Copycat".to_string(),
            None,
            None,
            "RKAB12CD".to_string(),
        )
        .await;
        assert!(matches!(result, Err(Error::Database(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_credit_wallet_atomic() -> Result<()> {
        let db = setup_test_db().await?;
        let seller = create_test_seller(&db, "RKAB12CD", 120.0).await?;

        credit_wallet_atomic(&db, seller.id, 50.0).await?;
        credit_wallet_atomic(&db, seller.id, 2.5).await?;

        let updated = get_seller_by_id(&db, seller.id).await?.unwrap();
        assert_eq!(updated.wallet_amount, 172.5);
        Ok(())
    }

    #[tokio::test]
    async fn test_credit_wallet_unknown_seller() -> Result<()> {
        let db = setup_test_db().await?;
        let result = credit_wallet_atomic(&db, 404, 10.0).await;
        assert!(matches!(result, Err(Error::SellerIdNotFound { id: 404 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_credit_wallet_rejects_non_finite() -> Result<()> {
        let db = setup_test_db().await?;
        let seller = create_test_seller(&db, "RKAB12CD", 0.0).await?;
        let result = credit_wallet_atomic(&db, seller.id, f64::INFINITY).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_request_withdrawal_moves_balance() -> Result<()> {
        let db = setup_test_db().await?;
        let seller = create_test_seller(&db, "RKAB12CD", 170.0).await?;

        let request = request_withdrawal(&db, seller.id, "asha@upi").await?;
        assert_eq!(request.amount, 170.0);
        assert_eq!(request.status, WithdrawalStatus::Pending);
        assert_eq!(request.referral_code, "RKAB12CD");

        let updated = get_seller_by_id(&db, seller.id).await?.unwrap();
        assert_eq!(updated.wallet_amount, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_request_withdrawal_empty_wallet() -> Result<()> {
        let db = setup_test_db().await?;
        let seller = create_test_seller(&db, "RKAB12CD", 0.0).await?;

        let result = request_withdrawal(&db, seller.id, "asha@upi").await;
        assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
        assert!(get_withdrawals_for_seller(&db, seller.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_credit_after_withdrawal_is_kept() -> Result<()> {
        let db = setup_test_db().await?;
        let seller = create_test_seller(&db, "RKAB12CD", 100.0).await?;

        request_withdrawal(&db, seller.id, "asha@upi").await?;
        credit_wallet_atomic(&db, seller.id, 25.0).await?;

        let updated = get_seller_by_id(&db, seller.id).await?.unwrap();
        assert_eq!(updated.wallet_amount, 25.0);

        let second = request_withdrawal(&db, seller.id, "asha@upi").await?;
        assert_eq!(second.amount, 25.0);
        assert_eq!(get_withdrawals_for_seller(&db, seller.id).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_debit_keeps_credit_landing_after_read() -> Result<()> {
        let db = setup_test_db().await?;
        let seller = create_test_seller(&db, "RKAB12CD", 100.0).await?;

        // Balance read, then a commission lands before the debit is issued
        let read = get_seller_by_id(&db, seller.id).await?.unwrap().wallet_amount;
        credit_wallet_atomic(&db, seller.id, 25.0).await?;
        debit_wallet_atomic(&db, seller.id, read).await?;

        let updated = get_seller_by_id(&db, seller.id).await?.unwrap();
        assert_eq!(updated.wallet_amount, 25.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_debit_more_than_balance_is_a_conflict() -> Result<()> {
        let db = setup_test_db().await?;
        let seller = create_test_seller(&db, "RKAB12CD", 100.0).await?;

        let result = debit_wallet_atomic(&db, seller.id, 150.0).await;
        assert!(matches!(result, Err(Error::ConcurrentUpdate { .. })));

        let result = debit_wallet_atomic(&db, seller.id, f64::NAN).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        let unchanged = get_seller_by_id(&db, seller.id).await?.unwrap();
        assert_eq!(unchanged.wallet_amount, 100.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_withdrawal_concurrent_with_settlement_loses_nothing() -> Result<()> {
        use crate::{
            config::SettlementOptions,
            core::settlement::run_settlement_pass,
            entities::{Commission, CommissionStatus, commission},
        };
        use sea_orm::{ConnectOptions, Database};

        let path = std::env::temp_dir().join(format!(
            "settlement-wallet-race-{}-{}.sqlite",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
        options.max_connections(8).sqlx_logging(false);
        let db = Database::connect(options).await?;
        crate::config::database::create_tables(&db).await?;

        let now = test_now();
        let seller = create_test_seller(&db, "RKAB12CD", 0.0).await?;
        for _ in 0..40 {
            insert_matured_commission(&db, "RKAB12CD", 1.0, now).await?;
        }

        let small_pages = SettlementOptions {
            page_size: 5,
            ..SettlementOptions::default()
        };
        let (first, second, third, withdrawal) = tokio::join!(
            run_settlement_pass(&db, now, &small_pages),
            run_settlement_pass(&db, now, &small_pages),
            run_settlement_pass(&db, now, &small_pages),
            request_withdrawal(&db, seller.id, "asha@upi")
        );

        for pass in [first, second, third] {
            assert!(matches!(pass, Ok(_) | Err(Error::Database(_))));
        }
        assert!(matches!(
            withdrawal,
            Ok(_)
                | Err(Error::Database(_)
                    | Error::ConcurrentUpdate { .. }
                    | Error::InsufficientFunds { .. })
        ));

        let released: f64 = Commission::find()
            .filter(commission::Column::Status.eq(CommissionStatus::Released))
            .all(&db)
            .await?
            .iter()
            .map(|c| c.commission_amount)
            .sum();
        let withdrawn: f64 = get_withdrawals_for_seller(&db, seller.id)
            .await?
            .iter()
            .map(|w| w.amount)
            .sum();
        let wallet = get_seller_by_id(&db, seller.id).await?.unwrap().wallet_amount;

        assert_eq!(wallet + withdrawn, released);

        db.close().await?;
        let _ = std::fs::remove_file(&path);
        Ok(())
    }

    #[tokio::test]
    async fn test_mark_withdrawal_paid_once() -> Result<()> {
        let db = setup_test_db().await?;
        let seller = create_test_seller(&db, "RKAB12CD", 40.0).await?;
        let request = request_withdrawal(&db, seller.id, "123456789012").await?;

        let now = test_now();
        let paid = mark_withdrawal_paid(&db, request.id, now).await?;
        assert_eq!(paid.status, WithdrawalStatus::Paid);
        assert_eq!(paid.paid_at, Some(now));

        let again = mark_withdrawal_paid(&db, request.id, now).await;
        assert!(matches!(again, Err(Error::WithdrawalNotFound { .. })));
        Ok(())
    }
}
