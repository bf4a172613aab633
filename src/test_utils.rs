//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test sellers and commissions with sensible defaults.

use crate::{
    core::commission::NewCommission,
    entities::{CommissionStatus, commission, seller},
    errors::Result,
};
use chrono::{DateTime, SubsecRound, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all database tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Current instant truncated to milliseconds, so it survives a database round trip unchanged.
#[must_use]
pub fn test_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Builds (without inserting) a pending commission releasing at `release_date`.
///
/// # Defaults
/// * `referral_code`: `"RKAB12CD"`
/// * `commission_amount`: 50.0 (10% of a 500.0 sale)
#[must_use]
pub fn commission_model(id: i64, release_date: DateTime<Utc>) -> commission::Model {
    commission::Model {
        id,
        referral_code: Some("RKAB12CD".to_string()),
        codee: None,
        code: None,
        commission_amount: 50.0,
        sale_amount: 500.0,
        buyer_id: "test_buyer".to_string(),
        payment_id: "pay_test".to_string(),
        product_name: "Test Product".to_string(),
        wallet_release_date: Some(release_date),
        wallet_release_legacy: None,
        status: CommissionStatus::Pending,
        is_added_to_wallet: false,
        released_at: None,
        created_at: release_date,
    }
}

/// Inserts a commission model as-is, letting the database assign the id.
/// Use this to store records the checkout flow would not create (legacy aliases, bad dates).
pub async fn insert_commission(
    db: &DatabaseConnection,
    model: commission::Model,
) -> Result<commission::Model> {
    let mut active: commission::ActiveModel = model.into();
    active.id = NotSet;
    active.insert(db).await.map_err(Into::into)
}

/// Inserts a pending commission for `referral_code` worth `amount`, releasing at `release_date`.
pub async fn insert_matured_commission(
    db: &DatabaseConnection,
    referral_code: &str,
    amount: f64,
    release_date: DateTime<Utc>,
) -> Result<commission::Model> {
    let mut model = commission_model(0, release_date);
    model.referral_code = Some(referral_code.to_string());
    model.commission_amount = amount;
    insert_commission(db, model).await
}

/// Creates a seller with a fixed referral code and starting wallet balance.
pub async fn create_test_seller(
    db: &DatabaseConnection,
    referral_code: &str,
    wallet_amount: f64,
) -> Result<seller::Model> {
    seller::ActiveModel {
        uid: Set(None),
        display_name: Set(format!("Seller {referral_code}")),
        email: Set(None),
        referral_code: Set(referral_code.to_string()),
        wallet_amount: Set(wallet_amount),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Checkout details for a sale of `sale_amount` referred by `referral_code`.
#[must_use]
pub fn new_commission(referral_code: &str, sale_amount: f64) -> NewCommission {
    NewCommission {
        referral_code: referral_code.to_string(),
        sale_amount,
        buyer_id: "test_buyer".to_string(),
        payment_id: "pay_test".to_string(),
        product_name: "Test Product".to_string(),
        delivery_days: Some(5),
    }
}
