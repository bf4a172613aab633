//! Commission entity - A referral reward owed to a seller for one completed sale.
//!
//! Commissions start `pending` and are flipped to `released` exactly once by the
//! settlement pass. Historical records may carry the referral code under the
//! legacy `codee`/`code` columns, and the release date as an unstructured string.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Settlement state of a commission
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    /// Not yet credited to the seller wallet
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Credited to the seller wallet; terminal
    #[sea_orm(string_value = "released")]
    Released,
}

/// Commission database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "commissions")]
pub struct Model {
    /// Unique identifier for the commission
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Canonical referral code of the seller owed this commission
    pub referral_code: Option<String>,
    /// Legacy alias of `referral_code`, read-only
    pub codee: Option<String>,
    /// Legacy alias of `referral_code`, read-only
    pub code: Option<String>,
    /// Amount credited to the seller on release
    pub commission_amount: f64,
    /// Sale price the commission was computed from
    pub sale_amount: f64,
    /// Buyer who paid for the sale
    pub buyer_id: String,
    /// Payment gateway reference of the sale
    pub payment_id: String,
    /// Name of the product sold
    pub product_name: String,
    /// When the commission becomes payable
    pub wallet_release_date: Option<DateTimeUtc>,
    /// Release date as stored by older writers (free-form string)
    pub wallet_release_legacy: Option<String>,
    /// `pending` until settled, then `released`
    pub status: CommissionStatus,
    /// Mirrors `status == released`
    pub is_added_to_wallet: bool,
    /// When the commission was credited
    pub released_at: Option<DateTimeUtc>,
    /// When the commission was recorded
    pub created_at: DateTimeUtc,
}

/// `Commission` is linked to sellers by referral code only, not by foreign key
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
