//! Withdrawal request entity - A seller's request to pay out the wallet balance.
//!
//! The requested amount is moved out of the wallet when the request is created;
//! the request is later marked `paid` once the payout has been made.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payout state of a withdrawal request
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    /// Awaiting payout
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Paid out
    #[sea_orm(string_value = "paid")]
    Paid,
}

/// Withdrawal request database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "withdrawal_requests")]
pub struct Model {
    /// Unique identifier for the request
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Seller requesting the payout
    pub seller_id: i64,
    /// Seller's referral code at request time
    pub referral_code: String,
    /// UPI id or bank account number to pay into
    pub payout_destination: String,
    /// Amount taken out of the wallet
    pub amount: f64,
    /// `pending` until paid
    pub status: WithdrawalStatus,
    /// When the request was made
    pub requested_at: DateTimeUtc,
    /// When the payout was made
    pub paid_at: Option<DateTimeUtc>,
}

/// Defines relationships between `WithdrawalRequest` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each request belongs to one seller
    #[sea_orm(
        belongs_to = "super::seller::Entity",
        from = "Column::SellerId",
        to = "super::seller::Column::Id"
    )]
    Seller,
}

impl Related<super::seller::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
