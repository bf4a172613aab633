//! Seller entity - A seller profile carrying the referral code and wallet balance.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Seller database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sellers")]
pub struct Model {
    /// Unique identifier for the seller
    #[sea_orm(primary_key)]
    pub id: i64,
    /// External auth user id, if the seller signed up through the storefront
    pub uid: Option<String>,
    /// Name shown on the storefront
    pub display_name: String,
    /// Contact email
    pub email: Option<String>,
    /// Referral code buyers enter at checkout (e.g. `RKAB12CD`)
    #[sea_orm(unique)]
    pub referral_code: String,
    /// Withdrawable balance; only ever changed by atomic deltas
    pub wallet_amount: f64,
    /// When the seller record was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Seller and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One seller has many withdrawal requests
    #[sea_orm(has_many = "super::withdrawal_request::Entity")]
    WithdrawalRequests,
}

impl Related<super::withdrawal_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WithdrawalRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
