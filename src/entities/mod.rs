//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod commission;
pub mod seller;
pub mod system_state;
pub mod withdrawal_request;

// Re-export specific types to avoid conflicts
pub use commission::{
    Column as CommissionColumn, CommissionStatus, Entity as Commission, Model as CommissionModel,
};
pub use seller::{Column as SellerColumn, Entity as Seller, Model as SellerModel};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
pub use withdrawal_request::{
    Column as WithdrawalRequestColumn, Entity as WithdrawalRequest,
    Model as WithdrawalRequestModel, WithdrawalStatus,
};
