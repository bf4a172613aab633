//! Key-value bookkeeping in the `system_state` table.

use crate::{
    entities::{SystemState, system_state},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, prelude::*, sea_query::OnConflict};

/// Key under which the completion instant of the last settlement pass is stored
pub const LAST_SETTLEMENT_PASS_KEY: &str = "last_settlement_pass";

/// Retrieves a value from the `system_state` table.
pub async fn get_state_value<C>(db: &C, key: &str) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    let state = SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?;
    Ok(state.map(|s| s.value))
}

/// Sets or replaces a value in the `system_state` table.
pub async fn set_state_value<C>(db: &C, key: &str, value: String) -> Result<()>
where
    C: ConnectionTrait,
{
    let entry = system_state::ActiveModel {
        key: Set(key.to_string()),
        value: Set(value),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };

    SystemState::insert(entry)
        .on_conflict(
            OnConflict::column(system_state::Column::Key)
                .update_columns([system_state::Column::Value, system_state::Column::UpdatedAt])
                .to_owned(),
        )
        .exec(db)
        .await?;
    Ok(())
}

/// Retrieves when the last settlement pass finished, if one ever did.
pub async fn get_last_settlement_pass<C>(db: &C) -> Result<Option<DateTime<Utc>>>
where
    C: ConnectionTrait,
{
    match get_state_value(db, LAST_SETTLEMENT_PASS_KEY).await? {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| Error::Config {
                message: format!("Failed to parse last settlement pass '{raw}': {e}"),
            }),
        None => Ok(None),
    }
}

/// Records when a settlement pass finished.
pub async fn set_last_settlement_pass<C>(db: &C, at: DateTime<Utc>) -> Result<()>
where
    C: ConnectionTrait,
{
    set_state_value(db, LAST_SETTLEMENT_PASS_KEY, at.to_rfc3339()).await
}
