//! Settlement scheduler - fires settlement passes on a fixed schedule.
//!
//! Production runs once a day at a local hour (09:00 India time by default);
//! interval mode exists for testing and for catching up on a backlog. Each firing
//! spawns an independent pass, so a slow pass never delays the next firing.

use crate::{
    config::{ScheduleConfig, ScheduleMode, SettlementOptions},
    core::{
        report::format_settlement_summary,
        settlement::{SettlementSummary, run_settlement_pass},
    },
    errors::Result,
};
use chrono::{DateTime, FixedOffset, TimeDelta, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{error, info};

/// Coordinates recurring settlement passes.
pub struct SettlementScheduler {
    db: DatabaseConnection,
    schedule: ScheduleConfig,
    options: SettlementOptions,
}

impl SettlementScheduler {
    /// Creates a scheduler over `db` with the given schedule and pass limits.
    #[must_use]
    pub const fn new(
        db: DatabaseConnection,
        schedule: ScheduleConfig,
        options: SettlementOptions,
    ) -> Self {
        Self {
            db,
            schedule,
            options,
        }
    }

    /// Runs a single pass immediately.
    pub async fn run_once(&self) -> Result<SettlementSummary> {
        Self::run_pass(&self.db, &self.options).await
    }

    /// Starts the scheduler in the background. Aborting the handle stops future firings;
    /// passes already running finish on their own.
    pub fn start(&self) -> JoinHandle<()> {
        let db = self.db.clone();
        let schedule = self.schedule.clone();
        let options = self.options.clone();

        tokio::spawn(async move {
            match schedule.mode {
                ScheduleMode::Daily => Self::run_daily_scheduler(db, &schedule, options).await,
                ScheduleMode::Interval => {
                    Self::run_interval_scheduler(db, &schedule, options).await;
                }
            }
        })
    }

    async fn run_pass(db: &DatabaseConnection, options: &SettlementOptions) -> Result<SettlementSummary> {
        let summary = run_settlement_pass(db, Utc::now(), options).await?;
        info!("{}", format_settlement_summary(&summary).trim_end());
        Ok(summary)
    }

    fn fire(db: &DatabaseConnection, options: &SettlementOptions) {
        let db = db.clone();
        let options = options.clone();
        tokio::spawn(async move {
            if let Err(e) = Self::run_pass(&db, &options).await {
                error!("Settlement pass aborted, retrying at next firing: {e}");
            }
        });
    }

    /// Daily scheduler - fires once per day at the configured local hour
    async fn run_daily_scheduler(
        db: DatabaseConnection,
        schedule: &ScheduleConfig,
        options: SettlementOptions,
    ) {
        let mut previous: Option<DateTime<Utc>> = None;
        loop {
            let now = Utc::now();
            let Some(next) = following_daily_execution(
                previous,
                now,
                schedule.execution_hour,
                schedule.utc_offset_minutes,
            ) else {
                error!(
                    hour = schedule.execution_hour,
                    offset_minutes = schedule.utc_offset_minutes,
                    "Invalid daily schedule, scheduler stopped"
                );
                return;
            };

            info!("Next settlement pass scheduled for {next}");
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            Self::fire(&db, &options);
            previous = Some(next);
        }
    }

    /// Interval scheduler - fires every `interval_secs`, starting immediately
    async fn run_interval_scheduler(
        db: DatabaseConnection,
        schedule: &ScheduleConfig,
        options: SettlementOptions,
    ) {
        let mut ticker = interval(Duration::from_secs(schedule.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            interval_secs = schedule.interval_secs,
            "Settlement scheduler running in interval mode"
        );

        loop {
            ticker.tick().await;
            Self::fire(&db, &options);
        }
    }
}

/// Calculates the next daily firing: `hour:00` local time in a zone `utc_offset_minutes`
/// east of UTC, strictly after `now`.
///
/// Returns `None` for an hour above 23 or an offset outside +/-24 hours.
#[must_use]
pub fn next_daily_execution(
    now: DateTime<Utc>,
    hour: u32,
    utc_offset_minutes: i32,
) -> Option<DateTime<Utc>> {
    let offset = FixedOffset::east_opt(utc_offset_minutes.checked_mul(60)?)?;
    let local_now = now.with_timezone(&offset);

    let today = local_now.date_naive().and_hms_opt(hour, 0, 0)?;
    let candidate = offset.from_local_datetime(&today).single()?;

    // If the firing time has passed today, schedule for tomorrow
    let next = if candidate <= local_now {
        offset
            .from_local_datetime(&(today + TimeDelta::days(1)))
            .single()?
    } else {
        candidate
    };
    Some(next.with_timezone(&Utc))
}

/// Next daily firing strictly after both `now` and the `previous` firing.
fn following_daily_execution(
    previous: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    hour: u32,
    utc_offset_minutes: i32,
) -> Option<DateTime<Utc>> {
    let from = previous.map_or(now, |previous| previous.max(now));
    next_daily_execution(from, hour, utc_offset_minutes)
}
