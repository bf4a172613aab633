use commission_settlement::{
    config::{
        self,
        database::{create_connection, create_tables, ensure_sqlite_parent_dir},
    },
    core::{commission::backfill_referral_codes, system_state::get_last_settlement_pass},
    errors::Result,
    scheduler::SettlementScheduler,
};
use dotenvy::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;

    // 4. Connect and make sure the tables exist
    ensure_sqlite_parent_dir(&app_config.database.url)?;
    let db = create_connection(&app_config.database.url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {e}"))?;

    // 5. Normalise legacy referral code aliases before settling anything
    if let Err(e) = backfill_referral_codes(&db).await {
        warn!("Referral code backfill failed, legacy aliases still used as fallback: {e}");
    }

    match get_last_settlement_pass(&db).await {
        Ok(Some(at)) => info!("Last settlement pass completed at {at}"),
        Ok(None) => info!("No settlement pass recorded yet"),
        Err(e) => warn!("Could not read last settlement pass: {e}"),
    }

    let scheduler = SettlementScheduler::new(db, app_config.schedule, app_config.settlement);

    // 6. Either a single pass, or the scheduler until interrupted
    if std::env::args().any(|arg| arg == "--once") {
        scheduler.run_once().await?;
        return Ok(());
    }

    let handle = scheduler.start();
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, stopping settlement scheduler");
    handle.abort();

    Ok(())
}
