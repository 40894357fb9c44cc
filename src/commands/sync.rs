use anyhow::{bail, Result};

use rollcall::config::Config;
use rollcall::sync::{SyncOutcome, SyncTrigger};

use super::App;

pub async fn sync(config: Config) -> Result<()> {
    let app = App::init(config).await?;

    if !app.orchestrator.monitor().is_online() {
        tracing::warn!(
            probe = %app.probe.url(),
            "Probe reports offline, attempting sync anyway"
        );
    }

    match app.orchestrator.sync_now(SyncTrigger::Manual).await {
        SyncOutcome::NothingToSync => println!("Nothing to sync"),
        SyncOutcome::AlreadySyncing => println!("Sync already in progress"),
        SyncOutcome::Synced { delivered, pending } => {
            println!("Sync Complete: {delivered} delivered, {pending} pending");
        }
        SyncOutcome::Failed { error, pending } => {
            println!("Sync Failed - Will retry ({pending} pending)");
            bail!("Sync failed: {error}");
        }
    }

    Ok(())
}
