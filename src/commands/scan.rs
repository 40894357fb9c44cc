use anyhow::{bail, Result};

use rollcall::config::Config;
use rollcall::sync::ScanOutcome;

use super::App;

pub async fn scan(config: Config, tag: String) -> Result<()> {
    let app = App::init(config).await?;
    let outcome = app.orchestrator.record_scan(&tag).await?;
    report(&outcome);

    if let ScanOutcome::Lost { error, .. } = outcome {
        bail!("Record could not be delivered or saved: {error}");
    }
    Ok(())
}

/// Print the operator-facing line for one scan
pub fn report(outcome: &ScanOutcome) {
    let record = outcome.record();
    match outcome {
        ScanOutcome::Delivered(_) => {
            println!("Success: {} at {}", record.tag(), record.timestamp_iso());
        }
        ScanOutcome::Queued { pending, .. } => {
            println!(
                "Saved Offline: {} at {} ({pending} pending)",
                record.tag(),
                record.timestamp_iso()
            );
        }
        ScanOutcome::Lost { error, .. } => {
            eprintln!("LOST: {} at {}: {error}", record.tag(), record.timestamp_iso());
        }
    }
}
