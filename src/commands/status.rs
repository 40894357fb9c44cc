use anyhow::{anyhow, Result};

use rollcall::config::Config;
use rollcall::metrics;

use super::App;

pub async fn status(config: Config, show_metrics: bool) -> Result<()> {
    let app = App::init(config).await?;
    let report = app.orchestrator.status();

    println!("Rollcall Status");
    println!("===============");
    println!("Sink:       {}", app.config.sink.url);
    println!(
        "Storage:    {} ({})",
        app.config.storage.backend,
        app.config.storage.path.display()
    );
    println!("Queue key:  {}", app.config.storage.queue_key);
    println!(
        "Online:     {}",
        if report.online { "yes" } else { "no" }
    );
    println!("Pending:    {}", report.pending);

    let queued = app.orchestrator.queued_records().await;
    if !queued.is_empty() {
        println!();
        println!("Queued records (oldest first):");
        for record in &queued {
            println!("  {}  {}  {}", record.timestamp_iso(), record.tag(), record.id());
        }
    }

    if show_metrics {
        let text = metrics::encode_metrics().map_err(|e| anyhow!("{e}"))?;
        println!();
        print!("{text}");
    }

    Ok(())
}
