pub mod scan;
pub mod status;
pub mod sync;
pub mod watch;

// Re-export command functions for convenience
pub use scan::scan;
pub use status::status;
pub use sync::sync;
pub use watch::watch;

use anyhow::{Context, Result};
use std::sync::Arc;

use rollcall::config::Config;
use rollcall::connectivity::{ConnectivityMonitor, ConnectivityProbe, HttpProbe};
use rollcall::storage::KeyValueStore;
use rollcall::SyncOrchestrator;

pub type Orchestrator = SyncOrchestrator<Box<dyn KeyValueStore>>;

/// Everything a command needs, wired from configuration
pub struct App {
    pub config: Config,
    pub orchestrator: Arc<Orchestrator>,
    pub probe: Arc<HttpProbe>,
}

impl App {
    /// Open the queue, build the sink and take an initial connectivity sample
    pub async fn init(config: Config) -> Result<Self> {
        let probe = HttpProbe::new(config.probe_url(), config.probe_timeout())
            .context("Failed to create connectivity probe")?;

        let monitor = ConnectivityMonitor::from_signal(probe.probe().await);
        let orchestrator = SyncOrchestrator::from_config(&config, monitor).with_context(|| {
            format!(
                "Failed to open {} storage at {}",
                config.storage.backend,
                config.storage.path.display()
            )
        })?;

        Ok(Self {
            config,
            orchestrator: Arc::new(orchestrator),
            probe: Arc::new(probe),
        })
    }
}
