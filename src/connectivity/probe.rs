//! Connectivity probes
//!
//! A probe samples the environment and reports whether the remote side is
//! reachable. The probe loop feeds those samples into a
//! [`ConnectivityMonitor`] on a fixed interval.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::ConnectivityMonitor;

/// Source of connectivity samples
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// `Some(online)` when a signal is available, `None` otherwise
    async fn probe(&self) -> Option<bool>;
}

/// Probe that treats any HTTP response from `url` as online
///
/// Status codes are ignored: a 401 or 404 still proves the network path
/// works. Only transport errors and timeouts count as offline.
pub struct HttpProbe {
    client: Client,
    url: String,
}

impl HttpProbe {
    /// Create a probe for `url` with a request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn probe(&self) -> Option<bool> {
        match self.client.head(&self.url).send().await {
            Ok(response) => {
                tracing::trace!(url = %self.url, status = %response.status(), "Probe reached remote");
                Some(true)
            }
            Err(e) if e.is_builder() => {
                // Malformed URL: there is no usable signal
                tracing::warn!(url = %self.url, error = %e, "Connectivity probe misconfigured");
                None
            }
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "Probe failed");
                Some(false)
            }
        }
    }
}

/// Poll `probe` every `interval` and feed the monitor until `shutdown` flips to `true`
pub fn spawn_probe_loop(
    monitor: ConnectivityMonitor,
    probe: Arc<dyn ConnectivityProbe>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(online) = probe.probe().await {
                        monitor.set_online(online);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("Connectivity probe loop stopped");
                        break;
                    }
                }
            }
        }
    })
}
