//! Connectivity monitoring
//!
//! Holds the process-wide online/offline flag and notifies subscribers when
//! it flips. Signals come from a [`ConnectivityProbe`] (or from tests) via
//! [`ConnectivityMonitor::set_online`]; repeating the current value is not a
//! transition and wakes nobody.
//!
//! Every transition bumps a counter in [`ConnectivityState`], so a subscriber
//! that wakes after an `offline → online` pair still sees that a reconnect
//! happened even though the flag reads the same as before.
//!
//! # Example
//!
//! ```no_run
//! use rollcall::connectivity::ConnectivityMonitor;
//!
//! # async fn example() {
//! let monitor = ConnectivityMonitor::from_signal(None); // assume online
//! let _handle = monitor.on_change(|online| {
//!     println!("connectivity changed: online={online}");
//! });
//!
//! monitor.set_online(false);
//! monitor.set_online(true);
//! # }
//! ```

pub mod probe;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use probe::{spawn_probe_loop, ConnectivityProbe, HttpProbe};

use crate::metrics;

/// Value published to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectivityState {
    pub online: bool,

    /// Transitions applied since the monitor was created
    pub transitions: u64,

    /// `offline → online` transitions since the monitor was created
    pub reconnects: u64,
}

/// Shared online/offline state with change notification
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    state: Arc<watch::Sender<ConnectivityState>>,
}

impl ConnectivityMonitor {
    /// Create a monitor with a known initial state
    pub fn new(online: bool) -> Self {
        let (state, _) = watch::channel(ConnectivityState {
            online,
            ..Default::default()
        });
        metrics::set_online(online);
        Self {
            state: Arc::new(state),
        }
    }

    /// Create a monitor from an environment sample
    ///
    /// With no signal available the monitor assumes online until the first
    /// real signal arrives.
    pub fn from_signal(signal: Option<bool>) -> Self {
        match signal {
            Some(online) => Self::new(online),
            None => {
                tracing::info!("No connectivity signal at startup, assuming online");
                Self::new(true)
            }
        }
    }

    /// Current state
    pub fn is_online(&self) -> bool {
        self.state.borrow().online
    }

    /// Current state with transition counters
    pub fn snapshot(&self) -> ConnectivityState {
        *self.state.borrow()
    }

    /// Apply a connectivity signal; returns `true` if it was a transition
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if current.online == online {
                return false;
            }
            current.online = online;
            current.transitions += 1;
            if online {
                current.reconnects += 1;
            }
            true
        });

        if changed {
            metrics::set_online(online);
            if online {
                tracing::info!("Connectivity restored");
            } else {
                tracing::warn!("Connectivity lost");
            }
        }

        changed
    }

    /// Receiver woken on every transition
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }

    /// Invoke `callback` with the new state after every transition
    ///
    /// Transitions that landed between two wakeups are replayed in order, so
    /// a quick `false, true` pair is reported as both calls. The callback runs
    /// on a spawned task; the task ends when every monitor handle has been
    /// dropped.
    pub fn on_change<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: Fn(bool) + Send + 'static,
    {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            let mut seen = rx.borrow_and_update().transitions;
            while rx.changed().await.is_ok() {
                let current = *rx.borrow_and_update();
                // Flips alternate, so walk back from the current value
                for remaining in (0..current.transitions.saturating_sub(seen)).rev() {
                    callback(current.online ^ (remaining % 2 == 1));
                }
                seen = current.transitions;
            }
        })
    }
}
