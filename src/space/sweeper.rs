//! Background Expiry Sweeper
//!
//! Expired keys are normally evicted lazily, one at a time, by
//! [`Space::get_by_strict`]. A key that is never read strictly again keeps
//! its rows forever. The sweeper runs [`Space::clean_all_expire_data`] on a
//! timer so such keys eventually go away.
//!
//! It is opt-in: a space without a running sweeper never loses data outside
//! of strict reads and explicit sweeps.
//!
//! ## Adaptive Frequency
//!
//! If a large share of the namespace was evicted, the next sweep comes
//! sooner. If nothing was evicted, the sweeper backs off.

use crate::space::Space;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Interval before the first sweep (default: 1s)
    pub base_interval: Duration,

    /// Shortest interval between sweeps (default: 100ms)
    pub min_interval: Duration,

    /// Longest interval between sweeps (default: 60s)
    pub max_interval: Duration,

    /// Speed up when more than this fraction of rows was evicted
    pub speedup_threshold: f64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(1),
            min_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(60),
            speedup_threshold: 0.25,
        }
    }
}

/// Handle to a running sweeper. Dropping it stops the task.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Spawns a sweeper for `space` on the current tokio runtime.
    pub fn start(space: Arc<Space>, config: SweeperConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(namespace = %space.namespace(), "expiry sweeper started");
        tokio::spawn(sweeper_loop(space, config, shutdown_rx));

        Self { shutdown_tx }
    }

    /// Signals the task to stop. Also called on drop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweeper_loop(
    space: Arc<Space>,
    config: SweeperConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut current_interval = config.base_interval;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(current_interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!(namespace = %space.namespace(), "expiry sweeper stopped");
                    return;
                }
            }
        }

        let rows_before = match space.length().await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(namespace = %space.namespace(), error = %err, "sweep skipped");
                continue;
            }
        };

        let evicted = match space.clean_all_expire_data().await {
            Ok(evicted) => evicted,
            Err(err) => {
                warn!(namespace = %space.namespace(), error = %err, "sweep failed");
                continue;
            }
        };

        if rows_before == 0 {
            continue;
        }

        // Each evicted key removes two rows: value and marker
        let rate = (evicted * 2) as f64 / rows_before as f64;

        if rate > config.speedup_threshold {
            current_interval = (current_interval / 2).max(config.min_interval);
            debug!(
                evicted,
                rate = %format!("{:.2}%", rate * 100.0),
                new_interval_ms = current_interval.as_millis(),
                "High expiry rate, speeding up sweeper"
            );
        } else if evicted == 0 {
            current_interval = (current_interval * 2).min(config.max_interval);
            trace!(
                new_interval_ms = current_interval.as_millis(),
                "Nothing expired, slowing down sweeper"
            );
        }
    }
}
