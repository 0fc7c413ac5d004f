//! TTL Janitor Task
//!
//! Background sweeper that removes expired items from every in-process
//! tier, in bounded batches, until cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::{current_timestamp_ms, SharedTier, TierChain};

// == Janitor Config ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JanitorConfig {
    /// Time between sweeps
    pub interval: Duration,
    /// Maximum items removed per tier lock acquisition
    pub batch_size: usize,
    /// Maximum batches per tier per tick; the rest waits for the next tick
    pub max_batches_per_tick: usize,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            batch_size: 256,
            max_batches_per_tick: 16,
        }
    }
}

// == Janitor Handle ==
/// Owns the sweeper task. Dropping the handle cancels it.
#[derive(Debug)]
pub struct JanitorHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl JanitorHandle {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Token that stops the sweeper when cancelled.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancels the sweeper and waits for it to finish.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        info!("TTL janitor stopped");
    }
}

impl Drop for JanitorHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Spawns the sweeper over the chain's in-process tiers.
pub fn spawn_janitor(chain: Arc<TierChain>, config: JanitorConfig) -> JanitorHandle {
    spawn_janitor_for(chain.local_tiers(), config)
}

/// Spawns the sweeper over an explicit set of tiers.
pub fn spawn_janitor_for(tiers: Vec<SharedTier>, config: JanitorConfig) -> JanitorHandle {
    let token = CancellationToken::new();
    let child = token.clone();

    let task = tokio::spawn(async move {
        info!(
            "Starting TTL janitor with interval of {:?} over {} tiers",
            config.interval,
            tiers.len()
        );

        let mut ticker = interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = child.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let removed = sweep(&tiers, &config, &child).await;
            if removed > 0 {
                info!("TTL janitor: removed {} expired items", removed);
            } else {
                debug!("TTL janitor: no expired items found");
            }
        }
    });

    JanitorHandle {
        token,
        task: Some(task),
    }
}

/// One tick: bounded batches per tier, yielding between batches.
async fn sweep(tiers: &[SharedTier], config: &JanitorConfig, token: &CancellationToken) -> usize {
    let mut removed = 0;
    for tier in tiers {
        for _ in 0..config.max_batches_per_tick.max(1) {
            if token.is_cancelled() {
                return removed;
            }

            let now = current_timestamp_ms();
            let batch = tier.lock().purge_expired(now, config.batch_size.max(1)).len();
            removed += batch;

            if batch < config.batch_size.max(1) {
                break;
            }
            tokio::task::yield_now().await;
        }
    }
    removed
}
