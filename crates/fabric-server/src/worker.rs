//! Background worker publishing transaction manager statistics

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info};

use fabric_tx::InMemoryTransactionManager;

use crate::assembly::BackgroundWorker;
use crate::metrics;

pub struct StatsReporter {
    manager: Arc<InMemoryTransactionManager>,
    interval: Duration,
}

impl StatsReporter {
    pub fn new(manager: Arc<InMemoryTransactionManager>, interval: Duration) -> Self {
        Self { manager, interval }
    }

    fn report(&self) {
        let stats = self.manager.stats();
        metrics::set_transaction_stats(&stats);
        debug!(
            in_progress = stats.in_progress,
            invalid = stats.invalid,
            committed_change_sets = stats.committed_change_sets,
            last_write_pointer = stats.last_write_pointer,
            "Transaction manager stats"
        );
    }
}

#[async_trait]
impl BackgroundWorker for StatsReporter {
    fn name(&self) -> &str {
        "stats-reporter"
    }

    async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        info!(interval_ms = self.interval.as_millis() as u64, "Stats reporter started");
        loop {
            tokio::select! {
                _ = ticker.tick() => self.report(),
                _ = shutdown.recv() => break,
            }
        }
        // one last snapshot so the gauges reflect the final state
        self.report();
        info!("Stats reporter stopped");
        Ok(())
    }
}
