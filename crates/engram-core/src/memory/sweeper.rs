//! Periodic expiration sweeper.
//!
//! Runs `MemoryStore::sweep` on a fixed cadence until cancelled. This is
//! purely space reclamation: the query path filters expired records on
//! every read, so the sweeper may run on any cadence, including never,
//! without affecting result correctness. Sweep failures are logged and
//! retried on the next tick; they never block ingestion or queries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::index::VectorIndex;
use super::store::MemoryStore;

/// Background task that periodically reclaims expired records.
pub struct ExpirationSweeper<I> {
    store: Arc<MemoryStore<I>>,
    interval: Duration,
    token: CancellationToken,
}

impl<I: VectorIndex + 'static> ExpirationSweeper<I> {
    /// Create a sweeper over the given store.
    ///
    /// `interval` comes from `StoreConfig::sweep_interval_secs`; the
    /// token lets the owner stop the task on shutdown.
    pub fn new(store: Arc<MemoryStore<I>>, interval: Duration, token: CancellationToken) -> Self {
        Self {
            store,
            interval,
            token,
        }
    }

    /// Spawn the sweep loop. The first sweep runs immediately.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(self.interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = self.token.cancelled() => {
                        debug!("sweeper cancelled, shutting down");
                        break;
                    }
                    _ = tick.tick() => {
                        match self.store.sweep().await {
                            Ok(0) => debug!("sweep found nothing to reclaim"),
                            Ok(removed) => info!(removed, "swept expired records"),
                            // Non-fatal: the next tick retries.
                            Err(e) => warn!(error = %e, "sweep failed, retrying next cycle"),
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::store::testing::InMemoryIndex;
    use chrono::Utc;
    use engram_types::config::StoreConfig;
    use engram_types::embedding::NewEmbedding;

    fn expiring_draft(offset: chrono::Duration) -> NewEmbedding {
        NewEmbedding {
            content: "ephemeral".to_string(),
            vector: vec![1.0, 0.0, 0.0, 0.0],
            expires_at: Some((Utc::now() + offset).to_rfc3339()),
            ..Default::default()
        }
    }

    fn make_store() -> (Arc<MemoryStore<InMemoryIndex>>, InMemoryIndex) {
        let config = StoreConfig {
            dimension: 4,
            ..Default::default()
        };
        let index = InMemoryIndex::new();
        (Arc::new(MemoryStore::new(index.clone(), config)), index)
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_reclaims_expired_records() {
        let (store, index) = make_store();

        store
            .ingest(expiring_draft(-chrono::Duration::minutes(1)), None)
            .await
            .unwrap();
        store
            .ingest(expiring_draft(chrono::Duration::hours(1)), None)
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 2);

        let token = CancellationToken::new();
        let sweeper = ExpirationSweeper::new(
            Arc::clone(&store),
            Duration::from_secs(60),
            token.clone(),
        );
        let handle = sweeper.spawn();

        // First tick fires immediately; yield until it has run.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(index.count().await.unwrap(), 1);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_on_cancel() {
        let (store, _) = make_store();

        let token = CancellationToken::new();
        let sweeper = ExpirationSweeper::new(
            Arc::clone(&store),
            Duration::from_secs(60),
            token.clone(),
        );
        let handle = sweeper.spawn();

        token.cancel();
        handle.await.unwrap();
    }
}
