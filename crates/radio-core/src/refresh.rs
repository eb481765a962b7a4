//! Background catalog refresh.
//!
//! The catalog lives in a single-slot `watch` channel: the refresh task is
//! the only writer and replaces the whole snapshot; the UI borrows whatever
//! snapshot is current when it renders. Only the newest list ever matters,
//! so there is no queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::catalog::{Catalog, CatalogSource};

/// Read side of the catalog slot.
#[derive(Debug, Clone)]
pub struct CatalogReader {
    rx: watch::Receiver<Catalog>,
}

impl CatalogReader {
    /// The current snapshot. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Catalog {
        Arc::clone(&self.rx.borrow())
    }
}

/// Create the catalog slot seeded with the initial fetch.
pub fn catalog_channel(initial: Catalog) -> (watch::Sender<Catalog>, CatalogReader) {
    let (tx, rx) = watch::channel(initial);
    (tx, CatalogReader { rx })
}

/// Spawn the refresh loop: sleep `interval`, fetch, replace, forever.
///
/// The first fetch happens one full interval after spawning; the caller
/// already seeded the slot. The task only stops when the runtime shuts down
/// or when every reader has been dropped.
pub fn spawn_refresh_task<S: CatalogSource>(
    source: S,
    interval: Duration,
    tx: watch::Sender<Catalog>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("refresh: polling station directory every {:?}", interval);
        loop {
            tokio::time::sleep(interval).await;
            let catalog = source.fetch().await;
            debug!("refresh: replacing catalog ({} stations)", catalog.len());
            tx.send_replace(catalog);
            if tx.is_closed() {
                debug!("refresh: no catalog readers left, stopping");
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{empty_catalog, Station};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves `n` stations on the n-th call (1-based).
    struct GrowingSource {
        calls: Arc<AtomicUsize>,
    }

    impl CatalogSource for GrowingSource {
        async fn fetch(&self) -> Catalog {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            (0..n)
                .map(|i| Station::new(format!("S{i}"), "t", format!("http://s/{i}")))
                .collect::<Vec<_>>()
                .into()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_replaces_snapshot_each_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, reader) = catalog_channel(empty_catalog());
        let source = GrowingSource {
            calls: calls.clone(),
        };
        let handle = spawn_refresh_task(source, Duration::from_secs(10), tx);

        // Nothing happens before the first interval elapses.
        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(reader.snapshot().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(reader.snapshot().len(), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(reader.snapshot().len(), 2);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_snapshot_is_not_mutated_by_refresh() {
        let calls = Arc::new(AtomicUsize::new(2));
        let seed: Catalog = vec![Station::new("A", "Jazz FM", "url1")].into();
        let (tx, reader) = catalog_channel(seed);
        let held = reader.snapshot();

        let handle = spawn_refresh_task(GrowingSource { calls }, Duration::from_secs(10), tx);
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert_eq!(reader.snapshot().len(), 3);
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].title, "Jazz FM");
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_stops_without_readers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, reader) = catalog_channel(empty_catalog());
        drop(reader);

        let handle = spawn_refresh_task(GrowingSource { calls }, Duration::from_secs(10), tx);
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(handle.is_finished());
    }
}
