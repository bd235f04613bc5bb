//! # Live Queries
//!
//! Watch-based observable queries: a caller subscribes once and receives
//! a continuously-updated snapshot of a query's result set.
//!
//! ## How It Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  write path                         read path                       │
//! │                                                                     │
//! │  repo.upsert(order)                 repo.watch_for_user(u)          │
//! │       │                                  │                          │
//! │       ▼                                  ▼                          │
//! │  COMMIT ── hub.mark(Orders)         initial SELECT ─► snapshot #0   │
//! │                 │                        │                          │
//! │                 ▼                        ▼                          │
//! │        version counter +1 ───────► refresh task re-runs SELECT      │
//! │                                          │                          │
//! │                                          ▼                          │
//! │                                     snapshot #1, #2, ...            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delivery Guarantees
//! - The subscriber sees the current result set immediately (an empty
//!   snapshot is still a snapshot).
//! - Every committed write to a watched table bumps the version counter
//!   AFTER the commit, so a refresh never reads an uncommitted state.
//! - Rapid writes may be coalesced into one refresh; the latest committed
//!   state is always eventually delivered. Update-by-update delivery is
//!   NOT guaranteed.
//! - Dropping the [`LiveQuery`] aborts the refresh task (cancel on
//!   unsubscribe).

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::StoreResult;

// =============================================================================
// Change Hub
// =============================================================================

/// Tables that live queries can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Watched {
    Orders,
    Tracking,
    Stores,
    Returns,
    Settings,
}

/// Per-table version counters shared by every repository handle.
///
/// Writers bump a counter after each committed write; live queries hold a
/// receiver and re-run their SELECT on every bump. One hub per store
/// handle, shared via `Arc`.
#[derive(Debug)]
pub(crate) struct ChangeHub {
    orders: watch::Sender<u64>,
    tracking: watch::Sender<u64>,
    stores: watch::Sender<u64>,
    returns: watch::Sender<u64>,
    settings: watch::Sender<u64>,
}

impl ChangeHub {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(ChangeHub {
            orders: watch::channel(0).0,
            tracking: watch::channel(0).0,
            stores: watch::channel(0).0,
            returns: watch::channel(0).0,
            settings: watch::channel(0).0,
        })
    }

    fn counter(&self, table: Watched) -> &watch::Sender<u64> {
        match table {
            Watched::Orders => &self.orders,
            Watched::Tracking => &self.tracking,
            Watched::Stores => &self.stores,
            Watched::Returns => &self.returns,
            Watched::Settings => &self.settings,
        }
    }

    /// Records a committed write. Call AFTER the transaction commits.
    pub(crate) fn mark(&self, table: Watched) {
        // send_modify notifies even when no receiver is currently attached
        self.counter(table)
            .send_modify(|version| *version = version.wrapping_add(1));
    }

    /// Subscribes to a table's version counter.
    pub(crate) fn subscribe(&self, table: Watched) -> watch::Receiver<u64> {
        self.counter(table).subscribe()
    }
}

// =============================================================================
// Live Query
// =============================================================================

/// A continuously-updated query result.
///
/// Holds the latest snapshot; [`LiveQuery::changed`] suspends until a
/// newer snapshot is available. Dropping the handle cancels the refresh
/// task.
///
/// ## Usage
/// ```rust,ignore
/// let mut live = db.orders().watch_for_user("user-1").await?;
/// assert!(live.snapshot().is_empty());
///
/// // ... a write happens elsewhere ...
/// let orders = live.changed().await.expect("store still open");
/// ```
#[derive(Debug)]
pub struct LiveQuery<T> {
    rx: watch::Receiver<Vec<T>>,
    task: JoinHandle<()>,
}

impl<T: Clone> LiveQuery<T> {
    /// The most recent snapshot.
    pub fn snapshot(&self) -> Vec<T> {
        self.rx.borrow().clone()
    }

    /// Waits for the next snapshot after the last one observed.
    ///
    /// Returns `None` once the store handle is gone and no further
    /// snapshots can arrive.
    pub async fn changed(&mut self) -> Option<Vec<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        // Cancel on unsubscribe
        self.task.abort();
    }
}

/// Runs `fetch` once for the initial snapshot, then re-runs it on every
/// version bump, publishing each result to the returned [`LiveQuery`].
///
/// A failed refresh keeps the previous snapshot and is retried on the
/// next bump ("eventually consistent with latest state").
pub(crate) async fn watch_query<T, F, Fut>(
    mut version: watch::Receiver<u64>,
    fetch: F,
) -> StoreResult<LiveQuery<T>>
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = StoreResult<Vec<T>>> + Send,
{
    // Subscribe-then-fetch: a write landing between these two steps still
    // flips the version flag, so the refresh loop picks it up.
    let initial = fetch().await?;
    let (tx, rx) = watch::channel(initial);

    let task = tokio::spawn(async move {
        loop {
            if version.changed().await.is_err() {
                // store handle dropped
                break;
            }
            version.borrow_and_update();
            match fetch().await {
                Ok(rows) => {
                    if tx.send(rows).is_err() {
                        // subscriber dropped
                        break;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "live query refresh failed; keeping last snapshot");
                }
            }
        }
    });

    Ok(LiveQuery { rx, task })
}
