//! # Reconciler
//!
//! Generic two-way diff shared by every flow.
//!
//! ## Algorithm
//!
//! 1. Fetch the remote snapshot. A failure aborts the flow before any local write.
//! 2. Read the local entities currently bookmarked for the flow.
//! 3. Removal pass: in one transaction, clear the bookmark of every local
//!    entity whose key is missing remotely. Entities without a key are exempt.
//! 4. Upsert pass: one spawned task per remote item, bounded by a semaphore.
//!    Every task is joined before the flow returns. A failing item is recorded
//!    in the report and does not affect its siblings.
//!
//! A flow plugs into the engine by implementing [`FlowAdapter`]: where its
//! remote items come from, which local rows it owns, how both are keyed and
//! how a single remote item is written.

use crate::config::{CollectionSource, SyncConfig};
use crate::error::{Result, SyncError};
use crate::guard::SyncFlow;
use crate::remote::{RemoteItem, RemoteItemKind, RemoteLibrary};
use async_trait::async_trait;
use core_library::{BookmarkKind, LibraryStore};
use core_runtime::events::EventBus;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Collaborators shared by every flow and every spawned upsert
pub(crate) struct SyncContext {
    pub remote: Arc<dyn RemoteLibrary>,
    pub store: Arc<dyn LibraryStore>,
    pub config: SyncConfig,
    pub events: Option<Arc<EventBus>>,
}

/// Result of writing one remote item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Upsert {
    /// A new local row was created with its bookmark set
    Inserted,
    /// An existing row had its bookmark or metadata changed
    Updated,
    /// Nothing was written
    Unchanged,
}

/// An item whose upsert failed without failing the flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Remote id of the item
    pub id: String,
    pub reason: String,
}

/// What one completed flow did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Remote items considered after filtering and merging
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unbookmarked: usize,
    pub failures: Vec<ItemFailure>,
}

impl ReconcileReport {
    /// Rows the flow changed
    pub fn writes(&self) -> usize {
        self.inserted + self.updated + self.unbookmarked
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One row of the flow dispatch table
#[async_trait]
pub(crate) trait FlowAdapter: Send + Sync + 'static {
    type Remote: Send + 'static;
    type Local: Send + Sync;

    const FLOW: SyncFlow;
    /// Bookmark cleared by the removal pass
    const BOOKMARK: BookmarkKind;

    async fn fetch_remote(ctx: &SyncContext) -> Result<Vec<Self::Remote>>;

    async fn local_bookmarked(ctx: &SyncContext) -> Result<Vec<Self::Local>>;

    fn remote_key(remote: &Self::Remote) -> &str;

    /// Key matched against remote keys; `None` exempts the row from removal
    fn local_key(local: &Self::Local) -> Option<&str>;

    /// Row id the bookmark lives on
    fn local_id(local: &Self::Local) -> &str;

    async fn upsert(ctx: &SyncContext, remote: Self::Remote) -> Result<Upsert>;
}

/// Fetch the remote snapshot of `A` and reconcile against it
pub(crate) async fn reconcile<A: FlowAdapter>(ctx: &Arc<SyncContext>) -> Result<ReconcileReport> {
    let remote = A::fetch_remote(ctx).await.map_err(|e| {
        warn!(flow = %A::FLOW, error = %e, "Remote listing failed; nothing reconciled");
        e
    })?;

    reconcile_items::<A>(ctx, remote).await
}

/// Reconcile against an already fetched remote snapshot
pub(crate) async fn reconcile_items<A: FlowAdapter>(
    ctx: &Arc<SyncContext>,
    remote: Vec<A::Remote>,
) -> Result<ReconcileReport> {
    let mut report = ReconcileReport {
        fetched: remote.len(),
        ..ReconcileReport::default()
    };

    let local = A::local_bookmarked(ctx).await?;
    let remote_keys: HashSet<&str> = remote.iter().map(A::remote_key).collect();
    let stale: Vec<&A::Local> = local
        .iter()
        .filter(|l| matches!(A::local_key(l), Some(key) if !remote_keys.contains(key)))
        .collect();

    if !stale.is_empty() {
        let mut tx = ctx.store.begin().await?;
        for entity in stale {
            if tx.unmark(A::BOOKMARK, A::local_id(entity)).await? {
                report.unbookmarked += 1;
            }
        }
        tx.commit().await?;
    }
    drop(remote_keys);

    debug!(
        flow = %A::FLOW,
        local = local.len(),
        remote = report.fetched,
        unbookmarked = report.unbookmarked,
        "Removal pass finished"
    );

    let semaphore = Arc::new(Semaphore::new(ctx.config.max_concurrent_upserts));
    let mut tasks = UpsertTasks::with_capacity(remote.len());

    for item in remote {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| SyncError::Join(e.to_string()))?;
        let key = A::remote_key(&item).to_string();
        let ctx = Arc::clone(ctx);

        let handle = tokio::spawn(async move {
            let result = A::upsert(&ctx, item).await;
            drop(permit);
            result
        });

        tasks.push(key, handle);
    }

    for (key, handle) in tasks.iter_mut() {
        match handle.await {
            Ok(Ok(Upsert::Inserted)) => report.inserted += 1,
            Ok(Ok(Upsert::Updated)) => report.updated += 1,
            Ok(Ok(Upsert::Unchanged)) => {}
            Ok(Err(e)) => {
                warn!(flow = %A::FLOW, id = %key, error = %e, "Item reconciliation failed");
                report.failures.push(ItemFailure {
                    id: key.clone(),
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                error!(flow = %A::FLOW, id = %key, error = %e, "Item task panicked");
                report.failures.push(ItemFailure {
                    id: key.clone(),
                    reason: SyncError::Join(e.to_string()).to_string(),
                });
            }
        }
    }

    Ok(report)
}

/// Spawned upserts of one pass
///
/// Dropping the set before it is drained (the flow was cancelled) aborts
/// whatever is still running, so no upsert outlives its flow.
pub(crate) struct UpsertTasks<T> {
    handles: Vec<(String, JoinHandle<T>)>,
}

impl<T> UpsertTasks<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            handles: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, key: String, handle: JoinHandle<T>) {
        self.handles.push((key, handle));
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut (String, JoinHandle<T>)> {
        self.handles.iter_mut()
    }
}

impl<T> Drop for UpsertTasks<T> {
    fn drop(&mut self) {
        for (_, handle) in &self.handles {
            handle.abort();
        }
    }
}

/// Fetch every source concurrently and merge the items of `kind`
///
/// Each list is reversed so the oldest item comes first, lists keep their
/// configured order, and a repeated id keeps its first occurrence. Any
/// failing source fails the whole fetch.
pub(crate) async fn fetch_merged(
    remote: &dyn RemoteLibrary,
    sources: &[CollectionSource],
    kind: RemoteItemKind,
) -> Result<Vec<RemoteItem>> {
    let lists = try_join_all(
        sources
            .iter()
            .map(|source| remote.library_items(&source.browse_id, source.tab)),
    )
    .await?;

    Ok(merge_collections(lists, kind))
}

pub(crate) fn merge_collections(lists: Vec<Vec<RemoteItem>>, kind: RemoteItemKind) -> Vec<RemoteItem> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for list in lists {
        for item in list.into_iter().rev() {
            if item.kind() == kind && seen.insert(item.id().to_string()) {
                merged.push(item);
            }
        }
    }

    merged
}
