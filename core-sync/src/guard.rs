//! # Per-Flow Sync Guard
//!
//! One running flag per flow. [`FlowGuards::try_acquire`] is a
//! test-and-set: it never blocks, and a caller that loses simply skips its
//! run. Flags are `watch` channels so presentation code can observe
//! "sync in progress" per flow without touching the service.
//!
//! Flows normally hold a [`FlowPermit`], which releases the flag when
//! dropped. Errors, panics and cancellation therefore all leave the flag
//! cleared.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// The five independent reconciliation flows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncFlow {
    LikedSongs,
    LibrarySongs,
    LikedAlbums,
    ArtistSubscriptions,
    SavedPlaylists,
}

impl SyncFlow {
    pub const ALL: [SyncFlow; 5] = [
        SyncFlow::LikedSongs,
        SyncFlow::LibrarySongs,
        SyncFlow::LikedAlbums,
        SyncFlow::ArtistSubscriptions,
        SyncFlow::SavedPlaylists,
    ];

    /// Stable name used in logs and events
    pub fn name(self) -> &'static str {
        match self {
            SyncFlow::LikedSongs => "liked_songs",
            SyncFlow::LibrarySongs => "library_songs",
            SyncFlow::LikedAlbums => "liked_albums",
            SyncFlow::ArtistSubscriptions => "artist_subscriptions",
            SyncFlow::SavedPlaylists => "saved_playlists",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SyncFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Running flags of all flows
pub struct FlowGuards {
    flags: [watch::Sender<bool>; 5],
}

impl FlowGuards {
    pub fn new() -> Self {
        Self {
            flags: std::array::from_fn(|_| watch::channel(false).0),
        }
    }

    /// Atomically flip the flag of `flow` from `false` to `true`
    ///
    /// Returns `false` if the flow is already running.
    pub fn try_acquire(&self, flow: SyncFlow) -> bool {
        self.flags[flow.index()].send_if_modified(|running| {
            if *running {
                false
            } else {
                *running = true;
                true
            }
        })
    }

    /// Clear the flag of `flow`. Observers are only woken if it was set.
    pub fn release(&self, flow: SyncFlow) {
        self.flags[flow.index()].send_if_modified(|running| std::mem::replace(running, false));
    }

    pub fn is_syncing(&self, flow: SyncFlow) -> bool {
        *self.flags[flow.index()].borrow()
    }

    /// Observe the running flag of `flow`
    pub fn subscribe(&self, flow: SyncFlow) -> watch::Receiver<bool> {
        self.flags[flow.index()].subscribe()
    }

    /// [`try_acquire`](Self::try_acquire) returning a permit that releases on drop
    pub fn acquire(self: &Arc<Self>, flow: SyncFlow) -> Option<FlowPermit> {
        self.try_acquire(flow).then(|| FlowPermit {
            guards: Arc::clone(self),
            flow,
        })
    }
}

impl Default for FlowGuards {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FlowGuards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for flow in SyncFlow::ALL {
            map.entry(&flow.name(), &self.is_syncing(flow));
        }
        map.finish()
    }
}

/// Holds one flow's flag; releases it when dropped
#[must_use = "the flow is released as soon as the permit is dropped"]
pub struct FlowPermit {
    guards: Arc<FlowGuards>,
    flow: SyncFlow,
}

impl FlowPermit {
    pub fn flow(&self) -> SyncFlow {
        self.flow
    }
}

impl Drop for FlowPermit {
    fn drop(&mut self) {
        self.guards.release(self.flow);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_acquire_is_test_and_set() {
        let guards = FlowGuards::new();

        assert!(guards.try_acquire(SyncFlow::LikedSongs));
        assert!(!guards.try_acquire(SyncFlow::LikedSongs));
        assert!(guards.is_syncing(SyncFlow::LikedSongs));

        guards.release(SyncFlow::LikedSongs);
        assert!(!guards.is_syncing(SyncFlow::LikedSongs));
        assert!(guards.try_acquire(SyncFlow::LikedSongs));
    }

    #[test]
    fn test_flows_are_independent() {
        let guards = FlowGuards::new();
        for flow in SyncFlow::ALL {
            assert!(guards.try_acquire(flow), "{flow} should be free");
        }
        for flow in SyncFlow::ALL {
            assert!(guards.is_syncing(flow));
        }

        guards.release(SyncFlow::LikedAlbums);
        assert!(!guards.is_syncing(SyncFlow::LikedAlbums));
        assert!(guards.is_syncing(SyncFlow::SavedPlaylists));
    }

    #[test]
    fn test_permit_releases_on_drop() {
        let guards = Arc::new(FlowGuards::new());

        let permit = guards.acquire(SyncFlow::SavedPlaylists).unwrap();
        assert_eq!(permit.flow(), SyncFlow::SavedPlaylists);
        assert!(guards.acquire(SyncFlow::SavedPlaylists).is_none());

        drop(permit);
        assert!(!guards.is_syncing(SyncFlow::SavedPlaylists));
        assert!(guards.acquire(SyncFlow::SavedPlaylists).is_some());
    }

    #[test]
    fn test_permit_releases_on_panic() {
        let guards = Arc::new(FlowGuards::new());
        let inner = Arc::clone(&guards);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _permit = inner.acquire(SyncFlow::ArtistSubscriptions).unwrap();
            panic!("flow failed");
        }));

        assert!(result.is_err());
        assert!(!guards.is_syncing(SyncFlow::ArtistSubscriptions));
    }

    #[tokio::test]
    async fn test_status_is_observable() {
        let guards = Arc::new(FlowGuards::new());
        let mut status = guards.subscribe(SyncFlow::LibrarySongs);
        assert!(!*status.borrow());

        let permit = guards.acquire(SyncFlow::LibrarySongs).unwrap();
        status.changed().await.unwrap();
        assert!(*status.borrow_and_update());

        drop(permit);
        status.changed().await.unwrap();
        assert!(!*status.borrow_and_update());
    }

    #[test]
    fn test_flow_names() {
        let names: Vec<&str> = SyncFlow::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            vec![
                "liked_songs",
                "library_songs",
                "liked_albums",
                "artist_subscriptions",
                "saved_playlists"
            ]
        );
        assert_eq!(SyncFlow::LikedAlbums.to_string(), "liked_albums");
    }
}
