//! # Library Sync Service
//!
//! Entry points of the five reconciliation flows.
//!
//! ## Overview
//!
//! `LibrarySyncService` owns the per-flow guards and the collaborators every
//! flow needs. Each `sync_*` method:
//! 1. Tries to acquire its flow's guard, returning [`FlowOutcome::Skipped`]
//!    immediately if the flow is already running
//! 2. Runs the reconciler for that flow
//! 3. Emits lifecycle events and releases the guard, whatever the outcome
//!
//! [`LibrarySyncService::sync_all`] runs all five flows concurrently. The
//! flows share nothing but the store, so a failure in one never affects
//! the others.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{LibrarySyncService, SyncConfig};
//! use std::sync::Arc;
//!
//! # async fn example(remote: Arc<dyn core_sync::RemoteLibrary>, store: Arc<dyn core_library::LibraryStore>) -> core_sync::Result<()> {
//! let service = LibrarySyncService::new(SyncConfig::default(), remote, store, None)?;
//!
//! let report = service.sync_all().await;
//! for (flow, outcome) in report.iter() {
//!     println!("{flow}: {outcome:?}");
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::SyncConfig;
use crate::error::Result;
use crate::flows::{ArtistSubscriptionsFlow, LibrarySongsFlow, LikedAlbumsFlow, LikedSongsFlow};
use crate::guard::{FlowGuards, SyncFlow};
use crate::playlist::{replace_playlist_content, sync_saved_playlists};
use crate::reconciler::{reconcile, ReconcileReport, SyncContext};
use crate::remote::RemoteLibrary;
use async_trait::async_trait;
use core_library::{LibraryStore, Song};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// Result of invoking one flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// The flow was already running; nothing was done
    Skipped,
    Completed(ReconcileReport),
}

impl FlowOutcome {
    pub fn report(&self) -> Option<&ReconcileReport> {
        match self {
            FlowOutcome::Completed(report) => Some(report),
            FlowOutcome::Skipped => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, FlowOutcome::Skipped)
    }
}

/// Outcome of every flow of a [`LibrarySyncService::sync_all`] run
#[derive(Debug)]
pub struct SyncAllReport {
    pub liked_songs: Result<FlowOutcome>,
    pub library_songs: Result<FlowOutcome>,
    pub liked_albums: Result<FlowOutcome>,
    pub artist_subscriptions: Result<FlowOutcome>,
    pub saved_playlists: Result<FlowOutcome>,
}

impl SyncAllReport {
    /// Outcomes in [`SyncFlow::ALL`] order
    pub fn iter(&self) -> impl Iterator<Item = (SyncFlow, &Result<FlowOutcome>)> {
        [
            (SyncFlow::LikedSongs, &self.liked_songs),
            (SyncFlow::LibrarySongs, &self.library_songs),
            (SyncFlow::LikedAlbums, &self.liked_albums),
            (SyncFlow::ArtistSubscriptions, &self.artist_subscriptions),
            (SyncFlow::SavedPlaylists, &self.saved_playlists),
        ]
        .into_iter()
    }

    pub fn get(&self, flow: SyncFlow) -> &Result<FlowOutcome> {
        match flow {
            SyncFlow::LikedSongs => &self.liked_songs,
            SyncFlow::LibrarySongs => &self.library_songs,
            SyncFlow::LikedAlbums => &self.liked_albums,
            SyncFlow::ArtistSubscriptions => &self.artist_subscriptions,
            SyncFlow::SavedPlaylists => &self.saved_playlists,
        }
    }

    /// No flow returned an error
    pub fn is_success(&self) -> bool {
        self.iter().all(|(_, outcome)| outcome.is_ok())
    }
}

/// Receives liked songs that are not stored offline yet
#[async_trait]
pub trait AutoDownloader: Send + Sync {
    async fn enqueue(&self, songs: Vec<Song>) -> Result<()>;
}

/// Runs the reconciliation flows against one remote library and one store
pub struct LibrarySyncService {
    ctx: Arc<SyncContext>,
    guards: Arc<FlowGuards>,
    downloader: Option<Arc<dyn AutoDownloader>>,
}

impl LibrarySyncService {
    /// Create a new service
    ///
    /// # Arguments
    /// * `config` - Collection ids and concurrency limit, validated here
    /// * `remote` - Remote collection reader
    /// * `store` - Local library store
    /// * `event_bus` - Optional bus for lifecycle events
    pub fn new(
        config: SyncConfig,
        remote: Arc<dyn RemoteLibrary>,
        store: Arc<dyn LibraryStore>,
        event_bus: Option<Arc<EventBus>>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            ctx: Arc::new(SyncContext {
                remote,
                store,
                config,
                events: event_bus,
            }),
            guards: Arc::new(FlowGuards::new()),
            downloader: None,
        })
    }

    /// Attach the downloader used after liked-songs runs
    pub fn with_downloader(mut self, downloader: Arc<dyn AutoDownloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.ctx.config
    }

    pub fn guards(&self) -> &Arc<FlowGuards> {
        &self.guards
    }

    pub fn is_syncing(&self, flow: SyncFlow) -> bool {
        self.guards.is_syncing(flow)
    }

    /// Observe the "sync in progress" flag of `flow`
    pub fn subscribe_status(&self, flow: SyncFlow) -> watch::Receiver<bool> {
        self.guards.subscribe(flow)
    }

    #[instrument(skip(self))]
    pub async fn sync_liked_songs(&self) -> Result<FlowOutcome> {
        self.run_flow(SyncFlow::LikedSongs).await
    }

    #[instrument(skip(self))]
    pub async fn sync_library_songs(&self) -> Result<FlowOutcome> {
        self.run_flow(SyncFlow::LibrarySongs).await
    }

    #[instrument(skip(self))]
    pub async fn sync_liked_albums(&self) -> Result<FlowOutcome> {
        self.run_flow(SyncFlow::LikedAlbums).await
    }

    #[instrument(skip(self))]
    pub async fn sync_artist_subscriptions(&self) -> Result<FlowOutcome> {
        self.run_flow(SyncFlow::ArtistSubscriptions).await
    }

    #[instrument(skip(self))]
    pub async fn sync_saved_playlists(&self) -> Result<FlowOutcome> {
        self.run_flow(SyncFlow::SavedPlaylists).await
    }

    /// Run a single flow by name
    pub async fn sync_flow(&self, flow: SyncFlow) -> Result<FlowOutcome> {
        match flow {
            SyncFlow::LikedSongs => self.sync_liked_songs().await,
            SyncFlow::LibrarySongs => self.sync_library_songs().await,
            SyncFlow::LikedAlbums => self.sync_liked_albums().await,
            SyncFlow::ArtistSubscriptions => self.sync_artist_subscriptions().await,
            SyncFlow::SavedPlaylists => self.sync_saved_playlists().await,
        }
    }

    /// Replace the songs of one local playlist with its remote counterpart
    ///
    /// Runs outside the flow guards. Returns the number of songs written.
    #[instrument(skip(self))]
    pub async fn sync_playlist(&self, browse_id: &str, playlist_id: &str) -> Result<usize> {
        replace_playlist_content(&self.ctx, browse_id, playlist_id).await
    }

    /// Run all five flows concurrently and wait for every one of them
    #[instrument(skip(self))]
    pub async fn sync_all(&self) -> SyncAllReport {
        info!("Starting full library sync");

        let (liked_songs, library_songs, liked_albums, artist_subscriptions, saved_playlists) = tokio::join!(
            self.sync_liked_songs(),
            self.sync_library_songs(),
            self.sync_liked_albums(),
            self.sync_artist_subscriptions(),
            self.sync_saved_playlists(),
        );

        let report = SyncAllReport {
            liked_songs,
            library_songs,
            liked_albums,
            artist_subscriptions,
            saved_playlists,
        };

        info!(success = report.is_success(), "Full library sync finished");
        report
    }

    async fn run_flow(&self, flow: SyncFlow) -> Result<FlowOutcome> {
        let Some(_permit) = self.guards.acquire(flow) else {
            debug!(flow = %flow, "Flow already running, skipping");
            self.emit(SyncEvent::Skipped {
                flow: flow.name().to_string(),
            });
            return Ok(FlowOutcome::Skipped);
        };

        info!(flow = %flow, "Sync started");
        self.emit(SyncEvent::Started {
            flow: flow.name().to_string(),
        });

        let result = self.reconcile_flow(flow).await;
        match &result {
            Ok(report) => {
                info!(
                    flow = %flow,
                    fetched = report.fetched,
                    inserted = report.inserted,
                    updated = report.updated,
                    unbookmarked = report.unbookmarked,
                    failed = report.failures.len(),
                    "Sync completed"
                );
                self.emit(SyncEvent::Completed {
                    flow: flow.name().to_string(),
                    inserted: report.inserted as u64,
                    updated: report.updated as u64,
                    unbookmarked: report.unbookmarked as u64,
                    failed: report.failures.len() as u64,
                });
            }
            Err(e) => {
                error!(flow = %flow, error = %e, "Sync failed");
                self.emit(SyncEvent::Failed {
                    flow: flow.name().to_string(),
                    message: e.to_string(),
                });
            }
        }

        // Songs liked in earlier runs still download when the listing fails.
        if flow == SyncFlow::LikedSongs {
            self.auto_download_liked().await;
        }

        result.map(FlowOutcome::Completed)
    }

    async fn reconcile_flow(&self, flow: SyncFlow) -> Result<ReconcileReport> {
        match flow {
            SyncFlow::LikedSongs => reconcile::<LikedSongsFlow>(&self.ctx).await,
            SyncFlow::LibrarySongs => reconcile::<LibrarySongsFlow>(&self.ctx).await,
            SyncFlow::LikedAlbums => reconcile::<LikedAlbumsFlow>(&self.ctx).await,
            SyncFlow::ArtistSubscriptions => reconcile::<ArtistSubscriptionsFlow>(&self.ctx).await,
            SyncFlow::SavedPlaylists => sync_saved_playlists(&self.ctx).await,
        }
    }

    /// Hand liked, not yet downloaded songs to the downloader; failures are logged only
    async fn auto_download_liked(&self) {
        let Some(downloader) = &self.downloader else {
            return;
        };
        if !self.ctx.config.auto_download_liked {
            return;
        }

        let pending = match self.ctx.store.liked_songs_not_downloaded().await {
            Ok(songs) => songs,
            Err(e) => {
                warn!(error = %e, "Failed to list liked songs for download");
                return;
            }
        };
        if pending.is_empty() {
            return;
        }

        let count = pending.len();
        match downloader.enqueue(pending).await {
            Ok(()) => info!(count, "Queued liked songs for download"),
            Err(e) => warn!(count, error = %e, "Auto-download failed"),
        }
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(bus) = &self.ctx.events {
            bus.emit(CoreEvent::Sync(event)).ok();
        }
    }
}
