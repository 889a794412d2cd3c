//! Archive manager: memoized opens, query sessions and deferred close.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::{self, BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::error::{ErrorCode, OstrichError, OstrichResult};
use crate::lifecycle::QueryGuard;
use crate::source::{QuadSource, QuadStream};
use crate::traits::{ArchiveOpener, OpenOptions, StoreHandle};
use crate::types::{QueryContext, ResolveAction};

/// An open in progress or completed, shared by every caller for one path.
pub type PendingOpen = Shared<BoxFuture<'static, OstrichResult<StoreHandle>>>;

/// What [`ArchiveManager::request_close`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Every managed store has been closed.
    Closed,
    /// Queries are in flight; the last one to end closes the stores.
    Deferred,
}

#[derive(Default)]
struct ManagerState {
    stores: HashMap<PathBuf, PendingOpen>,
    queries: usize,
    close_requested: bool,
    close_pending: bool,
    closed: bool,
}

pub(crate) struct ManagerInner {
    opener: Arc<dyn ArchiveOpener>,
    config: ResolverConfig,
    state: Mutex<ManagerState>,
    closed_tx: watch::Sender<bool>,
}

impl ManagerInner {
    fn state(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evict(&self, path: &Path) {
        self.state().stores.remove(path);
    }

    /// Called exactly once per query session when its stream ends.
    pub(crate) fn end_query(self: &Arc<Self>, archive: &Path) {
        let stores = {
            let mut state = self.state();
            state.queries = state.queries.saturating_sub(1);
            debug!(
                archive = %archive.display(),
                in_flight = state.queries,
                "Query ended"
            );
            if state.queries > 0 || !state.close_pending {
                return;
            }
            state.close_pending = false;
            state.closed = true;
            state.stores.values().cloned().collect::<Vec<_>>()
        };

        info!(stores = stores.len(), "Last query ended, performing deferred close");
        let inner = Arc::clone(self);
        let task = async move { inner.close_stores(stores).await };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(task);
            }
            Err(_) => futures::executor::block_on(task),
        }
    }

    async fn close_stores(&self, stores: Vec<PendingOpen>) {
        for pending in stores {
            // Failed opens have nothing to close.
            let Ok(store) = pending.await else {
                continue;
            };
            if store.is_closed() {
                continue;
            }
            if let Err(e) = store.close().await {
                warn!(error = %e, "Failed to close store");
            }
        }
        self.closed_tx.send_replace(true);
        info!("Archive manager closed");
    }
}

/// Owns the stores opened for each archive path and their close lifecycle.
///
/// Cloning is cheap; clones share the same table and counters.
///
/// # Example
///
/// ```ignore
/// use ostrich_core::{ArchiveManager, QueryContext, ResolveAction, ResolverConfig};
///
/// let manager = ArchiveManager::new(opener, ResolverConfig::default());
/// let action = ResolveAction::new(pattern, QueryContext::for_archive("/data/archive"));
///
/// let mut stream = manager.resolve(&action).await?;
/// let metadata = stream.metadata().await?;
/// while let Some(quad) = stream.next().await {
///     println!("{}", quad?);
/// }
///
/// manager.shutdown().await;
/// ```
#[derive(Clone)]
pub struct ArchiveManager {
    inner: Arc<ManagerInner>,
}

impl ArchiveManager {
    /// Create a manager that opens archives through `opener`.
    pub fn new(opener: Arc<dyn ArchiveOpener>, config: ResolverConfig) -> Self {
        let (closed_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(ManagerInner {
                opener,
                config,
                state: Mutex::new(ManagerState::default()),
                closed_tx,
            }),
        }
    }

    /// The manager configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.inner.config
    }

    /// Open every archive listed in the configuration.
    pub async fn initialize(&self) -> OstrichResult<()> {
        let options = self.inner.config.open_options();
        let opens: Vec<PendingOpen> = self
            .inner
            .config
            .archives
            .iter()
            .map(|path| self.open(path, options))
            .collect();
        debug!(archives = opens.len(), "Preloading archives");
        future::try_join_all(opens).await?;
        Ok(())
    }

    /// Open the archive at `path`, or join the open already recorded for it.
    ///
    /// The open is recorded before it starts, so concurrent first uses of
    /// one path share a single open. A failed open is forgotten so a later
    /// call can try again.
    pub fn open(&self, path: impl AsRef<Path>, options: OpenOptions) -> PendingOpen {
        let path = path.as_ref().to_path_buf();
        let mut state = self.inner.state();

        if state.closed {
            return future::ready(Err(OstrichError::lifecycle(
                ErrorCode::LcManagerClosed,
                "archive manager is closed",
            )))
            .boxed()
            .shared();
        }
        if let Some(existing) = state.stores.get(&path) {
            return existing.clone();
        }

        let opener = Arc::clone(&self.inner.opener);
        let manager: Weak<ManagerInner> = Arc::downgrade(&self.inner);
        let key = path.clone();
        let pending = async move {
            debug!(
                path = %key.display(),
                buffered = options.use_buffering,
                page_size = options.page_size,
                "Opening archive"
            );
            let result = opener.open(&key, options).await;
            match &result {
                Ok(store) => info!(path = %key.display(), paged = store.is_paged(), "Opened archive"),
                Err(e) => {
                    warn!(path = %key.display(), error = %e, "Failed to open archive");
                    if let Some(manager) = manager.upgrade() {
                        manager.evict(&key);
                    }
                }
            }
            result
        }
        .boxed()
        .shared();

        state.stores.insert(path, pending.clone());
        pending
    }

    /// Validate a resolve request without touching any store.
    pub fn check(&self, action: &ResolveAction) -> OstrichResult<()> {
        if action.context.single_archive_source().is_none() {
            debug!(sources = action.context.sources.len(), "Rejecting request without a single archive source");
            return Err(OstrichError::missing_source(
                "a single source with an ostrichFile must be present in the context",
            ));
        }
        if !action.pattern.graph.is_default_or_variable() {
            debug!("Rejecting request for a named graph");
            return Err(OstrichError::invalid_graph(
                "versioned queries can only be performed in the default graph or a variable",
            ));
        }
        action.context.temporal_context()?;
        Ok(())
    }

    /// Store for the archive named in `context`, opening it if needed.
    pub async fn resolve_for_context(&self, context: &QueryContext) -> OstrichResult<StoreHandle> {
        let archive = context.single_archive_source().ok_or_else(|| {
            OstrichError::missing_source("a single source with an ostrichFile must be present in the context")
        })?;
        self.open(archive, self.inner.config.open_options()).await
    }

    /// Quad source for the archive and temporal context named in `context`.
    pub async fn source_for_context(&self, context: &QueryContext) -> OstrichResult<QuadSource> {
        let temporal = context.temporal_context()?;
        let store = self.resolve_for_context(context).await?;
        Ok(QuadSource::new(store, temporal))
    }

    /// Validate, resolve the store, and start matching.
    ///
    /// The returned stream holds a query session until it ends, fails, is
    /// closed, or is dropped.
    pub async fn resolve(&self, action: &ResolveAction) -> OstrichResult<QuadStream> {
        self.check(action)?;
        let source = self.source_for_context(&action.context).await?;
        let archive = action
            .context
            .single_archive_source()
            .map(PathBuf::from)
            .unwrap_or_default();

        let guard = self.begin_query(archive);
        let mut stream = source.match_pattern(&action.pattern)?;
        stream.attach_guard(guard);
        Ok(stream)
    }

    /// Start a query session; dropping the guard ends it.
    pub fn begin_query(&self, archive: impl Into<PathBuf>) -> QueryGuard {
        let archive = archive.into();
        let mut state = self.inner.state();
        state.queries += 1;
        debug!(archive = %archive.display(), in_flight = state.queries, "Query started");
        QueryGuard::new(Arc::clone(&self.inner), archive)
    }

    /// Close every managed store, now or once in-flight queries end.
    ///
    /// Fails if a close was already requested.
    pub async fn request_close(&self) -> OstrichResult<CloseOutcome> {
        let stores = {
            let mut state = self.inner.state();
            if state.closed || state.close_requested {
                return Err(OstrichError::lifecycle(
                    ErrorCode::LcAlreadyClosed,
                    "archive manager can only be closed once",
                ));
            }
            state.close_requested = true;
            if state.queries > 0 {
                state.close_pending = true;
                info!(in_flight = state.queries, "Deferring close until queries end");
                return Ok(CloseOutcome::Deferred);
            }
            state.closed = true;
            state.stores.values().cloned().collect::<Vec<_>>()
        };

        info!(stores = stores.len(), "Closing archive manager");
        self.inner.close_stores(stores).await;
        Ok(CloseOutcome::Closed)
    }

    /// Best-effort close for host teardown. Never fails and may be called repeatedly.
    pub async fn shutdown(&self) {
        let already = {
            let state = self.inner.state();
            state.closed || state.close_requested
        };
        if already {
            debug!("Shutdown skipped, close already requested");
            return;
        }
        if let Err(e) = self.request_close().await {
            warn!(error = %e, "Shutdown close failed");
        }
    }

    /// Wait until every managed store has been closed.
    pub async fn wait_closed(&self) {
        let mut rx = self.inner.closed_tx.subscribe();
        // The sender lives in `inner`, which `self` keeps alive.
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Whether the manager has closed, or started closing, its stores.
    pub fn is_closed(&self) -> bool {
        self.inner.state().closed
    }

    /// Whether a close was requested and is waiting for queries to end.
    pub fn is_close_pending(&self) -> bool {
        self.inner.state().close_pending
    }

    /// Number of query sessions in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.state().queries
    }

    /// Number of archive paths with a recorded open.
    pub fn store_count(&self) -> usize {
        self.inner.state().stores.len()
    }
}

impl std::fmt::Debug for ArchiveManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state();
        f.debug_struct("ArchiveManager")
            .field("stores", &state.stores.len())
            .field("queries", &state.queries)
            .field("close_pending", &state.close_pending)
            .field("closed", &state.closed)
            .finish()
    }
}
