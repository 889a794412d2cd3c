//! Opener serving registered in-memory archives by path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use ostrich_core::error::{OstrichError, OstrichResult};
use ostrich_core::traits::{ArchiveOpener, OpenOptions, StoreHandle};

use crate::archive::MemoryArchive;
use crate::store::{MemoryStore, PagedMemoryStore};

/// Opens archives registered under a path.
///
/// Every call to [`open`](ArchiveOpener::open) produces a fresh store, so
/// [`open_count`](Self::open_count) shows how often callers really opened.
#[derive(Debug, Default)]
pub struct MemoryArchiveOpener {
    archives: RwLock<HashMap<PathBuf, Arc<MemoryArchive>>>,
    opens: AtomicUsize,
    open_delay: Option<Duration>,
}

impl MemoryArchiveOpener {
    /// Create an opener with no archives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait this long inside every open.
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    /// Make `archive` available under `path`.
    pub fn register(&self, path: impl Into<PathBuf>, archive: MemoryArchive) {
        self.archives
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), Arc::new(archive));
    }

    /// Number of opens performed so far.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn lookup(&self, path: &Path) -> Option<Arc<MemoryArchive>> {
        self.archives
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }
}

#[async_trait]
impl ArchiveOpener for MemoryArchiveOpener {
    async fn open(&self, path: &Path, options: OpenOptions) -> OstrichResult<StoreHandle> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }

        let archive = self
            .lookup(path)
            .ok_or_else(|| OstrichError::archive_not_found(path))?;
        debug!(
            path = %path.display(),
            versions = archive.version_count(),
            latest = ?archive.latest_version(),
            buffered = options.use_buffering,
            "Opening in-memory archive"
        );

        Ok(if options.use_buffering {
            StoreHandle::Paged(Arc::new(PagedMemoryStore::new(path, archive, options.page_size)))
        } else {
            StoreHandle::OneShot(Arc::new(MemoryStore::new(path, archive)))
        })
    }
}
