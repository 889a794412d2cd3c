//! Stores answering searches from a [`MemoryArchive`].

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use oxrdf::Triple;
use tracing::debug;

use ostrich_core::error::{OstrichError, OstrichResult};
use ostrich_core::traits::{ArchiveStore, OneShotStore, PageCursor, PagedStore};
use ostrich_core::types::{CountResult, DeltaTriple, Page, TriplePattern, VersionedTriple};

use crate::archive::MemoryArchive;

/// One-shot store over an in-memory archive.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    path: PathBuf,
    archive: Arc<MemoryArchive>,
    closed: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create a store serving `archive` under `path`.
    pub fn new(path: impl Into<PathBuf>, archive: Arc<MemoryArchive>) -> Self {
        Self {
            path: path.into(),
            archive,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Path the store was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_open(&self) -> OstrichResult<&MemoryArchive> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(OstrichError::store_closed(&self.path));
        }
        Ok(&self.archive)
    }
}

#[async_trait]
impl ArchiveStore for MemoryStore {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) -> OstrichResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(OstrichError::store_closed(&self.path));
        }
        debug!(path = %self.path.display(), "Closed in-memory store");
        Ok(())
    }

    async fn count_version_materialized(
        &self,
        pattern: &TriplePattern,
        version: i64,
    ) -> OstrichResult<CountResult> {
        Ok(self.ensure_open()?.count_materialized(pattern, version))
    }

    async fn count_delta_materialized(
        &self,
        pattern: &TriplePattern,
        version_start: i64,
        version_end: i64,
    ) -> OstrichResult<CountResult> {
        Ok(self
            .ensure_open()?
            .count_delta(pattern, version_start, version_end))
    }

    async fn count_version(&self, pattern: &TriplePattern) -> OstrichResult<CountResult> {
        Ok(self.ensure_open()?.count_versioned(pattern))
    }
}

#[async_trait]
impl OneShotStore for MemoryStore {
    async fn search_version_materialized(
        &self,
        pattern: &TriplePattern,
        version: i64,
    ) -> OstrichResult<Vec<Triple>> {
        Ok(self.ensure_open()?.materialized(pattern, version))
    }

    async fn search_delta_materialized(
        &self,
        pattern: &TriplePattern,
        version_start: i64,
        version_end: i64,
    ) -> OstrichResult<Vec<DeltaTriple>> {
        Ok(self.ensure_open()?.delta(pattern, version_start, version_end))
    }

    async fn search_version(&self, pattern: &TriplePattern) -> OstrichResult<Vec<VersionedTriple>> {
        Ok(self.ensure_open()?.versioned(pattern))
    }
}

/// Paginated store over an in-memory archive.
#[derive(Debug, Clone)]
pub struct PagedMemoryStore {
    inner: MemoryStore,
    page_size: usize,
}

impl PagedMemoryStore {
    /// Create a store serving `archive` in pages of `page_size` rows.
    pub fn new(path: impl Into<PathBuf>, archive: Arc<MemoryArchive>, page_size: usize) -> Self {
        Self {
            inner: MemoryStore::new(path, archive),
            page_size: page_size.max(1),
        }
    }

    fn cursor<T: Send + 'static>(&self, rows: Vec<T>) -> Box<dyn PageCursor<T>> {
        Box::new(VecCursor {
            rows: rows.into(),
            page_size: self.page_size,
            path: self.inner.path.clone(),
            closed: Arc::clone(&self.inner.closed),
        })
    }
}

#[async_trait]
impl ArchiveStore for PagedMemoryStore {
    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    async fn close(&self) -> OstrichResult<()> {
        self.inner.close().await
    }

    async fn count_version_materialized(
        &self,
        pattern: &TriplePattern,
        version: i64,
    ) -> OstrichResult<CountResult> {
        self.inner.count_version_materialized(pattern, version).await
    }

    async fn count_delta_materialized(
        &self,
        pattern: &TriplePattern,
        version_start: i64,
        version_end: i64,
    ) -> OstrichResult<CountResult> {
        self.inner
            .count_delta_materialized(pattern, version_start, version_end)
            .await
    }

    async fn count_version(&self, pattern: &TriplePattern) -> OstrichResult<CountResult> {
        self.inner.count_version(pattern).await
    }
}

impl PagedStore for PagedMemoryStore {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn cursor_version_materialized(
        &self,
        pattern: &TriplePattern,
        version: i64,
    ) -> OstrichResult<Box<dyn PageCursor<Triple>>> {
        let rows = self.inner.ensure_open()?.materialized(pattern, version);
        Ok(self.cursor(rows))
    }

    fn cursor_delta_materialized(
        &self,
        pattern: &TriplePattern,
        version_start: i64,
        version_end: i64,
    ) -> OstrichResult<Box<dyn PageCursor<DeltaTriple>>> {
        let rows = self
            .inner
            .ensure_open()?
            .delta(pattern, version_start, version_end);
        Ok(self.cursor(rows))
    }

    fn cursor_version(
        &self,
        pattern: &TriplePattern,
    ) -> OstrichResult<Box<dyn PageCursor<VersionedTriple>>> {
        let rows = self.inner.ensure_open()?.versioned(pattern);
        Ok(self.cursor(rows))
    }
}

/// Cursor handing out pre-computed rows a page at a time.
struct VecCursor<T> {
    rows: VecDeque<T>,
    page_size: usize,
    path: PathBuf,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl<T: Send + 'static> PageCursor<T> for VecCursor<T> {
    async fn next_page(&mut self) -> OstrichResult<Page<T>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(OstrichError::store_closed(&self.path));
        }
        let take = self.page_size.min(self.rows.len());
        let entries: Vec<T> = self.rows.drain(..take).collect();
        Ok(Page::new(entries, !self.rows.is_empty()))
    }
}
