//! Versioned store traits and the handle that selects between them.

use std::sync::Arc;

use async_trait::async_trait;
use oxrdf::Triple;

use crate::error::OstrichResult;
use crate::types::{CountResult, DeltaTriple, Page, TriplePattern, VersionedTriple};

/// Operations every versioned store exposes, whatever its search style.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Whether the store has been closed.
    fn is_closed(&self) -> bool;

    /// Close the store.
    async fn close(&self) -> OstrichResult<()>;

    /// Count triples matching `pattern` at `version`.
    async fn count_version_materialized(
        &self,
        pattern: &TriplePattern,
        version: i64,
    ) -> OstrichResult<CountResult>;

    /// Count triples matching `pattern` that changed between two versions.
    async fn count_delta_materialized(
        &self,
        pattern: &TriplePattern,
        version_start: i64,
        version_end: i64,
    ) -> OstrichResult<CountResult>;

    /// Count triples matching `pattern` across all versions.
    async fn count_version(&self, pattern: &TriplePattern) -> OstrichResult<CountResult>;
}

/// Store whose searches resolve to the complete result list.
#[async_trait]
pub trait OneShotStore: ArchiveStore {
    /// Triples matching `pattern` at `version`.
    async fn search_version_materialized(
        &self,
        pattern: &TriplePattern,
        version: i64,
    ) -> OstrichResult<Vec<Triple>>;

    /// Triples matching `pattern` that changed between two versions.
    async fn search_delta_materialized(
        &self,
        pattern: &TriplePattern,
        version_start: i64,
        version_end: i64,
    ) -> OstrichResult<Vec<DeltaTriple>>;

    /// Triples matching `pattern` with the versions at which they held.
    async fn search_version(&self, pattern: &TriplePattern) -> OstrichResult<Vec<VersionedTriple>>;
}

/// Reusable cursor over a paginated search.
#[async_trait]
pub trait PageCursor<T: Send>: Send {
    /// Fetch the next page.
    async fn next_page(&mut self) -> OstrichResult<Page<T>>;
}

/// Store whose searches hand out page-at-a-time cursors.
pub trait PagedStore: ArchiveStore {
    /// Maximum number of rows per page.
    fn page_size(&self) -> usize;

    /// Cursor over triples matching `pattern` at `version`.
    fn cursor_version_materialized(
        &self,
        pattern: &TriplePattern,
        version: i64,
    ) -> OstrichResult<Box<dyn PageCursor<Triple>>>;

    /// Cursor over triples matching `pattern` that changed between two versions.
    fn cursor_delta_materialized(
        &self,
        pattern: &TriplePattern,
        version_start: i64,
        version_end: i64,
    ) -> OstrichResult<Box<dyn PageCursor<DeltaTriple>>>;

    /// Cursor over triples matching `pattern` with their versions.
    fn cursor_version(
        &self,
        pattern: &TriplePattern,
    ) -> OstrichResult<Box<dyn PageCursor<VersionedTriple>>>;
}

/// An open store, either one-shot or paginated.
#[derive(Clone)]
pub enum StoreHandle {
    OneShot(Arc<dyn OneShotStore>),
    Paged(Arc<dyn PagedStore>),
}

impl StoreHandle {
    /// Whether the store is paginated.
    pub fn is_paged(&self) -> bool {
        matches!(self, Self::Paged(_))
    }

    /// Whether the underlying store has been closed.
    pub fn is_closed(&self) -> bool {
        match self {
            Self::OneShot(store) => store.is_closed(),
            Self::Paged(store) => store.is_closed(),
        }
    }

    /// Close the underlying store.
    pub async fn close(&self) -> OstrichResult<()> {
        match self {
            Self::OneShot(store) => store.close().await,
            Self::Paged(store) => store.close().await,
        }
    }

    /// Count triples matching `pattern` at `version`.
    pub async fn count_version_materialized(
        &self,
        pattern: &TriplePattern,
        version: i64,
    ) -> OstrichResult<CountResult> {
        match self {
            Self::OneShot(store) => store.count_version_materialized(pattern, version).await,
            Self::Paged(store) => store.count_version_materialized(pattern, version).await,
        }
    }

    /// Count triples matching `pattern` that changed between two versions.
    pub async fn count_delta_materialized(
        &self,
        pattern: &TriplePattern,
        version_start: i64,
        version_end: i64,
    ) -> OstrichResult<CountResult> {
        match self {
            Self::OneShot(store) => {
                store
                    .count_delta_materialized(pattern, version_start, version_end)
                    .await
            }
            Self::Paged(store) => {
                store
                    .count_delta_materialized(pattern, version_start, version_end)
                    .await
            }
        }
    }

    /// Count triples matching `pattern` across all versions.
    pub async fn count_version(&self, pattern: &TriplePattern) -> OstrichResult<CountResult> {
        match self {
            Self::OneShot(store) => store.count_version(pattern).await,
            Self::Paged(store) => store.count_version(pattern).await,
        }
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_paged() { "Paged" } else { "OneShot" };
        f.debug_struct("StoreHandle")
            .field("kind", &kind)
            .field("closed", &self.is_closed())
            .finish()
    }
}
