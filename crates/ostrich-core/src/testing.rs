//! Scripted in-process store used by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use oxrdf::{Literal, NamedNode, Quad, Triple};
use tokio::sync::Semaphore;

use crate::error::{OstrichError, OstrichResult};
use crate::traits::{ArchiveStore, OneShotStore, PageCursor, PagedStore, StoreHandle};
use crate::types::{
    parse_version_graph, CountResult, DeltaTriple, Page, TriplePattern, VersionedTriple,
};

pub(crate) fn triple(object: &str) -> Triple {
    Triple::new(
        NamedNode::new_unchecked("http://example.org/s"),
        NamedNode::new_unchecked("http://example.org/p"),
        Literal::new_simple_literal(object),
    )
}

pub(crate) fn quad_versions(quads: &[Quad]) -> Vec<u32> {
    quads
        .iter()
        .filter_map(|q| parse_version_graph(&q.graph_name))
        .collect()
}

#[derive(Clone, Default)]
struct Script {
    triples: Vec<Triple>,
    deltas: Vec<DeltaTriple>,
    versioned: Vec<VersionedTriple>,
    pages: Vec<Page<Triple>>,
    versioned_pages: Vec<Page<VersionedTriple>>,
    fail_after: Option<usize>,
    count: Option<CountResult>,
    count_error: bool,
    count_gate: Option<Arc<Semaphore>>,
}

#[derive(Default)]
struct Stats {
    closed: AtomicBool,
    fetches: AtomicUsize,
    search_calls: AtomicUsize,
    page_calls: AtomicUsize,
    count_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

/// Store that replays scripted results and records how it was used.
#[derive(Clone, Default)]
pub(crate) struct FakeStore {
    script: Script,
    stats: Arc<Stats>,
    page_size: usize,
}

impl FakeStore {
    pub(crate) fn new() -> Self {
        Self {
            page_size: 2,
            ..Default::default()
        }
    }

    pub(crate) fn with_triples(mut self, triples: Vec<Triple>) -> Self {
        self.script.triples = triples;
        self
    }

    pub(crate) fn with_deltas(mut self, deltas: Vec<DeltaTriple>) -> Self {
        self.script.deltas = deltas;
        self
    }

    pub(crate) fn with_versioned(mut self, versioned: Vec<VersionedTriple>) -> Self {
        self.script.versioned = versioned;
        self
    }

    pub(crate) fn with_pages(mut self, pages: Vec<Page<Triple>>) -> Self {
        self.script.pages = pages;
        self
    }

    pub(crate) fn with_versioned_pages(mut self, pages: Vec<Page<VersionedTriple>>) -> Self {
        self.script.versioned_pages = pages;
        self
    }

    /// Fail every search or page fetch after the first `n`.
    pub(crate) fn failing_after(mut self, n: usize) -> Self {
        self.script.fail_after = Some(n);
        self
    }

    pub(crate) fn with_count(mut self, count: CountResult) -> Self {
        self.script.count = Some(count);
        self
    }

    pub(crate) fn failing_count(mut self) -> Self {
        self.script.count_error = true;
        self
    }

    /// Make counts wait until the returned semaphore gets a permit.
    pub(crate) fn gated_count(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.script.count_gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub(crate) fn one_shot(&self) -> StoreHandle {
        StoreHandle::OneShot(Arc::new(self.clone()))
    }

    pub(crate) fn paged(&self, page_size: usize) -> StoreHandle {
        let mut store = self.clone();
        store.page_size = page_size;
        StoreHandle::Paged(Arc::new(store))
    }

    pub(crate) fn search_calls(&self) -> usize {
        self.stats.search_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn page_calls(&self) -> usize {
        self.stats.page_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn count_calls(&self) -> usize {
        self.stats.count_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.stats.close_calls.load(Ordering::SeqCst)
    }

    fn check_fetch(stats: &Stats, fail_after: Option<usize>) -> OstrichResult<()> {
        let done = stats.fetches.fetch_add(1, Ordering::SeqCst);
        match fail_after {
            Some(limit) if done >= limit => Err(OstrichError::fetch("injected fetch failure")),
            _ => Ok(()),
        }
    }

    fn paginate<T: Clone>(&self, scripted: &[Page<T>], rows: &[T]) -> VecDeque<Page<T>> {
        if !scripted.is_empty() {
            return scripted.iter().cloned().collect();
        }
        let chunks: Vec<&[T]> = rows.chunks(self.page_size.max(1)).collect();
        let last = chunks.len().saturating_sub(1);
        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| Page::new(chunk.to_vec(), i < last))
            .collect()
    }

    fn cursor<T: Clone + Send + 'static>(&self, pages: VecDeque<Page<T>>) -> Box<dyn PageCursor<T>> {
        Box::new(ScriptedCursor {
            pages,
            stats: Arc::clone(&self.stats),
            fail_after: self.script.fail_after,
        })
    }

    async fn counted(&self, rows: usize) -> OstrichResult<CountResult> {
        self.stats.count_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.script.count_gate {
            gate.acquire()
                .await
                .map_err(|e| OstrichError::internal(e.to_string()))?
                .forget();
        }
        if self.script.count_error {
            return Err(OstrichError::count("injected count failure"));
        }
        Ok(self
            .script
            .count
            .unwrap_or_else(|| CountResult::exact(rows as u64)))
    }
}

struct ScriptedCursor<T> {
    pages: VecDeque<Page<T>>,
    stats: Arc<Stats>,
    fail_after: Option<usize>,
}

#[async_trait]
impl<T: Send + 'static> PageCursor<T> for ScriptedCursor<T> {
    async fn next_page(&mut self) -> OstrichResult<Page<T>> {
        self.stats.page_calls.fetch_add(1, Ordering::SeqCst);
        FakeStore::check_fetch(&self.stats, self.fail_after)?;
        Ok(self
            .pages
            .pop_front()
            .unwrap_or_else(|| Page::last(Vec::new())))
    }
}

#[async_trait]
impl ArchiveStore for FakeStore {
    fn is_closed(&self) -> bool {
        self.stats.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) -> OstrichResult<()> {
        self.stats.close_calls.fetch_add(1, Ordering::SeqCst);
        self.stats.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn count_version_materialized(
        &self,
        _pattern: &TriplePattern,
        _version: i64,
    ) -> OstrichResult<CountResult> {
        self.counted(self.script.triples.len()).await
    }

    async fn count_delta_materialized(
        &self,
        _pattern: &TriplePattern,
        _version_start: i64,
        _version_end: i64,
    ) -> OstrichResult<CountResult> {
        self.counted(self.script.deltas.len()).await
    }

    async fn count_version(&self, _pattern: &TriplePattern) -> OstrichResult<CountResult> {
        self.counted(self.script.versioned.len()).await
    }
}

#[async_trait]
impl OneShotStore for FakeStore {
    async fn search_version_materialized(
        &self,
        _pattern: &TriplePattern,
        _version: i64,
    ) -> OstrichResult<Vec<Triple>> {
        self.stats.search_calls.fetch_add(1, Ordering::SeqCst);
        Self::check_fetch(&self.stats, self.script.fail_after)?;
        Ok(self.script.triples.clone())
    }

    async fn search_delta_materialized(
        &self,
        _pattern: &TriplePattern,
        _version_start: i64,
        _version_end: i64,
    ) -> OstrichResult<Vec<DeltaTriple>> {
        self.stats.search_calls.fetch_add(1, Ordering::SeqCst);
        Self::check_fetch(&self.stats, self.script.fail_after)?;
        Ok(self.script.deltas.clone())
    }

    async fn search_version(&self, _pattern: &TriplePattern) -> OstrichResult<Vec<VersionedTriple>> {
        self.stats.search_calls.fetch_add(1, Ordering::SeqCst);
        Self::check_fetch(&self.stats, self.script.fail_after)?;
        Ok(self.script.versioned.clone())
    }
}

impl PagedStore for FakeStore {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn cursor_version_materialized(
        &self,
        _pattern: &TriplePattern,
        _version: i64,
    ) -> OstrichResult<Box<dyn PageCursor<Triple>>> {
        Ok(self.cursor(self.paginate(&self.script.pages, &self.script.triples)))
    }

    fn cursor_delta_materialized(
        &self,
        _pattern: &TriplePattern,
        _version_start: i64,
        _version_end: i64,
    ) -> OstrichResult<Box<dyn PageCursor<DeltaTriple>>> {
        Ok(self.cursor(self.paginate(&[], &self.script.deltas)))
    }

    fn cursor_version(
        &self,
        _pattern: &TriplePattern,
    ) -> OstrichResult<Box<dyn PageCursor<VersionedTriple>>> {
        Ok(self.cursor(self.paginate(&self.script.versioned_pages, &self.script.versioned)))
    }
}
