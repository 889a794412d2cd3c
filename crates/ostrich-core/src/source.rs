//! Quad source over one open store and one temporal context.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{poll_fn, BoxFuture};
use futures::{FutureExt, Stream};
use oxrdf::Quad;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{OstrichError, OstrichResult};
use crate::iterator::QueryIterator;
use crate::lifecycle::QueryGuard;
use crate::traits::StoreHandle;
use crate::types::{CountResult, QuadPattern, QueryMetadata, TemporalContext, TriplePattern};

/// Answers quad patterns against one store under one temporal context.
#[derive(Debug, Clone)]
pub struct QuadSource {
    store: StoreHandle,
    context: TemporalContext,
}

impl QuadSource {
    /// Create a source.
    pub fn new(store: StoreHandle, context: TemporalContext) -> Self {
        Self { store, context }
    }

    /// The temporal context queries run under.
    pub fn context(&self) -> TemporalContext {
        self.context
    }

    /// The underlying store.
    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// Start matching `pattern`.
    ///
    /// Named graphs are rejected before the store is touched. Otherwise the
    /// returned stream has not fetched anything yet, while the count for the
    /// same pattern already runs on the tokio runtime when one is available
    /// (otherwise it runs when the stream is first polled); its outcome
    /// becomes the stream's metadata, or the stream's error if it fails.
    pub fn match_pattern(&self, pattern: &QuadPattern) -> OstrichResult<QuadStream> {
        if !pattern.graph.is_default_or_variable() {
            return Err(OstrichError::invalid_graph(
                "versioned archives only support triple patterns within the default graph or a variable",
            ));
        }

        let triple_pattern = pattern.triple_pattern();
        let iterator = QueryIterator::new(self.store.clone(), self.context, triple_pattern.clone());

        let source = self.clone();
        let count = async move { source.count(&triple_pattern).await }.boxed();
        let count = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => PendingCount::Spawned(runtime.spawn(count)),
            Err(_) => PendingCount::Inline(count),
        };

        Ok(QuadStream {
            iterator,
            metadata: MetadataState::Pending(count),
            guard: None,
            finished: false,
        })
    }

    /// Count triples matching `pattern` with the entry point of the active mode.
    pub async fn count(&self, pattern: &TriplePattern) -> OstrichResult<CountResult> {
        match self.context {
            TemporalContext::VersionMaterialization { version } => {
                self.store.count_version_materialized(pattern, version).await
            }
            TemporalContext::DeltaMaterialization {
                version_start,
                version_end,
                ..
            } => {
                self.store
                    .count_delta_materialized(pattern, version_start, version_end)
                    .await
            }
            TemporalContext::VersionQuery => self.store.count_version(pattern).await,
        }
    }
}

enum PendingCount {
    Spawned(JoinHandle<OstrichResult<CountResult>>),
    /// No runtime at match time; driven by the stream's own polls.
    Inline(BoxFuture<'static, OstrichResult<CountResult>>),
}

impl PendingCount {
    fn poll_count(&mut self, cx: &mut Context<'_>) -> Poll<OstrichResult<CountResult>> {
        match self {
            Self::Inline(fut) => fut.poll_unpin(cx),
            Self::Spawned(handle) => match Pin::new(handle).poll(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(join_err)) => Poll::Ready(Err(OstrichError::internal(format!(
                    "count task failed: {join_err}"
                )))),
            },
        }
    }
}

enum MetadataState {
    Pending(PendingCount),
    Ready(QueryMetadata),
    Failed(OstrichError),
}

/// Result stream of one match, with cardinality metadata.
///
/// No quad is yielded before the count settles. If the count fails, that
/// error is the stream's only item.
pub struct QuadStream {
    iterator: QueryIterator,
    metadata: MetadataState,
    guard: Option<QueryGuard>,
    finished: bool,
}

impl QuadStream {
    /// Wait for the cardinality metadata.
    pub async fn metadata(&mut self) -> OstrichResult<QueryMetadata> {
        poll_fn(|cx| self.poll_metadata(cx)).await
    }

    /// The metadata, if the count has already settled successfully.
    pub fn try_metadata(&self) -> Option<&QueryMetadata> {
        match &self.metadata {
            MetadataState::Ready(metadata) => Some(metadata),
            _ => None,
        }
    }

    /// Stop the stream early and release its query session.
    pub fn close(&mut self) {
        self.iterator.close();
        self.finish();
    }

    /// Whether the stream has ended.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn attach_guard(&mut self, guard: QueryGuard) {
        self.guard = Some(guard);
    }

    fn finish(&mut self) {
        self.finished = true;
        if let Some(guard) = self.guard.take() {
            guard.release();
        }
    }

    fn poll_metadata(&mut self, cx: &mut Context<'_>) -> Poll<OstrichResult<QueryMetadata>> {
        let settled = match &mut self.metadata {
            MetadataState::Ready(metadata) => return Poll::Ready(Ok(*metadata)),
            MetadataState::Failed(e) => return Poll::Ready(Err(e.clone())),
            MetadataState::Pending(count) => match count.poll_count(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok(count)) => MetadataState::Ready(count.into()),
                Poll::Ready(Err(e)) => MetadataState::Failed(e),
            },
        };

        match &settled {
            MetadataState::Ready(metadata) => debug!(
                cardinality = metadata.cardinality.value,
                kind = ?metadata.cardinality.kind,
                "Attached cardinality metadata"
            ),
            MetadataState::Failed(e) => warn!(error = %e, "Count failed, ending stream"),
            MetadataState::Pending(_) => {}
        }
        self.metadata = settled;
        self.poll_metadata(cx)
    }
}

impl Stream for QuadStream {
    type Item = OstrichResult<Quad>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.finished {
            return Poll::Ready(None);
        }

        match this.poll_metadata(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Err(e)) => {
                this.iterator.close();
                this.finish();
                return Poll::Ready(Some(Err(e)));
            }
            Poll::Ready(Ok(_)) => {}
        }

        match Pin::new(&mut this.iterator).poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(quad))) => Poll::Ready(Some(Ok(quad))),
            Poll::Ready(Some(Err(e))) => {
                this.finish();
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for QuadStream {
    fn drop(&mut self) {
        if let MetadataState::Pending(PendingCount::Spawned(handle)) = &self.metadata {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for QuadStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuadStream")
            .field("iterator", &self.iterator)
            .field("metadata", &self.try_metadata())
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing::{quad_versions, triple, FakeStore};
    use crate::types::{CardinalityKind, GraphPattern, TermPattern, VersionedTriple};
    use futures::StreamExt;
    use oxrdf::{GraphName, NamedNode};
    use std::time::Duration;

    fn any_pattern() -> QuadPattern {
        QuadPattern::new(
            TermPattern::variable("s"),
            TermPattern::variable("p"),
            TermPattern::variable("o"),
        )
    }

    #[tokio::test]
    async fn test_match_rejects_named_graph_before_store_calls() {
        let store = FakeStore::new().with_triples(vec![triple("a")]);
        let source = QuadSource::new(store.one_shot(), TemporalContext::version(0));

        let pattern = any_pattern().in_graph(GraphName::NamedNode(NamedNode::new_unchecked(
            "http://example.org/graph",
        )));
        let err = source.match_pattern(&pattern).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValInvalidGraph);
        assert_eq!(store.count_calls(), 0);
        assert_eq!(store.search_calls(), 0);
    }

    #[tokio::test]
    async fn test_match_accepts_variable_graph() {
        let store = FakeStore::new().with_triples(vec![triple("a")]);
        let source = QuadSource::new(store.one_shot(), TemporalContext::version(0));

        let pattern = any_pattern().in_graph(GraphPattern::Variable(oxrdf::Variable::new_unchecked("g")));
        let quads: Vec<_> = source.match_pattern(&pattern).unwrap().collect().await;
        assert_eq!(quads.len(), 1);
    }

    #[tokio::test]
    async fn test_metadata_before_consumption() {
        let store = FakeStore::new()
            .with_triples(vec![triple("a"), triple("b")])
            .with_count(CountResult::estimate(5));
        let source = QuadSource::new(store.one_shot(), TemporalContext::version(0));

        let mut stream = source.match_pattern(&any_pattern()).unwrap();
        let metadata = stream.metadata().await.unwrap();
        assert_eq!(metadata.cardinality.kind, CardinalityKind::Estimate);
        assert_eq!(metadata.cardinality.value, 5);
        assert_eq!(stream.try_metadata(), Some(&metadata));
        assert_eq!(store.search_calls(), 0);

        let quads: Vec<_> = stream.collect().await;
        assert_eq!(quads.len(), 2);
    }

    #[tokio::test]
    async fn test_no_items_before_count_settles() {
        let (store, gate) = FakeStore::new().with_triples(vec![triple("a")]).gated_count();
        let source = QuadSource::new(store.one_shot(), TemporalContext::version(0));
        let mut stream = source.match_pattern(&any_pattern()).unwrap();

        let early = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
        assert!(early.is_err(), "stream yielded before metadata was attached");
        assert!(stream.try_metadata().is_none());

        gate.add_permits(1);
        let quad = stream.next().await.unwrap().unwrap();
        assert_eq!(quad, triple("a").in_graph(GraphName::DefaultGraph));
        assert_eq!(
            stream.try_metadata().map(|m| m.cardinality.kind),
            Some(CardinalityKind::Exact)
        );
    }

    #[tokio::test]
    async fn test_count_failure_terminates_stream() {
        let store = FakeStore::new()
            .with_triples(vec![triple("a")])
            .failing_count();
        let source = QuadSource::new(store.one_shot(), TemporalContext::version(0));
        let mut stream = source.match_pattern(&any_pattern()).unwrap();

        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.code(), ErrorCode::StoreCountFailed);
        assert!(stream.next().await.is_none());
        assert!(stream.metadata().await.is_err());
        assert_eq!(store.search_calls(), 0);
    }

    #[tokio::test]
    async fn test_count_dispatches_per_mode() {
        let store = FakeStore::new()
            .with_triples(vec![triple("a")])
            .with_versioned(vec![
                VersionedTriple::new(triple("a"), vec![0]),
                VersionedTriple::new(triple("b"), vec![1]),
            ]);

        let vm = QuadSource::new(store.one_shot(), TemporalContext::version(0));
        assert_eq!(vm.count(&TriplePattern::any()).await.unwrap().cardinality, 1);

        let vq = QuadSource::new(store.paged(4), TemporalContext::VersionQuery);
        let count = vq.count(&TriplePattern::any()).await.unwrap();
        assert_eq!(count.cardinality, 2);
        assert!(count.exact_cardinality);
    }

    #[tokio::test]
    async fn test_version_query_stream() {
        let store = FakeStore::new().with_versioned(vec![
            VersionedTriple::new(triple("a"), vec![0, 1]),
            VersionedTriple::new(triple("b"), vec![3]),
        ]);
        let source = QuadSource::new(store.paged(1), TemporalContext::VersionQuery);

        let quads: Vec<Quad> = source
            .match_pattern(&any_pattern())
            .unwrap()
            .map(|q| q.unwrap())
            .collect()
            .await;
        assert_eq!(quad_versions(&quads), vec![0, 1, 3]);
    }

    #[test]
    fn test_match_without_tokio_runtime() {
        let store = FakeStore::new()
            .with_triples(vec![triple("a"), triple("b")])
            .with_count(CountResult::estimate(2));
        let source = QuadSource::new(store.one_shot(), TemporalContext::version(0));

        let (metadata, quads) = futures::executor::block_on(async {
            let mut stream = source.match_pattern(&any_pattern()).unwrap();
            let metadata = stream.metadata().await.unwrap();
            let quads: Vec<_> = stream.collect().await;
            (metadata, quads)
        });
        assert_eq!(metadata.cardinality.kind, CardinalityKind::Estimate);
        assert_eq!(quads.len(), 2);
        assert!(quads.iter().all(Result::is_ok));
        assert_eq!(store.count_calls(), 1);
    }

    #[test]
    fn test_count_failure_without_tokio_runtime() {
        let store = FakeStore::new()
            .with_triples(vec![triple("a")])
            .failing_count();
        let source = QuadSource::new(store.one_shot(), TemporalContext::version(0));

        let items: Vec<_> =
            futures::executor::block_on(source.match_pattern(&any_pattern()).unwrap().collect());
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
        assert_eq!(store.search_calls(), 0);
    }

    #[tokio::test]
    async fn test_close_ends_stream() {
        let store = FakeStore::new().with_triples(vec![triple("a"), triple("b")]);
        let source = QuadSource::new(store.paged(1), TemporalContext::version(0));
        let mut stream = source.match_pattern(&any_pattern()).unwrap();

        assert!(stream.next().await.is_some());
        stream.close();
        assert!(stream.is_finished());
        assert!(stream.next().await.is_none());
    }
}
