//! Pull-driven, buffered stream of result quads over one store.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::{FutureExt, Stream};
use oxrdf::Quad;
use tracing::{debug, warn};

use crate::error::OstrichResult;
use crate::iterator::batch::{self, Batch, BatchSource};
use crate::traits::StoreHandle;
use crate::types::{TemporalContext, TriplePattern};

type PendingBatch = BoxFuture<'static, (Box<dyn BatchSource>, OstrichResult<Batch>)>;

enum ReadState {
    /// No fetch in flight; the batch source is parked here.
    Idle(Box<dyn BatchSource>),
    /// One fetch in flight; it owns the batch source until it resolves.
    Reading(PendingBatch),
    /// Terminal.
    Closed,
}

/// Lazily pulled sequence of result quads.
///
/// Nothing is fetched until the stream is polled. Each fetch pulls one batch
/// (a whole result list for one-shot stores, one page for paginated stores)
/// into an internal buffer, and at most one fetch is in flight at a time.
/// A fetch error is yielded once, after which the stream ends.
pub struct QueryIterator {
    store: StoreHandle,
    context: TemporalContext,
    state: ReadState,
    buffer: VecDeque<Quad>,
    exhausted: bool,
    fetches: usize,
}

impl QueryIterator {
    /// Create an iterator for `pattern` under `context`.
    pub fn new(store: StoreHandle, context: TemporalContext, pattern: TriplePattern) -> Self {
        let source = batch::for_store(&store, context, pattern);
        Self {
            store,
            context,
            state: ReadState::Idle(source),
            buffer: VecDeque::new(),
            exhausted: false,
            fetches: 0,
        }
    }

    /// The temporal context this iterator runs under.
    pub fn context(&self) -> TemporalContext {
        self.context
    }

    /// Whether the iterator has ended.
    pub fn is_closed(&self) -> bool {
        matches!(self.state, ReadState::Closed) && self.buffer.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches
    }

    /// End the iterator, dropping buffered quads and any fetch in flight.
    pub fn close(&mut self) {
        self.state = ReadState::Closed;
        self.buffer.clear();
    }

    fn start_fetch(&mut self, mut source: Box<dyn BatchSource>) {
        self.fetches += 1;
        let fut = async move {
            let result = source.next_batch().await;
            (source, result)
        };
        self.state = ReadState::Reading(fut.boxed());
    }
}

impl Stream for QueryIterator {
    type Item = OstrichResult<Quad>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if let Some(quad) = this.buffer.pop_front() {
                return Poll::Ready(Some(Ok(quad)));
            }

            match std::mem::replace(&mut this.state, ReadState::Closed) {
                ReadState::Closed => return Poll::Ready(None),
                ReadState::Idle(source) => {
                    if this.exhausted {
                        debug!(
                            mode = this.context.mode_name(),
                            fetches = this.fetches,
                            "Iterator exhausted"
                        );
                        continue;
                    }
                    // The store may have been closed by a deferred close.
                    if this.store.is_closed() {
                        debug!(
                            mode = this.context.mode_name(),
                            "Store closed before fetch, ending iterator"
                        );
                        continue;
                    }
                    this.start_fetch(source);
                }
                ReadState::Reading(mut fut) => match fut.poll_unpin(cx) {
                    Poll::Pending => {
                        this.state = ReadState::Reading(fut);
                        return Poll::Pending;
                    }
                    Poll::Ready((source, Ok(batch))) => {
                        debug!(
                            mode = this.context.mode_name(),
                            quads = batch.quads.len(),
                            exhausted = batch.exhausted,
                            "Fetched batch"
                        );
                        this.buffer.extend(batch.quads);
                        this.exhausted = batch.exhausted;
                        this.state = ReadState::Idle(source);
                    }
                    Poll::Ready((_, Err(e))) => {
                        warn!(
                            mode = this.context.mode_name(),
                            error = %e,
                            "Fetch failed, ending iterator"
                        );
                        this.buffer.clear();
                        return Poll::Ready(Some(Err(e)));
                    }
                },
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.buffer.len(), None)
    }
}

impl std::fmt::Debug for QueryIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryIterator")
            .field("context", &self.context)
            .field("buffered", &self.buffer.len())
            .field("exhausted", &self.exhausted)
            .field("fetches", &self.fetches)
            .finish()
    }
}
