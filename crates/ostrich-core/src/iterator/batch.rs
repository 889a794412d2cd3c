//! Batch pulling strategies, one per store kind.

use std::sync::Arc;

use async_trait::async_trait;
use oxrdf::{Quad, Triple};
use tracing::debug;

use crate::error::OstrichResult;
use crate::iterator::shape;
use crate::traits::{OneShotStore, PageCursor, PagedStore, StoreHandle};
use crate::types::{DeltaTriple, TemporalContext, TriplePattern, VersionedTriple};

/// Quads produced by one pull.
#[derive(Debug, Default)]
pub(crate) struct Batch {
    pub quads: Vec<Quad>,
    /// No pull after this one can produce anything.
    pub exhausted: bool,
}

/// Pulls one batch of result quads from a store.
#[async_trait]
pub(crate) trait BatchSource: Send {
    async fn next_batch(&mut self) -> OstrichResult<Batch>;
}

/// Pick the strategy matching the store kind.
pub(crate) fn for_store(
    store: &StoreHandle,
    context: TemporalContext,
    pattern: TriplePattern,
) -> Box<dyn BatchSource> {
    match store {
        StoreHandle::OneShot(store) => Box::new(OneShotBatches {
            store: Arc::clone(store),
            context,
            pattern,
        }),
        StoreHandle::Paged(store) => Box::new(PagedBatches {
            store: Arc::clone(store),
            context,
            pattern,
            cursor: None,
        }),
    }
}

/// One search call delivers everything.
struct OneShotBatches {
    store: Arc<dyn OneShotStore>,
    context: TemporalContext,
    pattern: TriplePattern,
}

#[async_trait]
impl BatchSource for OneShotBatches {
    async fn next_batch(&mut self) -> OstrichResult<Batch> {
        let quads = match self.context {
            TemporalContext::VersionMaterialization { version } => {
                let triples = self
                    .store
                    .search_version_materialized(&self.pattern, version)
                    .await?;
                shape::materialized(triples)
            }
            TemporalContext::DeltaMaterialization {
                version_start,
                version_end,
                query_additions,
            } => {
                let rows = self
                    .store
                    .search_delta_materialized(&self.pattern, version_start, version_end)
                    .await?;
                shape::delta(rows, query_additions)
            }
            TemporalContext::VersionQuery => {
                let rows = self.store.search_version(&self.pattern).await?;
                shape::versioned(rows)
            }
        };

        Ok(Batch {
            quads,
            exhausted: true,
        })
    }
}

/// Cursor opened for the active query mode.
enum ModeCursor {
    Materialized(Box<dyn PageCursor<Triple>>),
    Delta {
        cursor: Box<dyn PageCursor<DeltaTriple>>,
        query_additions: bool,
    },
    Versioned(Box<dyn PageCursor<VersionedTriple>>),
}

/// Page-at-a-time pulls over a cursor kept across calls.
struct PagedBatches {
    store: Arc<dyn PagedStore>,
    context: TemporalContext,
    pattern: TriplePattern,
    cursor: Option<ModeCursor>,
}

impl PagedBatches {
    fn open_cursor(&self) -> OstrichResult<ModeCursor> {
        let cursor = match self.context {
            TemporalContext::VersionMaterialization { version } => ModeCursor::Materialized(
                self.store
                    .cursor_version_materialized(&self.pattern, version)?,
            ),
            TemporalContext::DeltaMaterialization {
                version_start,
                version_end,
                query_additions,
            } => ModeCursor::Delta {
                cursor: self.store.cursor_delta_materialized(
                    &self.pattern,
                    version_start,
                    version_end,
                )?,
                query_additions,
            },
            TemporalContext::VersionQuery => {
                ModeCursor::Versioned(self.store.cursor_version(&self.pattern)?)
            }
        };
        debug!(
            mode = self.context.mode_name(),
            page_size = self.store.page_size(),
            "Opened page cursor"
        );
        Ok(cursor)
    }
}

#[async_trait]
impl BatchSource for PagedBatches {
    async fn next_batch(&mut self) -> OstrichResult<Batch> {
        if self.cursor.is_none() {
            self.cursor = Some(self.open_cursor()?);
        }
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(Batch {
                quads: Vec::new(),
                exhausted: true,
            });
        };

        // Version-query pages may expand to more quads than rows; completion
        // follows the cursor's own flag, never the quad count.
        let (quads, has_more) = match cursor {
            ModeCursor::Materialized(cursor) => {
                let page = cursor.next_page().await?;
                (shape::materialized(page.entries), page.has_more)
            }
            ModeCursor::Delta {
                cursor,
                query_additions,
            } => {
                let page = cursor.next_page().await?;
                (shape::delta(page.entries, *query_additions), page.has_more)
            }
            ModeCursor::Versioned(cursor) => {
                let page = cursor.next_page().await?;
                (shape::versioned(page.entries), page.has_more)
            }
        };

        Ok(Batch {
            quads,
            exhausted: !has_more,
        })
    }
}
