//! ostrich-core - Versioned triple pattern resolution over OSTRICH archives.
//!
//! This crate provides the temporal query contexts, the store-boundary
//! traits that archive backends implement, the query iterator that turns
//! store searches into quad streams, and the manager that owns one open
//! store per archive path.
//!
//! # Example
//!
//! ```ignore
//! use ostrich_core::{ArchiveManager, QuadPattern, QueryContext, ResolveAction, ResolverConfig, TemporalContext};
//!
//! let manager = ArchiveManager::new(opener, ResolverConfig::default());
//! let context = QueryContext::for_archive("/data/archive")
//!     .with_version(TemporalContext::delta(0, 2, true));
//!
//! let mut stream = manager.resolve(&ResolveAction::new(pattern, context)).await?;
//! println!("{:?}", stream.metadata().await?);
//! ```

pub mod config;
pub mod error;
pub mod iterator;
pub mod lifecycle;
pub mod source;
pub mod traits;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{ResolverConfig, ResolverConfigBuilder};
pub use error::{ErrorCode, OstrichError, OstrichResult};
pub use iterator::QueryIterator;
pub use lifecycle::{install_ctrl_c_hook, ArchiveManager, CloseOutcome, QueryGuard};
pub use source::{QuadSource, QuadStream};
pub use traits::{
    ArchiveOpener, ArchiveStore, OneShotStore, OpenOptions, PageCursor, PagedStore, StoreHandle,
    DEFAULT_PAGE_SIZE,
};
pub use types::{
    Cardinality, CardinalityKind, CountResult, DeltaTriple, GraphPattern, Page, QuadPattern, QueryContext, QueryMetadata,
    ResolveAction, SourceDescriptor, TemporalContext, TermPattern, TriplePattern, VersionedTriple,
    LATEST_VERSION,
};
