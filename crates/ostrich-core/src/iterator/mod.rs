//! Query iterator: bridges store searches to an async stream of quads.
//!
//! The iterator dispatches on the temporal context once per fetch and on the
//! store kind once at construction:
//!
//! - **One-shot stores** answer with the whole result list; the iterator
//!   ends after that single fetch.
//! - **Paginated stores** hand out a cursor that is opened on the first
//!   fetch and reused until it reports no more rows.
//!
//! Rows are shaped per mode: materialized triples pass through, delta rows
//! are filtered on their addition flag, and version-query rows expand to one
//! version-stamped quad per version.

mod batch;
mod shape;
mod stream;

pub use stream::QueryIterator;
