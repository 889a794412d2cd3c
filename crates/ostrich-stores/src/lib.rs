//! ostrich-stores - Archive store implementations for ostrich.
//!
//! This crate provides an in-memory versioned archive together with the
//! one-shot and paginated stores that serve it, and an opener that maps
//! archive paths to registered archives.

mod archive;
mod opener;
mod store;

pub use archive::{MemoryArchive, MemoryArchiveBuilder};
pub use opener::MemoryArchiveOpener;
pub use store::{MemoryStore, PagedMemoryStore};

// Re-export core types
pub use ostrich_core::traits::{ArchiveOpener, ArchiveStore, OneShotStore, PagedStore, StoreHandle};
