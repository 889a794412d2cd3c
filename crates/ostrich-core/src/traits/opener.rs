//! Archive opener trait and open options.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OstrichResult;
use crate::traits::StoreHandle;

/// Default number of rows per page for buffered stores.
pub const DEFAULT_PAGE_SIZE: usize = 128;

/// Options passed to [`ArchiveOpener::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOptions {
    /// Open without write access.
    pub read_only: bool,
    /// Open a paginated store instead of a one-shot one.
    pub use_buffering: bool,
    /// Rows per page for paginated stores.
    pub page_size: usize,
}

impl OpenOptions {
    /// Read-only paginated store with the given page size.
    pub fn buffered(page_size: usize) -> Self {
        Self {
            read_only: true,
            use_buffering: true,
            page_size: page_size.max(1),
        }
    }

    /// Read-only one-shot store.
    pub fn unbuffered() -> Self {
        Self {
            read_only: true,
            use_buffering: false,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::buffered(DEFAULT_PAGE_SIZE)
    }
}

/// Opens versioned archives by path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArchiveOpener: Send + Sync {
    /// Open the archive at `path`.
    async fn open(&self, path: &Path, options: OpenOptions) -> OstrichResult<StoreHandle>;
}
