//! Query session guard.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::manager::ManagerInner;

/// Holds one query session open on an [`ArchiveManager`](super::ArchiveManager).
///
/// The session ends exactly once: on [`release`](Self::release) or on drop,
/// whichever comes first.
pub struct QueryGuard {
    manager: Arc<ManagerInner>,
    archive: PathBuf,
}

impl QueryGuard {
    pub(crate) fn new(manager: Arc<ManagerInner>, archive: PathBuf) -> Self {
        Self { manager, archive }
    }

    /// Archive the session was opened against.
    pub fn archive(&self) -> &Path {
        &self.archive
    }

    /// End the session now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for QueryGuard {
    fn drop(&mut self) {
        self.manager.end_query(&self.archive);
    }
}

impl std::fmt::Debug for QueryGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryGuard")
            .field("archive", &self.archive)
            .finish()
    }
}
