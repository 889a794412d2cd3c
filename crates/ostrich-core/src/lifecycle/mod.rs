//! Store lifecycle: one open store per archive path, shared by every query.
//!
//! Each resolved stream holds a [`QueryGuard`] while it runs. A close
//! requested while guards are alive is deferred; the last guard to drop
//! closes the stores. Closing twice is an error, while [`ArchiveManager::shutdown`]
//! never fails and is safe to call from teardown paths.

mod manager;
mod session;
mod shutdown;

pub use manager::{ArchiveManager, CloseOutcome, PendingOpen};
pub use session::QueryGuard;
pub use shutdown::install_ctrl_c_hook;
