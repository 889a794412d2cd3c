//! Host teardown hook.

use tokio::task::JoinHandle;
use tracing::info;

use super::ArchiveManager;

/// Close `manager` when the process receives Ctrl-C.
///
/// The returned task can be aborted to remove the hook.
pub fn install_ctrl_c_hook(manager: ArchiveManager) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, closing archives");
            manager.shutdown().await;
        }
    })
}
