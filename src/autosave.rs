use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::gateway::PersistencePort;
use crate::session::DocumentSession;

/// Quiet period after the last edit before an autosave fires.
pub const AUTOSAVE_DEBOUNCE: Duration = Duration::from_secs(2);

/// Single-flight debounce timer. At most one pending fire exists; re-arming
/// cancels and restarts it, so a burst of edits coalesces into one autosave
/// carrying the document state at expiry.
///
/// The timer is an owned resource: `cancel` must run on session teardown so
/// no stale fire lands on a torn-down document.
pub struct AutosaveScheduler {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl AutosaveScheduler {
    pub fn new() -> Self {
        Self::with_delay(AUTOSAVE_DEBOUNCE)
    }

    pub fn with_delay(delay: Duration) -> Self {
        AutosaveScheduler { delay, pending: Mutex::new(None) }
    }

    /// (Re)start the debounce timer. Must be called from within a tokio
    /// runtime. The session generation is captured here; a `create_new` or
    /// `load_data` reset before expiry makes the fire a no-op.
    pub fn arm(&self, session: Arc<Mutex<DocumentSession>>, gateway: Arc<dyn PersistencePort>) {
        let mut pending = self.pending.lock();
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        let delay = self.delay;
        let generation = session.lock().generation();
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let snapshot = {
                let session = session.lock();
                if session.generation() != generation {
                    return;
                }
                session.current_document().cloned()
            };
            let Some(document) = snapshot else { return };

            // autosave is a safety net: failures are logged, never surfaced,
            // and session state is left untouched either way
            match gateway.auto_save(&document) {
                Ok(path) => tracing::debug!("autosaved to {}", path.display()),
                Err(e) => tracing::warn!("autosave failed: {}", e),
            }
        }));
    }

    /// Stop any pending timer without firing.
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }
}

impl Default for AutosaveScheduler {
    fn default() -> Self {
        Self::new()
    }
}
