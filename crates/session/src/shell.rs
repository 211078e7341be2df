//! Admin layout lifecycle

use crate::guard::{AdminGuard, GuardOutcome};
use crate::scheduler::SessionScheduler;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Admin layout: the admin guard in front, the expiry scheduler behind it
#[derive(Debug, Clone)]
pub struct AdminShell {
    guard: AdminGuard,
    scheduler: SessionScheduler,
}

impl AdminShell {
    pub const fn new(guard: AdminGuard, scheduler: SessionScheduler) -> Self {
        Self { guard, scheduler }
    }

    pub const fn scheduler(&self) -> &SessionScheduler {
        &self.scheduler
    }

    /// Run the guard for `path` and start the expiry timers once it renders
    pub async fn mount(&self, path: &str, cancel: &CancellationToken) -> GuardOutcome {
        let outcome = self.guard.check(path, cancel).await;
        if cancel.is_cancelled() {
            return GuardOutcome::Cancelled;
        }
        if outcome.is_render() {
            let state = self.scheduler.hydrate();
            debug!(path, ?state, "Admin layout mounted");
        }
        outcome
    }

    /// Tear down the timers when the layout goes away
    pub fn unmount(&self) {
        self.scheduler.disarm();
    }
}
