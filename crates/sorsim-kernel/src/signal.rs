//! Actor-targeted stimuli: the task-world equivalent of a process signal.
//!
//! A [`Stimulus`] is a raisable flag with an async wait. Two are in use:
//! "stop" (raised once, never cleared — the actor drains out of its loop)
//! and "temporary leave" (raised by the director, consumed by the targeted
//! specialist via [`Stimulus::take`]).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug, Clone, Default)]
pub struct Stimulus {
    inner: Arc<StimulusInner>,
}

#[derive(Debug, Default)]
struct StimulusInner {
    raised: AtomicBool,
    notify: Notify,
}

impl Stimulus {
    pub fn new() -> Stimulus {
        Stimulus::default()
    }

    pub fn raise(&self) {
        self.inner.raised.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_raised(&self) -> bool {
        self.inner.raised.load(Ordering::SeqCst)
    }

    /// Consume a pending stimulus: returns `true` exactly once per raise
    /// window. Used by specialists to clear a temporary-leave request.
    pub fn take(&self) -> bool {
        self.inner.raised.swap(false, Ordering::SeqCst)
    }

    /// Wait until the stimulus is raised. Returns immediately when it
    /// already is. Does not consume.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_raised() {
                return;
            }
            notified.await;
        }
    }
}
