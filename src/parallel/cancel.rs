use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};

/// Cooperative cancellation shared by the caller, workers and reducers.
///
/// Cancelling sets a flag and disconnects a channel that blocked threads
/// select on, so every queue wait wakes up immediately. Clones share state.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    // dropped on cancel, disconnecting `signal`
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        let trigger = self
            .inner
            .trigger
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        drop(trigger);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Receiver that becomes disconnected once the token is cancelled.
    pub(crate) fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }

    /// Cancel the token if the current thread unwinds before the guard drops.
    pub(crate) fn cancel_on_panic(&self) -> PanicGuard<'_> {
        PanicGuard { token: self }
    }
}

pub(crate) struct PanicGuard<'a> {
    token: &'a CancelToken,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.token.cancel();
        }
    }
}
