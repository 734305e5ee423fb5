use std::{
    sync::{Arc, Condvar, Mutex, PoisonError},
    time::Duration,
};

/// Stop request shared between the signal handler and the watch loop.
///
/// Once triggered it stays triggered, and every sleep taken through
/// [`Shutdown::wait_timeout`] returns early.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        let (requested, wake) = &*self.inner;
        *requested.lock().unwrap_or_else(PoisonError::into_inner) = true;
        wake.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self
            .inner
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Block for up to `duration`. Returns true if shutdown was requested.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let (requested, wake) = &*self.inner;
        let guard = requested.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = wake
            .wait_timeout_while(guard, duration, |requested| !*requested)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}
