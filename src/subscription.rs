use std::fmt;

/// A guard for an event listener or media track.
///
/// The release action runs exactly once: on [`Subscription::release`] or,
/// failing that, when the guard is dropped.
pub struct Subscription {
    name: &'static str,
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Creates a guard that runs `release` when it is released or dropped.
    pub fn new(name: &'static str, release: impl FnOnce() + 'static) -> Self {
        Self {
            name,
            release: Some(Box::new(release)),
        }
    }

    /// Creates a guard for an event source with no way to unsubscribe.
    ///
    /// Handlers behind such a guard must check their own state before acting.
    pub fn detached(name: &'static str) -> Self {
        Self {
            name,
            release: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Releases the underlying listener now.
    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            tracing::debug!(subscription = self.name, "releasing subscription");
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("pending_release", &self.release.is_some())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::{cell::Cell, rc::Rc};

    /// Returns a subscription and a counter of how often it was released.
    pub(crate) fn counted(name: &'static str) -> (Subscription, Rc<Cell<u32>>) {
        let count = Rc::new(Cell::new(0));
        let inner = Rc::clone(&count);
        let sub = Subscription::new(name, move || inner.set(inner.get() + 1));
        (sub, count)
    }

    #[test]
    fn released_once_explicitly() {
        let (sub, count) = counted("orientation");
        sub.release();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn released_on_drop() {
        let (sub, count) = counted("orientation");
        {
            let _guard = sub;
        }
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn released_during_unwind() {
        let (sub, count) = counted("camera");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = sub;
            panic!("forced teardown");
        }));
        assert!(result.is_err());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn detached_has_nothing_to_release() {
        let sub = Subscription::detached("calibration");
        assert_eq!(sub.name(), "calibration");
        sub.release();
    }
}
