use std::time::{Duration, Instant};

/// Single-slot trailing-edge debouncer.
///
/// Scheduling a value replaces whatever was pending and restarts the quiet
/// window. The owner polls it from its event loop with the current time.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Debouncer {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns true if a pending value was superseded.
    pub fn schedule(&mut self, value: T, now: Instant) -> bool {
        self.pending.replace((value, now + self.window)).is_some()
    }

    /// Take the pending value once its quiet window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let ready = self.deadline().is_some_and(|deadline| now >= deadline);
        if ready { self.cancel() } else { None }
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(300);

    #[test]
    fn fires_once_after_quiet_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        assert!(!debouncer.schedule("a", start));
        assert_eq!(debouncer.poll(start + Duration::from_millis(299)), None);
        assert_eq!(debouncer.poll(start + WINDOW), Some("a"));
        assert_eq!(debouncer.poll(start + WINDOW * 2), None);
    }

    #[test]
    fn rescheduling_restarts_the_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.schedule("a", start);
        assert!(debouncer.schedule("ab", start + Duration::from_millis(200)));
        // The original deadline passed, but the window restarted
        assert_eq!(debouncer.poll(start + Duration::from_millis(350)), None);
        assert_eq!(debouncer.poll(start + Duration::from_millis(500)), Some("ab"));
    }

    #[test]
    fn cancel_drops_pending_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.schedule(1, start);
        assert_eq!(debouncer.deadline(), Some(start + WINDOW));
        assert_eq!(debouncer.cancel(), Some(1));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(start + WINDOW), None);
    }
}
