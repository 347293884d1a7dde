//! Monotonic timing source for request durations.

use std::time::{Duration, Instant};

/// Monotonic clock abstraction.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Time elapsed since `start`, clamped to zero if the clock went backwards.
    fn elapsed_since(&self, start: Instant) -> Duration {
        self.now().saturating_duration_since(start)
    }
}

/// `std::time::Instant` backed clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays a fixed sequence of instants.
    struct ScriptedClock(Mutex<Vec<Instant>>);

    impl Clock for ScriptedClock {
        fn now(&self) -> Instant {
            self.0.lock().unwrap().remove(0)
        }
    }

    #[test]
    fn test_elapsed_is_positive() {
        let clock = MonotonicClock;
        let start = clock.now();
        std::thread::sleep(Duration::from_millis(2));
        assert!(clock.elapsed_since(start) >= Duration::from_millis(2));
    }

    #[test]
    fn test_backwards_clock_clamps_to_zero() {
        let base = Instant::now() + Duration::from_secs(10);
        let clock = ScriptedClock(Mutex::new(vec![base - Duration::from_secs(5)]));
        assert_eq!(clock.elapsed_since(base), Duration::ZERO);
    }
}
