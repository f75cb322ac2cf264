use log::warn;

/// Millisecond clock the game loop schedules against. Monotonic, starting
/// anywhere.
pub trait TimeDaemon {
    fn now_ms(&self) -> u64;
}

impl<T: TimeDaemon + ?Sized> TimeDaemon for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Elapsed-time frame scheduler.
///
/// A frame is due once strictly more than one period has passed since the
/// last frame mark. Each due frame moves the mark forward by exactly one
/// period, so a late loop catches up at most one frame per poll and never
/// skips chart frames.
#[derive(Debug, Clone)]
pub struct FrameClock {
    period_ms: u64,
    mark_ms: u64,
    slipped: bool,
}

impl FrameClock {
    pub const fn new(period_ms: u64, now_ms: u64) -> Self {
        Self { period_ms, mark_ms: now_ms, slipped: false }
    }

    /// Restarts the schedule from `now_ms`, e.g. on song start.
    pub fn restart(&mut self, now_ms: u64) {
        self.mark_ms = now_ms;
        self.slipped = false;
    }

    pub fn poll(&mut self, now_ms: u64) -> bool {
        if now_ms <= self.mark_ms + self.period_ms {
            return false;
        }

        self.mark_ms += self.period_ms;

        let behind = now_ms - self.mark_ms;
        if behind > self.period_ms * 2 {
            if !self.slipped {
                warn!("frame clock is {}ms behind, catching up one frame per pass", behind);
                self.slipped = true;
            }
        } else {
            self.slipped = false;
        }

        true
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Time of the most recent frame.
    pub fn mark_ms(&self) -> u64 {
        self.mark_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_strictly_after_one_period() {
        let mut clock = FrameClock::new(25, 1000);
        assert!(!clock.poll(1000));
        assert!(!clock.poll(1025));
        assert!(clock.poll(1026));
        assert_eq!(clock.mark_ms(), 1025);
        assert!(!clock.poll(1049));
    }

    #[test]
    fn catches_up_one_period_per_poll() {
        let mut clock = FrameClock::new(25, 0);
        let mut fired = 0;
        while clock.poll(101) {
            fired += 1;
        }
        assert_eq!(fired, 4);
        assert_eq!(clock.mark_ms(), 100);
    }

    #[test]
    fn restart_moves_the_mark() {
        let mut clock = FrameClock::new(25, 0);
        assert!(clock.poll(500));
        clock.restart(500);
        assert!(!clock.poll(520));
        assert!(clock.poll(526));
    }
}
