/// Repeating interval gate driven by frame deltas.
///
/// Fires at most once per `update`. On firing the interval is subtracted from
/// the accumulator, so the remainder carries into the next period. Whole
/// intervals beyond that are dropped rather than owed, which keeps the
/// accumulator below one interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepeatTimer {
    interval: f32,
    accumulator: f32,
}

impl RepeatTimer {
    /// An interval `<= 0` yields a timer that never fires.
    pub fn new(interval_secs: f32) -> Self {
        RepeatTimer {
            interval: interval_secs,
            accumulator: 0.0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.interval > 0.0
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    pub fn accumulated(&self) -> f32 {
        self.accumulator
    }

    pub fn update(&mut self, delta_secs: f32) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.accumulator += delta_secs.max(0.0);
        if self.accumulator >= self.interval {
            self.accumulator -= self.interval;
            if self.accumulator >= self.interval {
                self.accumulator %= self.interval;
            }
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
