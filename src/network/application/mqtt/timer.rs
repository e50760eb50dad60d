//! Periodic timers driven by an external clock.

/// A monotonic millisecond clock.
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed origin.
    fn now_ms(&self) -> u64;
}

/// Wall-clock time since the clock was created.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    /// Start counting from now.
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// A periodic timer. `deadline` is `None` while the timer is stopped.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Timer {
    period_ms: u64,
    deadline: Option<u64>,
}

impl Timer {
    /// A stopped timer firing every `period_ms` once started.
    pub const fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            deadline: None,
        }
    }

    /// (Re)arm the timer, replacing any pending deadline.
    pub fn start(&mut self, now: u64) {
        self.deadline = Some(now + self.period_ms);
    }

    /// Stop the timer.
    pub fn stop(&mut self) {
        self.deadline = None;
    }

    /// Whether the timer is armed.
    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` once per elapsed period and schedules the next one.
    ///
    /// When several periods were missed the timer fires once and re-aligns
    /// on `now` instead of firing repeatedly to catch up.
    pub fn poll(&mut self, now: u64) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                let next = deadline + self.period_ms;
                self.deadline = Some(if next <= now { now + self.period_ms } else { next });
                true
            }
            _ => false,
        }
    }
}
