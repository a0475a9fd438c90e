use web_time::Instant;

/// Result of polling a [`Timer`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    /// The timer is stopped, nothing was recomputed.
    Unchanged,
    /// Still running, with this many whole seconds left.
    Ticked(u32),
    /// Reached zero on this poll. Reported once, the timer is stopped afterwards.
    Expired,
}

impl TimerEvent {
    pub const fn is_expired(self) -> bool {
        matches!(self, Self::Expired)
    }
}

/// Countdown measured against wall-clock time.
///
/// The timer never sleeps or schedules anything: every [`Timer::update`] recomputes the
/// remaining time from the instant it was started, so polling frequency only affects how
/// soon a change is noticed.
#[derive(Clone, Debug)]
pub struct Timer {
    duration: u32,
    time_left: u32,
    start_time: Option<Instant>,
    is_running: bool,
}

impl Timer {
    pub fn new(duration: u32) -> Self {
        Self {
            duration,
            time_left: duration,
            start_time: None,
            is_running: false,
        }
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    /// Starts counting from `now`, no-op if already running.
    pub fn start_at(&mut self, now: Instant) {
        if !self.is_running {
            self.is_running = true;
            self.start_time = Some(now);
        }
    }

    /// Stops counting, freezing the remaining time.
    pub fn stop(&mut self) {
        self.is_running = false;
    }

    /// Restores the full duration, optionally switching to a new one, and stops.
    pub fn reset(&mut self, duration: Option<u32>) {
        if let Some(duration) = duration {
            self.duration = duration;
        }
        self.time_left = self.duration;
        self.is_running = false;
        self.start_time = None;
    }

    pub fn update(&mut self) -> TimerEvent {
        self.update_at(Instant::now())
    }

    /// Recomputes the remaining time as of `now`.
    pub fn update_at(&mut self, now: Instant) -> TimerEvent {
        let Some(start_time) = self.start_time.filter(|_| self.is_running) else {
            return TimerEvent::Unchanged;
        };

        let elapsed = now.saturating_duration_since(start_time).as_secs();
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.time_left = self.duration.saturating_sub(elapsed);

        if self.time_left == 0 {
            self.stop();
            log::debug!("Timer expired after {}s", self.duration);
            TimerEvent::Expired
        } else {
            log::trace!("Timer tick, {}s left", self.time_left);
            TimerEvent::Ticked(self.time_left)
        }
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn start_time(&self) -> Option<Instant> {
        self.start_time
    }

    pub fn is_expired(&self) -> bool {
        self.time_left == 0
    }

    /// Remaining time as `M:SS`.
    pub fn formatted_time(&self) -> String {
        format!("{}:{:02}", self.time_left / 60, self.time_left % 60)
    }

    /// Remaining time as a percentage of the duration, 0 for a zero-length timer.
    pub fn percentage_left(&self) -> f64 {
        if self.duration == 0 {
            return 0.0;
        }
        f64::from(self.time_left) / f64::from(self.duration) * 100.0
    }
}
