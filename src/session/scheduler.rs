use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Single-flight, debounced rescan gate.
///
/// `request` arms (or re-arms) a deadline. `should_run` reports true once the
/// deadline has passed and no scan is running. Requests that arrive while a
/// scan is running leave the pending flag set so exactly one follow-up scan
/// runs after `finish`.
#[derive(Debug, Clone)]
pub struct RescanScheduler {
    debounce: Duration,
    pending: bool,
    deadline: Option<Instant>,
    running: bool,
}

impl Default for RescanScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl RescanScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: false,
            deadline: None,
            running: false,
        }
    }

    /// Note a relevant mutation at `now`. Each request pushes the deadline
    /// out, so a burst of mutations yields one scan.
    pub fn request(&mut self, now: Instant) {
        self.pending = true;
        self.deadline = Some(now + self.debounce);
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn should_run(&self, now: Instant) -> bool {
        !self.running && self.pending && self.deadline.is_some_and(|d| now >= d)
    }

    /// Claim the pending scan. Returns false when nothing is due.
    pub fn start(&mut self, now: Instant) -> bool {
        if !self.should_run(now) {
            return false;
        }
        self.pending = false;
        self.deadline = None;
        self.running = true;
        true
    }

    pub fn finish(&mut self) {
        self.running = false;
    }
}
