//! Elapsed-time display for a running generation.

use jiff::Timestamp;

/// Whole seconds since `start_time`.
///
/// Exactly `0` when not running or when no start time is known. This is a
/// clear, not a pause: a finished generation shows no elapsed time at all.
pub fn elapsed_seconds(start_time: Option<Timestamp>, is_running: bool, now: Timestamp) -> u64 {
    match (is_running, start_time) {
        (true, Some(start)) => u64::try_from(now.duration_since(start).as_secs()).unwrap_or(0),
        _ => 0,
    }
}

/// Stateful wrapper over [`elapsed_seconds`] for a ~1 Hz display.
///
/// While running against the same anchor the value never decreases, even if
/// the wall clock steps backwards. A new anchor starts again from its own
/// elapsed time; stopping resets to `0`.
#[derive(Debug, Default, Clone)]
pub struct ElapsedTicker {
    anchor: Option<Timestamp>,
    last: u64,
}

impl ElapsedTicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, start_time: Option<Timestamp>, is_running: bool, now: Timestamp) -> u64 {
        if !is_running || start_time.is_none() {
            self.anchor = None;
            self.last = 0;
            return 0;
        }
        if self.anchor != start_time {
            self.anchor = start_time;
            self.last = 0;
        }
        self.last = elapsed_seconds(start_time, true, now).max(self.last);
        self.last
    }

    /// The value returned by the latest [`ElapsedTicker::tick`].
    pub fn last(&self) -> u64 {
        self.last
    }
}
