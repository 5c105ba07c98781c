//! Progress observers for long-running engine steps.

use tracing::{debug, info};

/// Receives status messages and progress updates from the engine.
///
/// The engine calls `progress` once per transformation while assigning and
/// once per point batch while rendering, always from the calling thread.
pub trait ProgressSink {
    /// A human-readable description of the current step.
    fn status(&mut self, message: &str);

    /// `current` out of `total` units of the current step are done.
    fn progress(&mut self, current: usize, total: usize);
}

/// Integer percentage in `0..=100`; an empty step counts as complete.
pub fn percent(current: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((current.min(total) as f64 / total as f64) * 100.0).round() as u8
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn status(&mut self, _message: &str) {}

    fn progress(&mut self, _current: usize, _total: usize) {}
}

/// Forwards updates to `tracing`, logging progress only when the
/// percentage changes.
#[derive(Debug, Clone, Default)]
pub struct TracingProgress {
    last_percent: Option<u8>,
}

impl TracingProgress {
    /// Create a sink with no progress reported yet.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for TracingProgress {
    fn status(&mut self, message: &str) {
        self.last_percent = None;
        info!("{message}");
    }

    fn progress(&mut self, current: usize, total: usize) {
        let pct = percent(current, total);
        if self.last_percent != Some(pct) {
            self.last_percent = Some(pct);
            debug!(current, total, percent = pct, "Progress");
        }
    }
}

/// Adapts a pair of closures, e.g. to drive a progress bar.
pub struct CallbackProgress<S, P>
where
    S: FnMut(&str),
    P: FnMut(u8),
{
    on_status: S,
    on_progress: P,
}

impl<S, P> CallbackProgress<S, P>
where
    S: FnMut(&str),
    P: FnMut(u8),
{
    /// `on_progress` receives percentages in `0..=100`.
    pub fn new(on_status: S, on_progress: P) -> Self {
        Self {
            on_status,
            on_progress,
        }
    }
}

impl<S, P> ProgressSink for CallbackProgress<S, P>
where
    S: FnMut(&str),
    P: FnMut(u8),
{
    fn status(&mut self, message: &str) {
        (self.on_status)(message);
    }

    fn progress(&mut self, current: usize, total: usize) {
        (self.on_progress)(percent(current, total));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 4), 0);
        assert_eq!(percent(1, 4), 25);
        assert_eq!(percent(4, 4), 100);
        assert_eq!(percent(9, 4), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn test_callback_progress() {
        let mut messages = Vec::new();
        let mut percents = Vec::new();
        {
            let mut sink = CallbackProgress::new(
                |m: &str| messages.push(m.to_string()),
                |p| percents.push(p),
            );
            sink.status("assigning");
            sink.progress(1, 2);
            sink.progress(2, 2);
        }
        assert_eq!(messages, vec!["assigning".to_string()]);
        assert_eq!(percents, vec![50, 100]);
    }
}
