//! Progress reporting and cooperative cancellation for engine walks.
//!
//! The callback fires every [`PROGRESS_INTERVAL`] processed units and once
//! more at completion with exactly 100. Cancellation is checked before the
//! walk starts and at the same cadence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::warn;

use crate::model::Outcome;

/// Units processed between two progress callbacks.
pub const PROGRESS_INTERVAL: usize = 100;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Optional observers of a run.
#[derive(Default)]
pub struct RunHooks<'a> {
    progress: Option<Box<dyn FnMut(u8) + 'a>>,
    cancel: Option<CancelToken>,
}

impl<'a> RunHooks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress(mut self, f: impl FnMut(u8) + 'a) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn report(&mut self, percent: u8) {
        if let Some(f) = self.progress.as_mut() {
            f(percent);
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

impl std::fmt::Debug for RunHooks<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHooks")
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// `round(100 * processed / total)`, clamped to 100; 100 when `total` is 0.
pub fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (processed as f64 * 100.0 / total as f64).round();
    pct.min(100.0) as u8
}

/// Per-walk counter driving the hooks.
pub(crate) struct Tracker<'h, 'a> {
    hooks: &'h mut RunHooks<'a>,
    total: usize,
    processed: usize,
}

impl<'h, 'a> Tracker<'h, 'a> {
    pub(crate) fn new(hooks: &'h mut RunHooks<'a>, total: usize) -> Self {
        Self { hooks, total, processed: 0 }
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.hooks.cancelled()
    }

    /// Count one processed unit. Returns `false` when the walk must stop.
    pub(crate) fn advance(&mut self) -> bool {
        self.processed += 1;
        if self.processed % PROGRESS_INTERVAL == 0 {
            let pct = percent(self.processed, self.total);
            self.hooks.report(pct);
            if self.cancelled() {
                return false;
            }
        }
        true
    }

    pub(crate) fn finish(&mut self) {
        self.hooks.report(100);
    }

    pub(crate) fn aborted<T>(&self) -> Outcome<T> {
        warn!("walk cancelled after {} of {} units", self.processed, self.total);
        Outcome::Aborted {
            processed: self.processed,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_and_handles_zero_total() {
        assert_eq!(percent(0, 0), 100);
        assert_eq!(percent(0, 10), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(5, 3), 100);
    }

    #[test]
    fn tracker_reports_at_cadence_then_100() {
        let mut seen = Vec::new();
        {
            let mut hooks = RunHooks::new().on_progress(|p| seen.push(p));
            let mut tracker = Tracker::new(&mut hooks, 250);
            for _ in 0..250 {
                assert!(tracker.advance());
            }
            tracker.finish();
        }
        assert_eq!(seen, vec![40, 80, 100]);
    }

    #[test]
    fn tracker_stops_at_cadence_when_cancelled() {
        let token = CancelToken::new();
        let mut hooks = RunHooks::new().with_cancel(token.clone());
        let mut tracker = Tracker::new(&mut hooks, 1000);
        token.cancel();
        let stopped_at = (1..=1000).find(|_| !tracker.advance());
        assert_eq!(stopped_at, Some(PROGRESS_INTERVAL));
        assert_eq!(
            tracker.aborted::<()>(),
            Outcome::Aborted { processed: 100, total: 1000 }
        );
    }

    #[test]
    fn token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
