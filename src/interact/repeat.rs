//! Press-and-hold repeat timers
//!
//! `start` fires the action once immediately, then every
//! [`REPEAT_INTERVAL`] on a tokio task until `stop`. Tokens identify the
//! held control; restarting a token replaces its timer.

use std::collections::HashMap;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Delay between repeated invocations
pub const REPEAT_INTERVAL: Duration = Duration::from_millis(150);

/// Repeat timers keyed by control token
#[derive(Debug, Default)]
pub struct RepeatScheduler {
    timers: HashMap<String, JoinHandle<()>>,
}

impl RepeatScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` now and every [`REPEAT_INTERVAL`] until stopped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(&mut self, token: impl Into<String>, mut action: F)
    where
        F: FnMut() + Send + 'static,
    {
        let token = token.into();
        self.stop(&token);

        action();

        let first_tick = Instant::now() + REPEAT_INTERVAL;
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(first_tick, REPEAT_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                action();
            }
        });

        tracing::trace!(token = %token, "repeat started");
        self.timers.insert(token, handle);
    }

    /// Stop the timer for `token`; unknown tokens are ignored
    pub fn stop(&mut self, token: &str) {
        if let Some(handle) = self.timers.remove(token) {
            handle.abort();
            tracing::trace!(token, "repeat stopped");
        }
    }

    /// Stop every timer
    pub fn stop_all(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }

    /// Whether a timer is installed for `token`
    pub fn is_active(&self, token: &str) -> bool {
        self.timers.get(token).is_some_and(|h| !h.is_finished())
    }

    /// Number of installed timers
    pub fn active_count(&self) -> usize {
        self.timers.values().filter(|h| !h.is_finished()).count()
    }
}

impl Drop for RepeatScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn advance(ms: u64) {
        tokio::time::advance(Duration::from_millis(ms)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_immediately_then_repeats() {
        let mut scheduler = RepeatScheduler::new();
        let (count, action) = counter();

        scheduler.start("zoom-in-0", action);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        for _ in 0..3 {
            advance(150).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 4);

        scheduler.stop("zoom-in-0");
        advance(600).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
        assert!(!scheduler.is_active("zoom-in-0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_keeps_single_timer() {
        let mut scheduler = RepeatScheduler::new();
        let (count, first) = counter();
        let second = {
            let inner = Arc::clone(&count);
            move || {
                inner.fetch_add(1, Ordering::SeqCst);
            }
        };

        scheduler.start("zoom-in-0", first);
        scheduler.start("zoom-in-0", second);
        assert_eq!(scheduler.active_count(), 1);
        // One immediate call per start
        assert_eq!(count.load(Ordering::SeqCst), 2);

        advance(150).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        advance(150).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_tokens() {
        let mut scheduler = RepeatScheduler::new();
        let (zoom, zoom_action) = counter();
        let (pan, pan_action) = counter();

        scheduler.start("zoom-in-0", zoom_action);
        scheduler.start("pan-up-0", pan_action);
        assert_eq!(scheduler.active_count(), 2);

        advance(150).await;
        scheduler.stop("pan-up-0");
        advance(150).await;

        assert_eq!(zoom.load(Ordering::SeqCst), 3);
        assert_eq!(pan.load(Ordering::SeqCst), 2);
        scheduler.stop_all();
        assert_eq!(scheduler.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_unknown_token() {
        let mut scheduler = RepeatScheduler::new();
        scheduler.stop("never-started");
        assert_eq!(scheduler.active_count(), 0);
    }
}
