//! Fire-once settle timers.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Runs the most recently scheduled job after `delay` of quiet.
///
/// Scheduling replaces (and cancels) whatever was pending. Cancellation only
/// reaches a timer that has not fired: once the job has started it runs to
/// completion, and callers discard stale results themselves.
pub struct Debouncer {
    delay: Duration,
    pending: Option<Timer>,
}

struct Timer {
    handle: JoinHandle<()>,
    fired: Arc<AtomicBool>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn schedule<F>(&mut self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            flag.store(true, Ordering::SeqCst);
            job.await;
        });
        self.pending = Some(Timer { handle, fired });
    }

    /// Abort the pending timer if it has not fired yet. Returns whether a
    /// timer was actually cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(timer) if !timer.fired.load(Ordering::SeqCst) => {
                timer.handle.abort();
                true
            }
            _ => false,
        }
    }

    /// A timer is armed and has not fired.
    #[cfg(test)]
    fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|t| !t.fired.load(Ordering::SeqCst) && !t.handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn bump(count: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let count = Arc::clone(count);
        async move {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_quiet_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        debouncer.schedule(bump(&count));
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_job() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        debouncer.schedule(bump(&count));
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.schedule(bump(&count));

        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_and_after_firing() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.schedule(bump(&count));
        assert!(debouncer.cancel());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        debouncer.schedule(bump(&count));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let mut debouncer = Debouncer::new(Duration::from_millis(10));
            debouncer.schedule(bump(&count));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
