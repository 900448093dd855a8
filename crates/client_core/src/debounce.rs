//! Single-slot cancellable timer used to coalesce bursts of edits.

use std::{future::Future, time::Duration};

use tokio::task::JoinHandle;

/// Runs the most recently scheduled task once `delay` has passed without a newer one.
///
/// Scheduling aborts whatever is pending, including a task that already got past
/// its delay and is awaiting a request. Must be used from within a tokio runtime.
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|pending| !pending.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use tokio::time::{sleep, Instant};

    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_fires_once_after_last_edit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fired_at = Arc::new(Mutex::new(None));
        let mut debouncer = Debouncer::new(DELAY);

        let mut last_edit = Instant::now();
        for _ in 0..5 {
            let calls = Arc::clone(&calls);
            let fired_at = Arc::clone(&fired_at);
            last_edit = Instant::now();
            debouncer.schedule(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                *fired_at.lock().expect("lock") = Some(Instant::now());
            });
            sleep(Duration::from_millis(100)).await;
        }

        sleep(Duration::from_millis(300)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let fired_at = fired_at.lock().expect("lock").expect("task fired");
        let waited = fired_at.duration_since(last_edit);
        assert!(waited >= DELAY && waited < DELAY + Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_pending_task() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(DELAY);
        let counter = Arc::clone(&calls);
        debouncer.schedule(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(debouncer.is_pending());

        debouncer.cancel();
        sleep(DELAY * 2).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_debouncer_cancels() {
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let mut debouncer = Debouncer::new(DELAY);
            let counter = Arc::clone(&calls);
            debouncer.schedule(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        sleep(DELAY * 2).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn separate_bursts_fire_separately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(DELAY);
        for _ in 0..2 {
            let counter = Arc::clone(&calls);
            debouncer.schedule(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            sleep(DELAY + Duration::from_millis(50)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
