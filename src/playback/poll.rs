use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Recurring reconciliation timer owned by a player.
///
/// The first tick fires one period after `start`. `cancel` (or dropping the
/// handle) stops it; no tick starts after cancellation has been signalled.
/// Must be started from within a tokio runtime.
pub struct PollLoop {
    cancel: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl PollLoop {
    pub fn start<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (cancel, mut cancelled) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.changed() => break,
                    _ = interval.tick() => {
                        if *cancelled.borrow() {
                            break;
                        }
                        tick();
                    }
                }
            }
            log::debug!("Poll loop stopped");
        });

        log::debug!("Poll loop started ({:?})", period);
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stop the loop. Idempotent.
    pub fn cancel(&mut self) {
        let _ = self.cancel.send(true);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for PollLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_on_each_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let mut poll = PollLoop::start(Duration::from_millis(100), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_millis(100)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_millis(300)).await;
        settle().await;
        assert!(count.load(Ordering::SeqCst) >= 2);
        assert!(poll.is_running());

        poll.cancel();
        assert!(!poll.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn never_ticks_after_cancel() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let mut poll = PollLoop::start(Duration::from_millis(100), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::advance(Duration::from_millis(100)).await;
        settle().await;
        let seen = count.load(Ordering::SeqCst);

        poll.cancel();
        poll.cancel();
        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let poll = PollLoop::start(Duration::from_millis(50), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(poll);

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
