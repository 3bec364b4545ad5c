use std::time::Duration;

use tokio::task::JoinHandle;

/// A one-shot task that runs `on_fire` after a delay unless cancelled.
#[derive(Debug)]
pub struct ExpiryTimer {
    id: u64,
    handle: JoinHandle<()>,
}

impl ExpiryTimer {
    /// Spawn the timer on the current Tokio runtime.
    pub fn spawn<F>(id: u64, duration: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            on_fire();
        });
        Self {
            id,
            handle,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_duration() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let timer = ExpiryTimer::spawn(1, Duration::from_millis(500), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(timer.id(), 1);

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let timer = ExpiryTimer::spawn(1, Duration::from_millis(500), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        timer.cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
