use std::{
    sync::{
        Arc,
        Condvar,
        Mutex,
    },
    time::{
        Duration,
        Instant,
    },
};

use crate::sync::lock;

/// Cooperative cancellation signal shared between a long running operation and its owner.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn cancel(&self) {
        let (cancelled, signal) = &*self.inner;
        *lock(cancelled) = true;
        signal.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *lock(&self.inner.0)
    }

    /// Sleep for the given duration or until cancelled.
    /// Returns true if the token has been cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (cancelled, signal) = &*self.inner;
        let deadline = Instant::now() + timeout;

        let mut cancelled = lock(cancelled);
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            cancelled = match signal.wait_timeout(cancelled, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }

        *cancelled
    }
}

#[cfg(test)]
mod test {
    use std::{
        thread,
        time::{
            Duration,
            Instant,
        },
    };

    use super::CancellationToken;

    #[test]
    fn wait_returns_early_on_cancel() {
        let token = CancellationToken::new();
        let worker = {
            let token = token.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let cancelled = token.wait_timeout(Duration::from_secs(30));
                (cancelled, start.elapsed())
            })
        };

        thread::sleep(Duration::from_millis(20));
        token.cancel();

        let (cancelled, elapsed) = worker.join().unwrap();
        assert!(cancelled);
        assert!(elapsed < Duration::from_secs(10));
    }

    #[test]
    fn wait_times_out() {
        let token = CancellationToken::new();
        assert!(!token.wait_timeout(Duration::from_millis(5)));
        assert!(!token.is_cancelled());
    }
}
