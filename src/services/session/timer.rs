use std::time::Duration;

use tokio::sync::watch;

/// Per-session countdown driven by elapsed one-second sleeps rather than a
/// wall-clock deadline, so a suspended runtime pauses the exam clock with it.
///
/// `on_tick(remaining)` runs after every elapsed second; `on_expire` runs
/// exactly once when the count reaches zero. A stopped (or dropped) handle
/// produces no further callbacks.
pub(crate) struct TimerHandle {
    cancel: Option<watch::Sender<bool>>,
}

impl TimerHandle {
    pub(crate) fn stop(&self) {
        if let Some(cancel) = &self.cancel {
            let _ = cancel.send(true);
        }
    }
}

pub(crate) fn start(
    duration_seconds: u32,
    mut on_tick: impl FnMut(u32) + Send + 'static,
    on_expire: impl FnOnce() + Send + 'static,
) -> TimerHandle {
    if duration_seconds == 0 {
        on_expire();
        return TimerHandle { cancel: None };
    }

    let (cancel_tx, mut cancel_rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut on_expire = Some(on_expire);
        let mut remaining = duration_seconds;

        loop {
            tokio::select! {
                changed = cancel_rx.changed() => {
                    // stop() was called, or the handle was dropped
                    let _ = changed;
                    return;
                }
                _ = tokio::time::sleep(Duration::from_secs(1)) => {
                    remaining = remaining.saturating_sub(1);
                    on_tick(remaining);
                    if remaining == 0 {
                        if let Some(expire) = on_expire.take() {
                            expire();
                        }
                        return;
                    }
                }
            }
        }
    });

    TimerHandle { cancel: Some(cancel_tx) }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    struct Probe {
        ticks: AtomicU32,
        last_remaining: AtomicU32,
        expired: AtomicBool,
    }

    impl Probe {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                ticks: AtomicU32::new(0),
                last_remaining: AtomicU32::new(u32::MAX),
                expired: AtomicBool::new(false),
            })
        }
    }

    fn spawn_probe(duration: u32, probe: &Arc<Probe>) -> TimerHandle {
        let tick_probe = Arc::clone(probe);
        let expire_probe = Arc::clone(probe);
        start(
            duration,
            move |remaining| {
                tick_probe.ticks.fetch_add(1, Ordering::SeqCst);
                tick_probe.last_remaining.store(remaining, Ordering::SeqCst);
            },
            move || {
                expire_probe.expired.store(true, Ordering::SeqCst);
            },
        )
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn five_second_timer_expires_after_five_seconds_not_four() {
        let probe = Probe::new();
        let _handle = spawn_probe(5, &probe);

        tokio::time::sleep(Duration::from_secs(4)).await;
        settle().await;
        assert_eq!(probe.ticks.load(Ordering::SeqCst), 4);
        assert_eq!(probe.last_remaining.load(Ordering::SeqCst), 1);
        assert!(!probe.expired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(probe.ticks.load(Ordering::SeqCst), 5);
        assert_eq!(probe.last_remaining.load(Ordering::SeqCst), 0);
        assert!(probe.expired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_expiry_and_further_ticks() {
        let probe = Probe::new();
        let handle = spawn_probe(3, &probe);

        tokio::time::sleep(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(probe.ticks.load(Ordering::SeqCst), 1);

        handle.stop();
        settle().await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(probe.ticks.load(Ordering::SeqCst), 1);
        assert!(!probe.expired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels_the_countdown() {
        let probe = Probe::new();
        let handle = spawn_probe(3, &probe);
        drop(handle);
        settle().await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(probe.ticks.load(Ordering::SeqCst), 0);
        assert!(!probe.expired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_expires_synchronously_without_ticks() {
        let probe = Probe::new();
        let _handle = spawn_probe(0, &probe);

        assert!(probe.expired.load(Ordering::SeqCst));
        assert_eq!(probe.ticks.load(Ordering::SeqCst), 0);
    }
}
