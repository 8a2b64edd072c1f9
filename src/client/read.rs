//! Polled contract reads.
//!
//! A [`PolledRead`] owns a background task that re-runs one fetch on a fixed
//! interval and publishes the latest [`ReadState`] over a watch channel. A
//! read whose inputs are missing (no wallet, no contest selected) is
//! `Disabled` and never touches the RPC.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadState<T> {
    Disabled,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> ReadState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            ReadState::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ReadState::Loading)
    }
}

pub struct PolledRead<T> {
    label: &'static str,
    rx: watch::Receiver<ReadState<T>>,
    refresh: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl<T> PolledRead<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn disabled(label: &'static str) -> Self {
        let (_tx, rx) = watch::channel(ReadState::Disabled);
        Self {
            label,
            rx,
            refresh: Arc::new(Notify::new()),
            task: None,
        }
    }

    /// Poll `fetch` every `every`, starting immediately.
    pub fn spawn<F, Fut, E>(label: &'static str, every: Duration, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (tx, rx) = watch::channel(ReadState::Loading);
        let refresh = Arc::new(Notify::new());
        let notify = refresh.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = notify.notified() => {
                        debug!(read = label, "invalidated, refetching");
                        ticker.reset();
                    }
                }
                let next = match fetch().await {
                    Ok(value) => ReadState::Ready(value),
                    Err(e) => {
                        warn!(read = label, error = %e, "polled read failed");
                        ReadState::Failed(e.to_string())
                    }
                };
                if tx.send(next).is_err() {
                    break;
                }
            }
        });

        Self {
            label,
            rx,
            refresh,
            task: Some(task),
        }
    }

    /// Like [`PolledRead::spawn`], but `Disabled` when `args` is `None`.
    pub fn spawn_with<A, F, Fut, E>(
        label: &'static str,
        every: Duration,
        args: Option<A>,
        fetch: F,
    ) -> Self
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        match args {
            Some(args) => Self::spawn(label, every, move || fetch(args.clone())),
            None => Self::disabled(label),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn state(&self) -> ReadState<T> {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReadState<T>> {
        self.rx.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.task.is_some()
    }

    /// Refetch now instead of waiting for the next tick.
    pub fn invalidate(&self) {
        if self.task.is_some() {
            self.refresh.notify_one();
        }
    }
}

impl<T> Drop for PolledRead<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetch(
        calls: Arc<AtomicUsize>,
    ) -> impl Fn() -> std::future::Ready<Result<usize, String>> + Send + 'static {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(Ok(n))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_is_immediate_then_periodic() {
        let calls = Arc::new(AtomicUsize::new(0));
        let read = PolledRead::spawn("count", Duration::from_secs(10), counting_fetch(calls.clone()));
        let mut rx = read.subscribe();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ReadState::Ready(1));

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ReadState::Ready(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_never_fetches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = counting_fetch(calls.clone());
        let read: PolledRead<usize> = PolledRead::spawn_with(
            "balance",
            Duration::from_secs(1),
            None::<u8>,
            move |_| fetch(),
        );
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(read.state(), ReadState::Disabled);
        assert!(!read.is_enabled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_refetches_before_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let read = PolledRead::spawn("count", Duration::from_secs(60), counting_fetch(calls.clone()));
        let mut rx = read.subscribe();
        rx.changed().await.unwrap();
        rx.borrow_and_update();

        let start = tokio::time::Instant::now();
        read.invalidate();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ReadState::Ready(2));
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_reported_and_recovers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let read = PolledRead::spawn("flaky", Duration::from_secs(5), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if n == 0 {
                Err("rpc timeout".to_string())
            } else {
                Ok(n)
            })
        });
        let mut rx = read.subscribe();

        rx.changed().await.unwrap();
        assert_eq!(
            *rx.borrow_and_update(),
            ReadState::Failed("rpc timeout".to_string())
        );
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ReadState::Ready(1));
    }

    #[test]
    fn test_ready_accessor() {
        assert_eq!(ReadState::Ready(3).ready(), Some(&3));
        assert_eq!(ReadState::<u8>::Loading.ready(), None);
        assert!(ReadState::<u8>::Loading.is_loading());
    }
}
