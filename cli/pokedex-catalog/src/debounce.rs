//! Delay publishing a value until it stops changing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

/// Delay applied to search input before the visible items are recomputed.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Publishes the last pushed value once no other value was pushed for
/// `delay`.
///
/// [Debouncer::push] must be called from within a tokio runtime.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    generation: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
    published: Arc<watch::Sender<T>>,
}

impl<T> Debouncer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(delay: Duration, initial: T) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
            published: Arc::new(sender),
        }
    }

    /// Schedule `value` for publication, superseding any value that is
    /// still waiting.
    pub fn push(&mut self, value: T) {
        self.cancel();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let current = Arc::clone(&self.generation);
        let published = Arc::clone(&self.published);
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if current.load(Ordering::SeqCst) == generation {
                published.send_replace(value);
            } else {
                trace!(generation, "dropping superseded value");
            }
        }));
    }

    /// Publish `value` right away, superseding any value that is still
    /// waiting.
    pub fn push_now(&mut self, value: T) {
        self.cancel();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.published.send_replace(value);
    }

    /// Drop the value that is still waiting, if any.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    /// The last published value.
    pub fn value(&self) -> T {
        self.published.borrow().clone()
    }

    /// Observe published values.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.published.subscribe()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn publishes_after_delay() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300), String::new());
        debouncer.push("pika".to_string());
        assert_eq!(debouncer.value(), "");

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(debouncer.value(), "");

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(debouncer.value(), "pika");
    }

    #[tokio::test(start_paused = true)]
    async fn only_last_value_is_published() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300), String::new());
        let mut updates = debouncer.subscribe();

        for term in ["c", "ch", "cha", "char"] {
            debouncer.push(term.to_string());
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(debouncer.value(), "");

        updates.changed().await.unwrap();
        assert_eq!(*updates.borrow_and_update(), "char");

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!updates.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn push_now_supersedes_pending_value() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300), 0);
        debouncer.push(1);
        debouncer.push_now(2);
        assert_eq!(debouncer.value(), 2);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(debouncer.value(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_value() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300), 0);
        debouncer.push(1);
        debouncer.cancel();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(debouncer.value(), 0);
    }
}
