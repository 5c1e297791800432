//! Once-only asynchronous initialization
//!
//! [`AsyncSingleton`] runs an async factory at most once per instance, no
//! matter how many callers race on [`AsyncSingleton::get`]: every concurrent
//! caller waits on the same in-flight initialization, and the settled outcome
//! (value or error) is cached for all later callers. A failed factory is
//! never re-run; callers that need recovery must create a new holder.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::OnceCell;

/// Cached outcome of a singleton factory
type Settled<T, E> = std::result::Result<Arc<T>, Arc<E>>;

/// A process-scoped, once-only async initializer
///
/// Holds exactly one of: unresolved, in-flight, resolved, failed. Safe under
/// arbitrary concurrent invocation; the factory observes no duplicate side
/// effects (it may open sockets or read secrets).
pub struct AsyncSingleton<T, E> {
    cell: OnceCell<Settled<T, E>>,
}

impl<T, E> AsyncSingleton<T, E> {
    /// Create an unresolved holder; usable in `static` items
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// Resolve the singleton, running `factory` only if no caller has before
    ///
    /// The winning caller's factory runs to completion while every other
    /// concurrent caller awaits it; factories passed by losing callers are
    /// dropped unexecuted. Both success and failure are cached permanently.
    pub async fn get<F, Fut>(&self, factory: F) -> Settled<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.cell
            .get_or_init(|| async move { factory().await.map(Arc::new).map_err(Arc::new) })
            .await
            .clone()
    }

    /// The settled outcome, if initialization has completed
    pub fn peek(&self) -> Option<&Settled<T, E>> {
        self.cell.get()
    }

    /// Whether initialization has settled (successfully or not)
    pub fn is_settled(&self) -> bool {
        self.cell.initialized()
    }
}

impl<T, E> Default for AsyncSingleton<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> std::fmt::Debug for AsyncSingleton<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.cell.get() {
            None => "unresolved",
            Some(Ok(_)) => "resolved",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("AsyncSingleton").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn concurrent_callers_share_one_factory_run() {
        let singleton = Arc::new(AsyncSingleton::<u32, String>::new());
        let invocations = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let singleton = Arc::clone(&singleton);
            let invocations = Arc::clone(&invocations);
            tasks.push(tokio::spawn(async move {
                singleton
                    .get(|| async move {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        // Widen the race window so callers pile up in-flight.
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok::<_, String>(7)
                    })
                    .await
            }));
        }

        for task in tasks {
            let value = task.await.unwrap().unwrap();
            assert_eq!(*value, 7);
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_is_cached_and_never_retried() {
        let singleton = AsyncSingleton::<u32, String>::new();

        let first = singleton
            .get(|| async { Err::<u32, _>("boom".to_string()) })
            .await;
        assert_eq!(*first.unwrap_err(), "boom");

        // A later caller with a factory that would succeed still sees the
        // cached failure.
        let second = singleton.get(|| async { Ok::<_, String>(1) }).await;
        assert_eq!(*second.unwrap_err(), "boom");
        assert!(singleton.is_settled());
    }

    #[tokio::test]
    async fn resolved_value_is_identical_for_all_callers() {
        let singleton = AsyncSingleton::<Vec<u8>, String>::new();

        let a = singleton
            .get(|| async { Ok::<_, String>(vec![1, 2, 3]) })
            .await
            .unwrap();
        let b = singleton
            .get(|| async { Ok::<_, String>(vec![9, 9, 9]) })
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
