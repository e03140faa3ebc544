//! Load-once guard for lazily initialized backends

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

/// Resources initialized at most once per key.
///
/// Concurrent callers for the same key wait for the first load instead
/// of starting their own. A failed load leaves the key empty so a later
/// call can retry.
#[derive(Debug)]
pub struct LoadOnce<T> {
    cells: Mutex<HashMap<String, Arc<OnceCell<T>>>>,
}

impl<T> Default for LoadOnce<T> {
    fn default() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> LoadOnce<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: &str) -> Arc<OnceCell<T>> {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            cells
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        )
    }

    /// Value for `key`, running `load` if nothing is cached yet
    pub async fn get_or_load<F, Fut, E>(&self, key: &str, load: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let cell = self.cell(key);
        cell.get_or_try_init(load).await.cloned()
    }

    /// Cached value for `key`, if loaded
    pub fn get(&self, key: &str) -> Option<T> {
        let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.get(key).and_then(|cell| cell.get().cloned())
    }

    pub fn is_loaded(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_loads_once() {
        let loader: LoadOnce<u32> = LoadOnce::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = loader
                .get_or_load("fonts", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(loader.is_loaded("fonts"));
        assert!(!loader.is_loaded("other"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_load() {
        let loader: Arc<LoadOnce<u32>> = Arc::new(LoadOnce::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let load = |loader: Arc<LoadOnce<u32>>, calls: Arc<AtomicUsize>| async move {
            loader
                .get_or_load("pdf", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok::<_, String>(1)
                })
                .await
        };

        let (a, b) = tokio::join!(
            load(Arc::clone(&loader), Arc::clone(&calls)),
            load(Arc::clone(&loader), Arc::clone(&calls))
        );
        assert_eq!(a, Ok(1));
        assert_eq!(b, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_retries() {
        let loader: LoadOnce<u32> = LoadOnce::new();
        let first = loader
            .get_or_load("fonts", || async { Err::<u32, _>("offline".to_string()) })
            .await;
        assert_eq!(first, Err("offline".to_string()));
        assert!(!loader.is_loaded("fonts"));

        let second = loader
            .get_or_load("fonts", || async { Ok::<_, String>(3) })
            .await;
        assert_eq!(second, Ok(3));
    }
}
