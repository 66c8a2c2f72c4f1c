//! Change notification for preferences

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Callback invoked with the new value after each write (`None` when removed)
pub type Observer<T> = Arc<dyn Fn(Option<&T>) + Send + Sync>;

/// Handle returned by [`PreferenceObservable::add_observer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

pub struct PreferenceObservable<T> {
    next_id: AtomicU64,
    observers: Mutex<Vec<(ObserverId, Observer<T>)>>,
}

impl<T> Default for PreferenceObservable<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            observers: Mutex::new(Vec::new()),
        }
    }
}

impl<T> PreferenceObservable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn observers(&self) -> MutexGuard<'_, Vec<(ObserverId, Observer<T>)>> {
        // An observer panicking elsewhere leaves the list itself intact
        self.observers.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_observer<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers().push((id, Arc::new(observer)));
        id
    }

    /// Returns whether an observer was removed
    pub fn delete_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn delete_observers(&self) {
        self.observers().clear();
    }

    pub fn count_observers(&self) -> usize {
        self.observers().len()
    }

    /// Call every observer; the lock is released before any callback runs
    pub fn notify_observers(&self, value: Option<&T>) {
        let snapshot: Vec<Observer<T>> = self
            .observers()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();

        for observer in snapshot {
            observer(value);
        }
    }
}
