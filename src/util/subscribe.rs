use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub type NextFn<T> = Arc<dyn Fn(&T) + Send + Sync + 'static>;

/// A list of callbacks notified in registration order.
pub struct Observers<T> {
    entries: Mutex<Vec<(usize, NextFn<T>)>>,
    next_id: AtomicUsize,
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
        }
    }
}

impl<T> Observers<T> {
    /// Registers a callback and returns an id usable with [`Observers::remove`].
    pub fn add<F>(&self, callback: F) -> usize
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().unwrap().push((id, Arc::new(callback)));
        id
    }

    pub fn remove(&self, id: usize) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub fn notify(&self, value: &T) {
        // Snapshot so callbacks may register or remove observers.
        let callbacks: Vec<NextFn<T>> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback(value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
