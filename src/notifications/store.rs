use std::sync::{Arc, Mutex};

use async_channel::{Receiver, Sender};

use crate::notifications::model::{NotificationEvent, NotificationRecord};

/// Newest-first notification collection shared between the listener and the UI.
///
/// Ids are unique: a history batch replaces everything, a live record with a
/// known id replaces the old entry in place of adding a second one.
#[derive(Clone, Default)]
pub struct NotificationStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    records: Mutex<Vec<NotificationRecord>>,
    subscribers: Mutex<Vec<Sender<NotificationEvent>>>,
}

impl std::fmt::Debug for NotificationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationStore")
            .field("len", &self.len())
            .finish()
    }
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the collection with a history batch, keeping the first
    /// occurrence of any repeated id.
    pub fn replace_all(&self, records: Vec<NotificationRecord>) {
        let mut unique: Vec<NotificationRecord> = Vec::with_capacity(records.len());
        for record in records {
            if !unique.iter().any(|existing| existing.id == record.id) {
                unique.push(record);
            }
        }
        unique.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let count = unique.len();
        *self.inner.records.lock().unwrap() = unique;
        self.publish(NotificationEvent::HistoryLoaded { count });
    }

    /// Inserts at its newest-first position, replacing a record with the same id.
    pub fn insert(&self, record: NotificationRecord) {
        {
            let mut records = self.inner.records.lock().unwrap();
            records.retain(|existing| existing.id != record.id);
            let position = records.partition_point(|existing| existing.created_at > record.created_at);
            records.insert(position, record.clone());
        }
        self.publish(NotificationEvent::Received(record));
    }

    pub fn records(&self) -> Vec<NotificationRecord> {
        self.inner.records.lock().unwrap().clone()
    }

    pub fn get(&self, id: &str) -> Option<NotificationRecord> {
        self.inner
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn unread_count(&self) -> usize {
        self.inner
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| !record.read)
            .count()
    }

    /// Returns `false` when the id is unknown or already read.
    pub fn mark_read(&self, id: &str) -> bool {
        let changed = {
            let mut records = self.inner.records.lock().unwrap();
            match records.iter_mut().find(|record| record.id == id) {
                Some(record) if !record.read => {
                    record.read = true;
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.publish(NotificationEvent::Read { id: id.to_string() });
        }
        changed
    }

    pub fn mark_all_read(&self) {
        {
            let mut records = self.inner.records.lock().unwrap();
            for record in records.iter_mut() {
                record.read = true;
            }
        }
        self.publish(NotificationEvent::AllRead);
    }

    pub fn clear(&self) {
        self.inner.records.lock().unwrap().clear();
        self.publish(NotificationEvent::Cleared);
    }

    /// Events for every change made after this call.
    pub fn subscribe(&self) -> Receiver<NotificationEvent> {
        let (sender, receiver) = async_channel::unbounded();
        self.inner.subscribers.lock().unwrap().push(sender);
        receiver
    }

    fn publish(&self, event: NotificationEvent) {
        let mut subscribers = self.inner.subscribers.lock().unwrap();
        subscribers.retain(|sender| sender.try_send(event.clone()).is_ok());
    }
}
