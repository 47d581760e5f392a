use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::event::Sink;

/// Opaque key identifying one registration. Ids are handed out monotonically,
/// so iterating the map in key order is iterating in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct SubscriptionId(usize);

/// One registered sink.
///
/// An entry starts out unarmed and is excluded from broadcasts until its
/// replay has run, so a subscriber added during an in-flight broadcast never
/// receives that event. The `closed` flag is flipped by disposal without
/// taking the property lock, and is re-checked immediately before every
/// delivery, silencing an entry even against a snapshot taken before it was
/// disposed.
pub(crate) struct Entry<T> {
    sink: Arc<dyn Sink<T>>,
    armed: AtomicBool,
    closed: AtomicBool,
}

impl<T> Entry<T> {
    pub fn sink(&self) -> &Arc<dyn Sink<T>> { &self.sink }

    pub fn arm(&self) { self.armed.store(true, Ordering::Release) }
    pub fn is_armed(&self) -> bool { self.armed.load(Ordering::Acquire) }

    pub fn close(&self) { self.closed.store(true, Ordering::Release) }
    pub fn is_closed(&self) -> bool { self.closed.load(Ordering::Acquire) }
}

/// Insertion-ordered registry of live sinks. Always accessed under the owning
/// property's serialization context; broadcast happens over snapshots, never
/// while a lock is held.
pub(crate) struct Registry<T> {
    entries: BTreeMap<SubscriptionId, Arc<Entry<T>>>,
    next_id: usize,
}

impl<T> Registry<T> {
    pub fn new() -> Self { Self { entries: BTreeMap::new(), next_id: 0 } }

    pub fn insert(&mut self, sink: Arc<dyn Sink<T>>) -> (SubscriptionId, Arc<Entry<T>>) {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let entry = Arc::new(Entry { sink, armed: AtomicBool::new(false), closed: AtomicBool::new(false) });
        self.entries.insert(id, entry.clone());
        (id, entry)
    }

    pub fn remove(&mut self, id: SubscriptionId) { self.entries.remove(&id); }

    pub fn get(&self, id: SubscriptionId) -> Option<Arc<Entry<T>>> { self.entries.get(&id).cloned() }

    /// Snapshot of every armed, still-open entry, in registration order.
    pub fn snapshot(&self) -> Vec<Arc<Entry<T>>> {
        self.entries.values().filter(|entry| entry.is_armed() && !entry.is_closed()).cloned().collect()
    }

    /// Empties the registry, returning every still-open entry (armed or not)
    /// in registration order. Used for the terminal broadcast.
    pub fn drain(&mut self) -> Vec<Arc<Entry<T>>> {
        let entries = std::mem::take(&mut self.entries);
        entries.into_values().filter(|entry| !entry.is_closed()).collect()
    }

    pub fn len(&self) -> usize { self.entries.len() }
}
