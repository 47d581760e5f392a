use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, trace};

use crate::dispose::Disposable;
use crate::event::{Event, IntoSink};
use crate::registry::{Registry, SubscriptionId};

/// One unit of serialized work. Every mutation, replay, and teardown of a
/// property is expressed as an op and delivered in FIFO order.
enum Op<T> {
    Set(T),
    Apply(Box<dyn FnOnce(&mut T) + Send>),
    Replay(SubscriptionId),
    Complete,
}

struct State<T> {
    value: T,
    registry: Registry<T>,
    queue: VecDeque<Op<T>>,
    /// True while some thread is draining the queue. That thread delivers
    /// every op enqueued before it observes the queue empty.
    draining: bool,
    /// Completed has been broadcast; the registry is permanently inert.
    terminated: bool,
}

struct Shared<T> {
    state: Mutex<State<T>>,
}

impl<T: Clone + Send + Sync + 'static> Shared<T> {
    fn submit(&self, op: Op<T>) {
        let mut state = self.state.lock().expect("property lock is poisoned");
        if state.terminated {
            return;
        }
        state.queue.push_back(op);
        if !state.draining {
            self.drain(state);
        }
    }

    /// Delivers queued ops in order. The lock is released around every sink
    /// callback, so a callback may freely set, subscribe, or dispose on this
    /// same property: those operations enqueue and are delivered after the
    /// in-flight broadcast, in total order.
    fn drain<'a>(&'a self, state: MutexGuard<'a, State<T>>) {
        // A panicking callback must not leave `draining` stuck true, or every
        // later submit would enqueue without anything ever delivering again.
        // The reset guard comes first and the lock guard is rebound after it:
        // locals unwind in reverse order, so the lock is always released
        // before the reset runs.
        let reset = DrainingReset(self);
        let mut state = state;
        state.draining = true;
        while let Some(op) = state.queue.pop_front() {
            match op {
                Op::Set(value) => {
                    state.value = value.clone();
                    let snapshot = state.registry.snapshot();
                    drop(state);
                    trace!(subscribers = snapshot.len(), "broadcasting new value");
                    for entry in &snapshot {
                        if !entry.is_closed() {
                            entry.sink().accept(Event::Next(value.clone()));
                        }
                    }
                    state = self.state.lock().expect("property lock is poisoned");
                }
                Op::Apply(f) => {
                    // The closure runs on a clone, outside the lock: it may
                    // touch this same property, and a panic in it cannot
                    // poison the state. Only the draining thread applies ops,
                    // so the read-modify-write is still atomic with respect to
                    // every other mutation.
                    let mut value = state.value.clone();
                    drop(state);
                    f(&mut value);
                    state = self.state.lock().expect("property lock is poisoned");
                    state.value = value.clone();
                    let snapshot = state.registry.snapshot();
                    drop(state);
                    for entry in &snapshot {
                        if !entry.is_closed() {
                            entry.sink().accept(Event::Next(value.clone()));
                        }
                    }
                    state = self.state.lock().expect("property lock is poisoned");
                }
                Op::Replay(id) => {
                    // The entry is gone if the subscription was disposed, or if
                    // teardown swept the registry first (the sink already got
                    // its Completed in that case).
                    let Some(entry) = state.registry.get(id) else { continue };
                    let value = state.value.clone();
                    entry.arm();
                    drop(state);
                    if !entry.is_closed() {
                        entry.sink().accept(Event::Next(value));
                    }
                    state = self.state.lock().expect("property lock is poisoned");
                }
                Op::Complete => {
                    state.terminated = true;
                    let entries = state.registry.drain();
                    drop(state);
                    debug!(subscribers = entries.len(), "property torn down");
                    for entry in &entries {
                        if !entry.is_closed() {
                            entry.sink().accept(Event::Completed);
                        }
                    }
                    state = self.state.lock().expect("property lock is poisoned");
                }
            }
        }
        // Clear the flag under the final guard so no submit can observe an
        // empty queue with `draining` still set; the unwind guard is only for
        // the panic path.
        state.draining = false;
        drop(state);
        std::mem::forget(reset);
    }
}

/// Unwind guard for [`Shared::drain`]: restores `draining = false` if a sink
/// callback panics, so delivery resumes on the next submit.
struct DrainingReset<'a, T>(&'a Shared<T>);

impl<T> Drop for DrainingReset<'_, T> {
    fn drop(&mut self) {
        // Runs after the state guard has been released, even when unwinding;
        // recover the flag through poisoning too.
        let mut state = match self.0.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.draining = false;
    }
}

/// An observable mutable cell: always holds a value, broadcasts every mutation
/// to its subscribers, and broadcasts a single `Completed` when dropped.
///
/// The property is the unique owner of its state; it is deliberately not
/// `Clone`. Shared mutation goes through [`PropertySink`] and shared
/// observation through [`Values`], both of which hold only weak references and
/// never extend the property's lifetime.
///
/// All mutation and notification is funneled through one serialization context
/// per property: two `set` calls from different threads are totally ordered,
/// and broadcasting happens inside that context. A slow subscriber therefore
/// stalls further mutation of that property until it returns. This is a
/// deliberate simplicity/safety tradeoff, not a performance optimization.
pub struct Property<T: Clone + Send + Sync + 'static>(Arc<Shared<T>>);

impl<T: Clone + Send + Sync + 'static> Property<T> {
    pub fn new(initial: T) -> Self {
        Self(Arc::new(Shared {
            state: Mutex::new(State {
                value: initial,
                registry: Registry::new(),
                queue: VecDeque::new(),
                draining: false,
                terminated: false,
            }),
        }))
    }

    /// Replaces the current value and broadcasts it to every live subscriber.
    ///
    /// If a broadcast is already in flight (on this thread or another), the
    /// value is queued and delivered after it, preserving total order; in that
    /// case delivery may complete after `set` returns to the caller.
    pub fn set(&self, value: T) { self.0.submit(Op::Set(value)) }

    /// Sink-style alias for [`set`](Self::set), for use where a plain value
    /// consumer is expected.
    pub fn put(&self, value: T) { self.set(value) }

    /// Read-modify-write, serialized like [`set`](Self::set) and broadcast as
    /// a single event. The closure runs on a clone of the current value with
    /// no lock held, so it may itself call `put` or subscribe on this
    /// property; those operations are ordered after the modification.
    pub fn modify<F: FnOnce(&mut T) + Send + 'static>(&self, f: F) { self.0.submit(Op::Apply(Box::new(f))) }

    /// Clone of the authoritative current value.
    pub fn get(&self) -> T { self.0.state.lock().expect("property lock is poisoned").value.clone() }

    /// Replay-latest-then-live event stream of this property. The handle is
    /// weak: subscribing after the property has died yields only `Completed`.
    pub fn values(&self) -> Values<T> { Values(Arc::downgrade(&self.0)) }

    /// Weak mutation capability. `put` on it becomes a no-op once the
    /// property is gone, which is what lets bindings outlive their target
    /// harmlessly.
    pub fn sink(&self) -> PropertySink<T> { PropertySink(Arc::downgrade(&self.0)) }
}

impl<T: Clone + Send + Sync + Default + 'static> Default for Property<T> {
    fn default() -> Self { Self::new(T::default()) }
}

impl<T: Clone + Send + Sync + std::fmt::Debug + 'static> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.0.state.lock().expect("property lock is poisoned");
        f.debug_struct("Property").field("value", &state.value).field("subscribers", &state.registry.len()).finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for Property<T> {
    /// Teardown: broadcasts `Completed` exactly once to every still-registered
    /// subscriber, then the registry is permanently empty.
    fn drop(&mut self) { self.0.submit(Op::Complete) }
}

/// Subscribable view of a property's event stream. Holds a weak reference.
pub struct Values<T>(Weak<Shared<T>>);

impl<T> Clone for Values<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T: Clone + Send + Sync + 'static> Values<T> {
    /// Registers a sink and immediately replays the current value as its first
    /// `Next` event, within the property's serialization context: a late
    /// subscriber never misses the present state, and never observes an event
    /// that was already in flight when it registered.
    ///
    /// If the property is already dead, the sink receives exactly one
    /// `Completed` and is never registered.
    pub fn subscribe<S: IntoSink<T>>(&self, sink: S) -> Subscription {
        let sink = sink.into_sink();
        let Some(shared) = self.0.upgrade() else {
            sink.accept(Event::Completed);
            return Subscription::spent();
        };

        let mut state = shared.state.lock().expect("property lock is poisoned");
        if state.terminated {
            drop(state);
            sink.accept(Event::Completed);
            return Subscription::spent();
        }

        let (id, entry) = state.registry.insert(sink);
        state.queue.push_back(Op::Replay(id));

        let handle = Disposable::new({
            let weak = Arc::downgrade(&shared);
            move || {
                // Close first, without any lock: this silences the entry even
                // against a broadcast snapshot already in flight.
                entry.close();
                if let Some(shared) = weak.upgrade() {
                    shared.state.lock().expect("property lock is poisoned").registry.remove(id);
                }
            }
        });

        if !state.draining {
            shared.drain(state);
        }
        Subscription { handle, detached: false }
    }

    /// Subscribe with a plain value callback; `Completed` and `Error` are
    /// ignored.
    pub fn subscribe_next<F>(&self, f: F) -> Subscription
    where F: Fn(T) + Send + Sync + 'static {
        self.subscribe(move |event: Event<T>| {
            if let Event::Next(value) = event {
                f(value);
            }
        })
    }
}

/// Weak `put` capability for a property.
pub struct PropertySink<T>(Weak<Shared<T>>);

impl<T> Clone for PropertySink<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T: Clone + Send + Sync + 'static> PropertySink<T> {
    /// Forwards a value to the property's `set`. No-op once the property has
    /// been dropped.
    pub fn put(&self, value: T) {
        if let Some(shared) = self.0.upgrade() {
            shared.submit(Op::Set(value));
        }
    }

    pub fn is_alive(&self) -> bool { self.0.strong_count() > 0 }
}

/// Handle for one registration on a property. Dropping it unregisters, like a
/// listener guard; `dispose` is the explicit idempotent form.
pub struct Subscription {
    handle: Disposable,
    detached: bool,
}

impl Subscription {
    fn spent() -> Self { Self { handle: Disposable::noop(), detached: false } }

    /// Removes this registration. No further events reach its sink, even if an
    /// in-flight broadcast already snapshotted it. Idempotent, callable from
    /// any thread.
    pub fn dispose(&self) { self.handle.dispose() }

    pub fn is_disposed(&self) -> bool { self.handle.is_disposed() }

    /// Ties the registration to the property's lifetime instead of this guard:
    /// the sink keeps receiving events until the property dies.
    pub fn forget(mut self) { self.detached = true; }

    /// Converts into a plain [`Disposable`] holding the unregistration work.
    pub fn into_disposable(mut self) -> Disposable {
        self.detached = true;
        self.handle.clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.detached {
            self.handle.dispose();
        }
    }
}
