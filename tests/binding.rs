use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use propcell::{ColdSource, Disposable, Event, Property, PushSource, Sink, bind, bind_or_fail};

mod common;
use common::event_watcher;

/// Hot source: emits to whoever is subscribed, no start step, no error channel.
#[derive(Clone)]
struct FakeFeed(Arc<Mutex<FeedState>>);

struct FeedState {
    consumers: BTreeMap<usize, Box<dyn Fn(i32) + Send + Sync>>,
    next_id: usize,
}

impl FakeFeed {
    fn new() -> Self { Self(Arc::new(Mutex::new(FeedState { consumers: BTreeMap::new(), next_id: 0 }))) }

    fn emit(&self, value: i32) {
        let state = self.0.lock().unwrap();
        for consumer in state.consumers.values() {
            consumer(value);
        }
    }

    fn consumer_count(&self) -> usize { self.0.lock().unwrap().consumers.len() }
}

impl PushSource<i32> for FakeFeed {
    fn subscribe(&self, consumer: Box<dyn Fn(i32) + Send + Sync>) -> Disposable {
        let mut state = self.0.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.consumers.insert(id, consumer);

        let feed = self.0.clone();
        Disposable::new(move || {
            feed.lock().unwrap().consumers.remove(&id);
        })
    }
}

/// Cold source: holds at most one running sink, delivers nothing after disposal.
#[derive(Clone)]
struct FakeCold(Arc<Mutex<Option<Arc<dyn Sink<i32>>>>>);

impl FakeCold {
    fn new() -> Self { Self(Arc::new(Mutex::new(None))) }

    fn emit(&self, event: Event<i32>) {
        // Clone the sink out so the lock is not held across delivery
        let sink = self.0.lock().unwrap().clone();
        if let Some(sink) = sink {
            sink.accept(event);
        }
    }

    fn is_running(&self) -> bool { self.0.lock().unwrap().is_some() }
}

impl ColdSource<i32> for FakeCold {
    fn start(&self, sink: Arc<dyn Sink<i32>>) -> Disposable {
        *self.0.lock().unwrap() = Some(sink);
        let slot = self.0.clone();
        Disposable::new(move || {
            *slot.lock().unwrap() = None;
        })
    }
}

#[test]
fn test_push_bind_forwards_until_property_dies() {
    common::init_tracing();

    let feed = FakeFeed::new();
    let property = Property::new(0);
    let (events, check) = event_watcher::<i32>();
    let _sub = property.values().subscribe(events);

    bind(&property, &feed);
    assert_eq!(feed.consumer_count(), 1);

    feed.emit(5);
    feed.emit(7);
    assert_eq!(property.get(), 7);
    assert_eq!(check(), ["next 0", "next 5", "next 7"]);

    // Property death cancels the feed subscription
    drop(property);
    assert_eq!(check(), ["completed"]);
    assert_eq!(feed.consumer_count(), 0);

    // The feed may keep emitting; nothing is forwarded anywhere
    feed.emit(9);
}

#[test]
fn test_cold_bind_clean_completion_leaves_property_alive() {
    let cold = FakeCold::new();
    let property = Property::new(0);

    bind_or_fail(&property, &cold);
    assert!(cold.is_running());

    cold.emit(Event::Next(5));
    assert_eq!(property.get(), 5);

    // Source completion disposes the whole composite, including the run
    cold.emit(Event::Completed);
    assert!(!cold.is_running());

    // The property is unaffected and remains usable
    property.set(6);
    assert_eq!(property.get(), 6);
}

#[test]
fn test_cold_bind_property_death_cancels_run() {
    let cold = FakeCold::new();
    let property = Property::new(0);

    bind_or_fail(&property, &cold);
    assert!(cold.is_running());

    drop(property);
    assert!(!cold.is_running());
}

#[test]
fn test_cold_bind_error_is_fatal() {
    // The error-intolerant binding's contract: a source error panics the
    // delivering thread. Run on a scratch thread so the test observes it.
    let result = std::thread::spawn(|| {
        let cold = FakeCold::new();
        let property = Property::new(0);
        bind_or_fail(&property, &cold);
        cold.emit(Event::Error("boom".into()));
    })
    .join();

    assert!(result.is_err());
}
