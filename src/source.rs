use std::sync::Arc;

use crate::dispose::Disposable;
use crate::event::Sink;

/// A hot, fire-and-forget stream of values: it emits independently of
/// subscription, has no start step and no error channel. Subscribing yields a
/// disposable that cancels just that subscription.
pub trait PushSource<T>: Send + Sync {
    fn subscribe(&self, consumer: Box<dyn Fn(T) + Send + Sync>) -> Disposable;
}

/// A cold producer: it begins work only when started with a sink and returns a
/// disposable representing the run. If it delivers anything terminal it
/// delivers `Completed` or `Error` exactly once, and delivers nothing after
/// disposal.
pub trait ColdSource<T>: Send + Sync {
    fn start(&self, sink: Arc<dyn Sink<T>>) -> Disposable;
}
