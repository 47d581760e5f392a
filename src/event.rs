use std::sync::Arc;

/// Errors surfaced by a cold source. The property itself has no error channel,
/// so this only ever travels through the binding layer.
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A single notification in the three-state push protocol.
///
/// `Completed` and `Error` are terminal: at most one of them is meaningful per
/// logical subscription, and nothing follows it.
#[derive(Debug)]
pub enum Event<T> {
    /// A new value
    Next(T),
    /// Terminal failure, only produced by cold sources
    Error(SourceError),
    /// Terminal end-of-stream
    Completed,
}

/// A capability that accepts push-based events.
///
/// Implementations must tolerate being invoked after their logical completion
/// (treat it as a no-op) but should not rely on that happening.
pub trait Sink<T>: Send + Sync {
    fn accept(&self, event: Event<T>);
}

struct FnSink<F>(F);

impl<T, F> Sink<T> for FnSink<F>
where F: Fn(Event<T>) + Send + Sync
{
    fn accept(&self, event: Event<T>) { (self.0)(event) }
}

/// Trait for types that can be converted into event sinks.
pub trait IntoSink<T> {
    /// Convert this type into a sink that can receive events.
    fn into_sink(self) -> Arc<dyn Sink<T>>;
}

// Implementation for function types - multi-threaded
impl<T, F> IntoSink<T> for F
where F: Fn(Event<T>) + Send + Sync + 'static
{
    fn into_sink(self) -> Arc<dyn Sink<T>> { Arc::new(FnSink(self)) }
}

// Implementation for Arc'd sinks - identity
impl<T> IntoSink<T> for Arc<dyn Sink<T>> {
    fn into_sink(self) -> Arc<dyn Sink<T>> { self }
}

impl<T> IntoSink<T> for std::sync::mpsc::Sender<Event<T>>
where T: Send + 'static
{
    fn into_sink(self) -> Arc<dyn Sink<T>> {
        Arc::new(FnSink(move |event| {
            let _ = self.send(event); // Ignore send errors
        }))
    }
}

#[cfg(feature = "tokio")]
impl<T> IntoSink<T> for tokio::sync::mpsc::UnboundedSender<Event<T>>
where T: Send + 'static
{
    fn into_sink(self) -> Arc<dyn Sink<T>> {
        Arc::new(FnSink(move |event| {
            let _ = self.send(event); // Ignore send errors
        }))
    }
}
