use tracing::error;

use crate::dispose::CompositeDisposable;
use crate::event::{Event, IntoSink};
use crate::property::Property;
use crate::source::{ColdSource, PushSource};

/// One-way binding from a push source into a property.
///
/// Every emitted value is forwarded through the property's weak sink, so once
/// the property is gone forwarding is a no-op rather than a revival. The
/// source subscription is disposed when the property's completion fires; there
/// is no explicit unbind, the binding's lifetime is entirely property-driven.
pub fn bind<T, S>(property: &Property<T>, source: &S)
where
    T: Clone + Send + Sync + 'static,
    S: PushSource<T> + ?Sized,
{
    let sink = property.sink();
    let forward = source.subscribe(Box::new(move |value| sink.put(value)));

    // Watch the property's own completion to cancel the source subscription.
    // The watch registration is forgotten: it lives exactly as long as the
    // property and is swept by its teardown.
    property
        .values()
        .subscribe(move |event: Event<T>| {
            if let Event::Completed = event {
                forward.dispose();
            }
        })
        .forget();
}

/// One-way binding from a cold source into a property.
///
/// The source's run and the watch on the property's completion share one
/// composite: whichever fires first (property death or source completion)
/// disposes the other. A clean `Completed` from the source ends the binding
/// and leaves the property alive.
///
/// Contract: the source must never error. An `Error` event is treated as a
/// programmer-contract violation and panics the delivering thread. This is a
/// deliberate assertion, not a recoverable path; do not soften it.
pub fn bind_or_fail<T, S>(property: &Property<T>, source: &S)
where
    T: Clone + Send + Sync + 'static,
    S: ColdSource<T> + ?Sized,
{
    let composite = CompositeDisposable::new();

    let run = {
        let sink = property.sink();
        let composite = composite.clone();
        source.start(
            (move |event: Event<T>| match event {
                Event::Next(value) => sink.put(value),
                Event::Completed => composite.dispose(),
                Event::Error(error) => {
                    error!(%error, "source bound via bind_or_fail emitted an error");
                    panic!("bind_or_fail: bound source emitted an error: {error}");
                }
            })
            .into_sink(),
        )
    };
    // If the source completed synchronously during start, the composite is
    // already disposed and this disposes the run on the spot.
    composite.add(run);

    let watch = property.values().subscribe({
        let composite = composite.clone();
        move |event: Event<T>| {
            if let Event::Completed = event {
                composite.dispose();
            }
        }
    });
    composite.add(watch.into_disposable());
}
