use std::sync::{Arc, Mutex, Once};

use propcell::Event;

#[allow(unused)]
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).try_init();
    });
}

/// Accumulate/check pair: the first closure records values, the second drains
/// and returns everything recorded since the last check.
#[allow(unused)]
pub fn change_watcher<T: Send + Sync + 'static>() -> (Box<dyn Fn(T) + Send + Sync>, Box<dyn Fn() -> Vec<T> + Send + Sync>) {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let watcher = {
        let changes = changes.clone();
        Box::new(move |value: T| {
            changes.lock().unwrap().push(value);
        })
    };

    let check = Box::new(move || {
        let changes: Vec<T> = changes.lock().unwrap().drain(..).collect();
        changes
    });

    (watcher, check)
}

/// Renders a property's events to strings for order-sensitive assertions.
#[allow(unused)]
pub fn event_watcher<T>() -> (Box<dyn Fn(Event<T>) + Send + Sync>, Box<dyn Fn() -> Vec<String> + Send + Sync>)
where T: std::fmt::Display + Send + Sync + 'static {
    let (record, check) = change_watcher::<String>();
    let events = Box::new(move |event: Event<T>| {
        record(match event {
            Event::Next(value) => format!("next {value}"),
            Event::Error(error) => format!("error {error}"),
            Event::Completed => "completed".to_string(),
        })
    });
    (events, check)
}
