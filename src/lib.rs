/*!
An observable mutable cell.

[`Property<T>`] always holds a value, broadcasts every mutation to a dynamic
set of subscribers, and broadcasts one terminal `Completed` when it is
dropped. Subscriptions are disposal-based; [`bind`] and [`bind_or_fail`]
declaratively feed a property from external push or cold sources, wired to the
property's lifetime.

# Design requirements:
- One serialization context per property: mutations and broadcasts are totally
  ordered, subscribers are notified in registration order, and a subscriber
  registered mid-broadcast never sees the in-flight event.
- Subscribing replays the current value first, so a late subscriber never
  misses the present state.
- Reentrancy is permitted with defined ordering: a subscriber may set,
  subscribe, or dispose on the property it is observing from inside its own
  callback; the operation is queued and delivered after the in-flight
  broadcast.
- Notification is synchronous and blocking within the serialized context: a
  slow subscriber stalls further mutation of that property. Deliberate
  simplicity/safety tradeoff.
- Nothing here owns a thread pool; this crate provides serialization, not
  parallelism.

# Basic usage

```rust
use propcell::Property;

let temperature = Property::new(21.5_f64);
let _watch = temperature.values().subscribe_next(|value: f64| println!("temperature: {value}"));
// prints 21.5 immediately (replay-latest), then every change
temperature.set(23.0);
```

# Streams into channels

```rust
use propcell::{Event, Property};

let cell = Property::new(1_u32);
let (tx, rx) = std::sync::mpsc::channel();
let _sub = cell.values().subscribe(tx);

cell.set(2);
drop(cell); // teardown broadcasts Completed exactly once

assert!(matches!(rx.recv().unwrap(), Event::Next(1)));
assert!(matches!(rx.recv().unwrap(), Event::Next(2)));
assert!(matches!(rx.recv().unwrap(), Event::Completed));
```
*/

mod bind;
mod dispose;
mod event;
mod property;
mod registry;
mod source;

pub use bind::*;
pub use dispose::*;
pub use event::*;
pub use property::*;
pub use source::*;
