use std::sync::{Arc, Mutex};

type Action = Box<dyn FnOnce() + Send>;

/// A cancellable unit of work. Disposal runs the wrapped action at most once,
/// from whichever thread calls `dispose` first; every later call is a no-op.
///
/// Clones share the same single-shot state, so a `Disposable` can be held by a
/// composite and captured by a callback at the same time.
#[derive(Clone)]
pub struct Disposable(Arc<Mutex<Option<Action>>>);

impl Disposable {
    pub fn new<F: FnOnce() + Send + 'static>(action: F) -> Self { Self(Arc::new(Mutex::new(Some(Box::new(action))))) }

    /// A disposable with nothing to cancel. Reports itself as already disposed.
    pub fn noop() -> Self { Self(Arc::new(Mutex::new(None))) }

    pub fn dispose(&self) {
        // Take the action out before running it so the lock is never held
        // across the callback and reentrant disposal stays a no-op.
        let action = self.0.lock().expect("disposable lock is poisoned").take();
        if let Some(action) = action {
            action();
        }
    }

    pub fn is_disposed(&self) -> bool { self.0.lock().expect("disposable lock is poisoned").is_none() }
}

impl std::fmt::Debug for Disposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposable").field("disposed", &self.is_disposed()).finish()
    }
}

struct CompositeState {
    disposed: bool,
    children: Vec<Disposable>,
}

/// Owns a set of child disposables and disposes them all exactly once when it
/// is itself disposed. A child added after disposal is disposed immediately.
#[derive(Clone)]
pub struct CompositeDisposable(Arc<Mutex<CompositeState>>);

impl Default for CompositeDisposable {
    fn default() -> Self { Self::new() }
}

impl CompositeDisposable {
    pub fn new() -> Self { Self(Arc::new(Mutex::new(CompositeState { disposed: false, children: Vec::new() }))) }

    pub fn add(&self, child: Disposable) {
        {
            let mut state = self.0.lock().expect("composite lock is poisoned");
            if !state.disposed {
                state.children.push(child);
                return;
            }
        }
        // Already disposed: the child is disposed on the spot, outside the lock.
        child.dispose();
    }

    /// Disposes every child in the order it was added. Idempotent.
    pub fn dispose(&self) {
        let children = {
            let mut state = self.0.lock().expect("composite lock is poisoned");
            if state.disposed {
                return;
            }
            state.disposed = true;
            std::mem::take(&mut state.children)
        };
        for child in children {
            child.dispose();
        }
    }

    pub fn is_disposed(&self) -> bool { self.0.lock().expect("composite lock is poisoned").disposed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>) -> Disposable {
        let counter = counter.clone();
        Disposable::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_dispose_runs_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let disposable = counting(&counter);
        assert!(!disposable.is_disposed());

        disposable.dispose();
        disposable.dispose();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(disposable.is_disposed());
    }

    #[test]
    fn test_clones_share_state() {
        let counter = Arc::new(AtomicUsize::new(0));
        let disposable = counting(&counter);
        let clone = disposable.clone();

        clone.dispose();
        disposable.dispose();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(disposable.is_disposed());
    }

    #[test]
    fn test_composite_disposes_children_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let composite = CompositeDisposable::new();
        composite.add(counting(&counter));
        composite.add(counting(&counter));

        composite.dispose();
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        // Second disposal is a no-op
        composite.dispose();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_add_after_dispose_disposes_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let composite = CompositeDisposable::new();
        composite.dispose();

        let child = counting(&counter);
        composite.add(child.clone());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(child.is_disposed());
    }

    #[test]
    fn test_reentrant_add_during_dispose() {
        let counter = Arc::new(AtomicUsize::new(0));
        let composite = CompositeDisposable::new();

        // A child that adds another child while the composite is disposing
        let reentrant = {
            let composite = composite.clone();
            let counter = counter.clone();
            Disposable::new(move || {
                composite.add(counting(&counter));
            })
        };
        composite.add(reentrant);

        composite.dispose();
        // The late child was disposed on the spot
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
