//! Reducer-driven state container.

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// State transition function applied on every dispatch.
pub type Reducer<S, A> = Box<dyn Fn(&S, A) -> S + Send + Sync>;

type Listener = Arc<dyn Fn() + Send + Sync>;

/// The states on either side of one dispatch.
///
/// Both are taken under the dispatch lock, so `previous` is exactly what the
/// reducer saw and nothing ran in between.
#[derive(Debug)]
pub struct Transition<S> {
    pub previous: Arc<S>,
    pub current: Arc<S>,
}
type ListenerList = Mutex<Vec<(u64, Listener)>>;

/// Holds the current state and applies actions to it.
///
/// Readers get an `Arc` snapshot through [`Store::get_state`] and never see a
/// half-applied action. Dispatches are serialized: the reducer runs and every
/// listener is notified before the next dispatch starts. Listeners are called
/// in subscription order with no arguments and may call `get_state`, but must
/// not dispatch.
pub struct Store<S, A> {
    reducer: Reducer<S, A>,
    state: ArcSwap<S>,
    dispatching: Mutex<()>,
    listeners: Arc<ListenerList>,
    next_listener_id: AtomicU64,
}

impl<S, A> Store<S, A>
where
    S: Send + Sync + 'static,
{
    pub fn new<R>(reducer: R, initial: S) -> Self
    where
        R: Fn(&S, A) -> S + Send + Sync + 'static,
    {
        Self {
            reducer: Box::new(reducer),
            state: ArcSwap::from_pointee(initial),
            dispatching: Mutex::new(()),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// Snapshot of the current state.
    pub fn get_state(&self) -> Arc<S> {
        self.state.load_full()
    }

    /// Apply an action, then notify every listener.
    pub fn dispatch(&self, action: A) -> Transition<S> {
        let _serial = self.dispatching.lock().unwrap_or_else(PoisonError::into_inner);

        let previous = self.state.load_full();
        let current = Arc::new((self.reducer)(&previous, action));
        self.state.store(Arc::clone(&current));

        // Snapshot so listeners can unsubscribe while being notified.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener();
        }

        Transition { previous, current }
    }

    /// Register a listener. The returned closure removes exactly this
    /// subscription; calling it after the store is gone does nothing.
    pub fn subscribe<F>(&self, listener: F) -> impl FnOnce() + Send + Sync + 'static
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));

        let listeners: Weak<ListenerList> = Arc::downgrade(&self.listeners);
        move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|(existing, _)| *existing != id);
            }
        }
    }

    /// Number of active subscriptions.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
