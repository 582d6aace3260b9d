//! Single-threaded typed pub/sub with scoped subscriptions.
//!
//! Listeners are stored as `Rc<dyn Fn(&T)>` and every registration hands back
//! a [`Subscription`] that unregisters the listener when dropped. Emission
//! iterates over a snapshot of the listener list:
//!   - a listener removed during emission is still called in that round;
//!   - a listener added during emission is not called until the next emit.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Identifier of a registered listener, unique per emitter.
pub type ListenerId = u64;

type Listener<T> = Rc<dyn Fn(&T)>;

struct Registry<T> {
    listeners: RefCell<Vec<(ListenerId, Listener<T>)>>,
    next_id: Cell<ListenerId>,
}

impl<T> Registry<T> {
    fn remove(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
    }
}

/// Typed synchronous event emitter.
pub struct EventEmitter<T> {
    registry: Rc<Registry<T>>,
}

impl<T: 'static> EventEmitter<T> {
    /// Create a new, empty emitter.
    pub fn new() -> Self {
        Self {
            registry: Rc::new(Registry {
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(1),
            }),
        }
    }

    /// Register `callback`; it stays registered as long as the returned
    /// [`Subscription`] is alive.
    pub fn on(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let id = self.registry.next_id.get();
        self.registry.next_id.set(id + 1);
        self.registry
            .listeners
            .borrow_mut()
            .push((id, Rc::new(callback)));

        let registry: Weak<Registry<T>> = Rc::downgrade(&self.registry);
        Subscription {
            id,
            release: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.remove(id);
                }
            })),
        }
    }

    /// Emit `event` to all currently registered listeners.
    pub fn emit(&self, event: &T) {
        let snapshot: Vec<Listener<T>> = self
            .registry
            .listeners
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        // borrow released, callbacks may subscribe or unsubscribe
        for cb in snapshot {
            cb(event);
        }
    }

    /// Number of currently registered listeners.
    pub fn size(&self) -> usize {
        self.registry.listeners.borrow().len()
    }
}

impl<T: 'static> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventEmitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.registry.listeners.borrow().len())
            .finish()
    }
}

/// Owned registration handle. Dropping it removes the listener.
///
/// The handle does not keep the emitter alive; releasing a subscription whose
/// emitter is already gone does nothing.
#[must_use = "the listener is removed as soon as the subscription is dropped"]
pub struct Subscription {
    id: ListenerId,
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the listener now. Equivalent to dropping the handle.
    pub fn cancel(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
