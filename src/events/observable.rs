//! Observable - one named event's subscriber list.
//!
//! # Invariants
//!
//! 1. Subscriber ids come from the thread's id generator and are never reused.
//! 2. Subscribers run in registration order.
//! 3. `trigger` delivers to a snapshot taken when it starts: binds and unbinds
//!    made by a subscriber during delivery only affect later triggers.
//! 4. Unbinding an unknown id is a no-op.
//! 5. `is_triggered` stays true once set, even after `unbind_all`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::engine::next_subscription_id;
use crate::types::SubscriptionId;

/// Subscriber callback.
pub type Callback<A> = Rc<dyn Fn(&A)>;

/// Shared handle to a subscriber list. Clones refer to the same list.
pub struct Observable<A: ?Sized + 'static> {
    inner: Rc<RefCell<Inner<A>>>,
}

struct Inner<A: ?Sized + 'static> {
    subscribers: Vec<(SubscriptionId, Callback<A>)>,
    triggered: bool,
}

impl<A: ?Sized + 'static> Clone for Observable<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A: ?Sized + 'static> Default for Observable<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized + 'static> fmt::Debug for Observable<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("subscribers", &inner.subscribers.len())
            .field("triggered", &inner.triggered)
            .finish()
    }
}

impl<A: ?Sized + 'static> Observable<A> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                subscribers: Vec::new(),
                triggered: false,
            })),
        }
    }

    /// Mark as fired and call every subscriber bound when the call began.
    pub fn trigger(&self, args: &A) {
        let snapshot: Vec<Callback<A>> = {
            let mut inner = self.inner.borrow_mut();
            inner.triggered = true;
            inner
                .subscribers
                .iter()
                .map(|(_, callback)| Rc::clone(callback))
                .collect()
        };

        for callback in snapshot {
            callback(args);
        }
    }

    pub fn bind(&self, callback: impl Fn(&A) + 'static) -> SubscriptionId {
        self.bind_rc(Rc::new(callback))
    }

    pub fn bind_rc(&self, callback: Callback<A>) -> SubscriptionId {
        let id = next_subscription_id();
        self.inner.borrow_mut().subscribers.push((id, callback));
        id
    }

    /// Remove a subscriber. Returns whether it was bound.
    pub fn unbind(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sub_id, _)| *sub_id != id);
        inner.subscribers.len() != before
    }

    pub fn unbind_all(&self) {
        // Dropping callbacks may drop captured objects; don't hold the borrow.
        let drained = std::mem::take(&mut self.inner.borrow_mut().subscribers);
        drop(drained);
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.borrow().triggered
    }

    pub fn is_bound(&self, id: SubscriptionId) -> bool {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .any(|(sub_id, _)| *sub_id == id)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
