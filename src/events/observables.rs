//! Observables capability - the per-object event table and binding books.
//!
//! Every object keeps two indexes:
//!
//! ```text
//! subscriptions: SubscriptionId -> { event, observable, subscriber? }   "who listens to me"
//! bound_to:      SubscriptionId -> source object                        "whom I listen to"
//! ```
//!
//! `bind_event(name, cb, Some(context))` writes the first on the source and
//! the second on `context`. Either side can then cut the link on its own:
//! the source with `unbind_all`, the subscriber with `unbind_to_all`. Both
//! run during teardown, so a torn-down object neither receives nor delivers
//! events afterwards.
//!
//! # Re-entrancy
//!
//! No borrow of these tables is held while a callback runs. Callbacks may
//! bind, unbind, trigger or tear down anything, including the object that
//! is delivering.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::engine::{Object, WeakObject, next_subscription_id};
use crate::error::{Error, Result};
use crate::types::{SubscriptionId, Value, ValueMap};

use super::observable::{Callback, Observable};
use super::record::{EventRecord, EventSeed};

/// What an event observable carries: the shared record plus extra arguments.
pub struct Delivery {
    pub record: Rc<EventRecord>,
    pub extra: Vec<Value>,
}

/// A binding recorded on the event source.
#[derive(Clone)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub event: String,
    observable: Observable<Delivery>,
    subscriber: Option<WeakObject>,
}

impl Subscription {
    pub fn subscriber(&self) -> Option<Object> {
        self.subscriber.as_ref().and_then(WeakObject::upgrade)
    }

    pub fn is_bound(&self) -> bool {
        self.observable.is_bound(self.id)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event", &self.event)
            .field("subscriber", &self.subscriber().and_then(|s| s.id()))
            .finish()
    }
}

#[derive(Default)]
pub(crate) struct Observables {
    events: RefCell<HashMap<String, Observable<Delivery>>>,
    subscriptions: RefCell<HashMap<SubscriptionId, Subscription>>,
    bound_to: RefCell<HashMap<SubscriptionId, WeakObject>>,
    pending: RefCell<ValueMap>,
}

// =============================================================================
// Triggering
// =============================================================================

impl Object {
    /// Fire an event.
    ///
    /// Returns `Ok(None)` without building a record when nothing has ever
    /// bound to this event name. Otherwise builds the record (merging and
    /// clearing data queued by [`Object::set_event_data`]), targets it at
    /// this object and delivers `(record, extra)` to every subscriber.
    pub fn trigger_event(
        &self,
        seed: impl Into<EventSeed>,
        extra: &[Value],
    ) -> Result<Option<Rc<EventRecord>>> {
        let seed = seed.into();
        let name = match seed.event_type() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(Error::InvalidEventType),
        };

        let observable = self.cell().events.events.borrow().get(&name).cloned();
        let Some(observable) = observable else {
            return Ok(None);
        };

        let record = EventRecord::from_seed(seed)?;
        let pending = std::mem::take(&mut *self.cell().events.pending.borrow_mut());
        if !pending.is_empty() {
            record.merge_fields(pending);
        }
        record.retarget(self);

        tracing::trace!(
            event = %name,
            target = ?self.id(),
            subscribers = observable.len(),
            "trigger"
        );
        observable.trigger(&Delivery {
            record: Rc::clone(&record),
            extra: extra.to_vec(),
        });
        Ok(Some(record))
    }

    /// Queue fields for the next record this object builds. Repeated calls
    /// accumulate; later keys win.
    pub fn set_event_data(&self, fields: ValueMap) {
        self.cell().events.pending.borrow_mut().extend(fields);
    }

    /// Whether `name` has fired since its observable was created.
    pub fn is_event_triggered(&self, name: &str) -> bool {
        self.cell()
            .events
            .events
            .borrow()
            .get(name)
            .is_some_and(Observable::is_triggered)
    }

    pub fn has_listeners(&self, name: &str) -> bool {
        self.listener_count(name) > 0
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.cell()
            .events
            .events
            .borrow()
            .get(name)
            .map_or(0, Observable::len)
    }
}

// =============================================================================
// Binding (source side)
// =============================================================================

impl Object {
    /// Subscribe `callback` to `name` on this object.
    ///
    /// When `context` is given, the subscription is also recorded in the
    /// context's reverse table so the context can detach itself later.
    /// Binding on a torn-down object (or for a torn-down context) returns an
    /// id that is not attached to anything.
    pub fn bind_event(
        &self,
        name: &str,
        callback: impl Fn(&EventRecord, &[Value]) + 'static,
        context: Option<&Object>,
    ) -> SubscriptionId {
        let callback: Callback<Delivery> =
            Rc::new(move |delivery: &Delivery| callback(&delivery.record, &delivery.extra));
        self.bind_delivery(name, callback, context)
    }

    fn bind_delivery(
        &self,
        name: &str,
        callback: Callback<Delivery>,
        context: Option<&Object>,
    ) -> SubscriptionId {
        if self.is_torn_down() {
            tracing::warn!(event = name, "bind_event on torn-down object ignored");
            return next_subscription_id();
        }

        let observable = self
            .cell()
            .events
            .events
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .clone();
        let id = observable.bind_rc(callback);

        self.cell().events.subscriptions.borrow_mut().insert(
            id,
            Subscription {
                id,
                event: name.to_string(),
                observable,
                subscriber: context.map(Object::downgrade),
            },
        );

        if let Some(context) = context {
            if !context.bind_to(id, self) {
                self.unbind_event(id);
            }
        }

        tracing::trace!(event = name, id = %id, source = ?self.id(), "bind");
        id
    }

    /// Remove a subscription made on this object. Unknown ids are ignored.
    pub fn unbind_event(&self, id: SubscriptionId) -> bool {
        let subscription = self.cell().events.subscriptions.borrow_mut().remove(&id);
        let Some(subscription) = subscription else {
            return false;
        };

        if let Some(subscriber) = subscription.subscriber() {
            subscriber.unbind_to(id);
        }
        subscription.observable.unbind(id);
        tracing::trace!(event = %subscription.event, id = %id, "unbind");
        true
    }

    /// Drop every observable and subscription on this object, telling each
    /// subscriber to forget its reverse entry.
    pub fn unbind_all(&self) {
        let subscriptions = std::mem::take(&mut *self.cell().events.subscriptions.borrow_mut());
        let events = std::mem::take(&mut *self.cell().events.events.borrow_mut());

        for (id, subscription) in &subscriptions {
            if let Some(subscriber) = subscription.subscriber() {
                subscriber.unbind_to(*id);
            }
        }
        for observable in events.values() {
            observable.unbind_all();
        }
    }

    /// Subscriptions currently recorded on this object.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        let mut subscriptions: Vec<Subscription> = self
            .cell()
            .events
            .subscriptions
            .borrow()
            .values()
            .cloned()
            .collect();
        subscriptions.sort_by_key(|s| s.id);
        subscriptions
    }

    /// Re-trigger `names` from `source` on this object, reusing the same
    /// record. The record keeps `source` as its original target.
    pub fn proxy_events(&self, source: &Object, names: &[&str]) -> Vec<SubscriptionId> {
        names
            .iter()
            .map(|name| {
                let this = self.downgrade();
                let callback: Callback<Delivery> = Rc::new(move |delivery: &Delivery| {
                    let Some(this) = this.upgrade() else { return };
                    let seed = EventSeed::Record(Rc::clone(&delivery.record));
                    if let Err(err) = this.trigger_event(seed, &delivery.extra) {
                        tracing::warn!(error = %err, "proxied event dropped");
                    }
                });
                source.bind_delivery(name, callback, Some(self))
            })
            .collect()
    }
}

// =============================================================================
// Binding (subscriber side)
// =============================================================================

impl Object {
    /// Record that this object holds subscription `id` on `source`.
    /// Refused once this object is torn down.
    pub fn bind_to(&self, id: SubscriptionId, source: &Object) -> bool {
        if self.is_torn_down() {
            return false;
        }
        self.cell()
            .events
            .bound_to
            .borrow_mut()
            .insert(id, source.downgrade());
        true
    }

    /// Forget reverse entry `id`. Does not touch the source.
    pub fn unbind_to(&self, id: SubscriptionId) -> bool {
        self.cell().events.bound_to.borrow_mut().remove(&id).is_some()
    }

    /// Ask every source this object listens to to drop the subscription.
    pub fn unbind_to_all(&self) {
        let bound_to = std::mem::take(&mut *self.cell().events.bound_to.borrow_mut());
        for (id, source) in bound_to {
            if let Some(source) = source.upgrade() {
                source.unbind_event(id);
            }
        }
    }

    /// Number of subscriptions this object holds on others (itself included).
    pub fn bound_to_count(&self) -> usize {
        self.cell().events.bound_to.borrow().len()
    }
}
