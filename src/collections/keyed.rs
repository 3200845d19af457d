//! Keyed collection - items stored by id.
//!
//! The collection is an [`Object`] of class `CollectionHash` (or a subclass)
//! plus an id -> item table. Listeners bind on [`KeyedCollection::object`]
//! like on any other object.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use spark_signals::{Signal, signal};

use super::{
    CollectionChange, CollectionItem, ON_BEFORE_INSERT, ON_BEFORE_REMOVE, ON_INSERT, ON_REMOVE,
    collection_hash_class,
};
use crate::config::Config;
use crate::engine::{Class, Object, next_cid};
use crate::error::{Error, Result};
use crate::events::{EventRecord, EventSeed};
use crate::types::{Cid, SubscriptionId, Value};

/// Id-keyed store that announces every insert and removal.
pub struct KeyedCollection<T: CollectionItem> {
    object: Object,
    items: Rc<RefCell<HashMap<Cid, T>>>,
    count: Signal<usize>,
}

impl<T: CollectionItem> Clone for KeyedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            object: self.object.clone(),
            items: Rc::clone(&self.items),
            count: self.count.clone(),
        }
    }
}

impl<T: CollectionItem> KeyedCollection<T> {
    /// Create a `CollectionHash`.
    pub fn create(config: Config) -> Result<Self> {
        Self::with_class(&collection_hash_class(), config)
    }

    /// Create with a custom class, usually a subclass of `CollectionHash`
    /// carrying its own event map or plugins.
    pub fn with_class(class: &Rc<Class>, config: Config) -> Result<Self> {
        let object = Object::create(class, config)?;
        let items: Rc<RefCell<HashMap<Cid, T>>> = Rc::new(RefCell::new(HashMap::new()));
        let count = signal(0usize);

        let teardown_items = Rc::clone(&items);
        let teardown_count = count.clone();
        object.bind_event(
            "onTeardown",
            move |_, _| {
                let dropped = std::mem::take(&mut *teardown_items.borrow_mut());
                teardown_count.set(0);
                drop(dropped);
            },
            None,
        );

        Ok(Self {
            object,
            items,
            count,
        })
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Insert under the item's embedded id, or a generated one.
    ///
    /// Returns the id, or `None` when an `onBeforeInsert` listener prevented
    /// the insert.
    pub fn insert(&self, item: T) -> Result<Option<Cid>> {
        let id = item.embedded_id().unwrap_or_else(next_cid);
        self.insert_entry(id, item, None, |_| {})
    }

    /// Insert under an explicit id.
    pub fn insert_with_id(&self, id: impl Into<Cid>, item: T) -> Result<Option<Cid>> {
        self.insert_entry(id.into(), item, None, |_| {})
    }

    /// Remove by id. Absent ids (and prevented removals) return `None`
    /// without side effects.
    pub fn remove(&self, id: impl AsRef<str>) -> Option<T> {
        self.remove_entry(id.as_ref(), None, false, |_| {})
    }

    /// Remove every item, honouring `onBeforeRemove` prevention. Returns how
    /// many were removed.
    pub fn clear(&self) -> usize {
        self.ids()
            .iter()
            .filter(|id| self.remove_entry(id.as_str(), None, false, |_| {}).is_some())
            .count()
    }

    /// Remove every item; prevention is ignored.
    pub fn clear_forced(&self) -> usize {
        self.ids()
            .iter()
            .filter(|id| self.remove_entry(id.as_str(), None, true, |_| {}).is_some())
            .count()
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn get(&self, id: impl AsRef<str>) -> Option<T> {
        self.items.borrow().get(id.as_ref()).cloned()
    }

    pub fn contains(&self, id: impl AsRef<str>) -> bool {
        self.items.borrow().contains_key(id.as_ref())
    }

    pub fn get_count(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// All ids, sorted.
    pub fn ids(&self) -> Vec<Cid> {
        let mut ids: Vec<Cid> = self.items.borrow().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// All items, in [`KeyedCollection::ids`] order.
    pub fn values(&self) -> Vec<T> {
        let items = self.items.borrow();
        self.ids()
            .iter()
            .filter_map(|id| items.get(id).cloned())
            .collect()
    }

    /// The object the collection events fire on.
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Reactive mirror of [`KeyedCollection::get_count`].
    pub fn count_signal(&self) -> Signal<usize> {
        self.count.clone()
    }

    /// Shorthand for `object().bind_event(..)`.
    pub fn bind_event(
        &self,
        name: &str,
        callback: impl Fn(&EventRecord, &[Value]) + 'static,
        context: Option<&Object>,
    ) -> SubscriptionId {
        self.object.bind_event(name, callback, context)
    }

    /// Tear down the collection object. Items are dropped.
    pub fn teardown(&self) {
        self.object.teardown();
    }

    // -------------------------------------------------------------------------
    // Shared with OrderedCollection
    // -------------------------------------------------------------------------

    /// Insert `item` under `id`. `place` runs after the item is stored and
    /// before `onInsert` fires.
    pub(crate) fn insert_entry(
        &self,
        id: Cid,
        item: T,
        index: Option<usize>,
        place: impl FnOnce(&Cid),
    ) -> Result<Option<Cid>> {
        if self.object.is_torn_down() {
            return Err(Error::NotInitialized {
                operation: "insert",
            });
        }
        if self.contains(&id) {
            return Err(Error::DuplicateKey { id });
        }

        let change = CollectionChange {
            collection: self.object.downgrade(),
            id: id.clone(),
            item: item.clone(),
            index,
            previous_item: None,
        };
        if let Some(record) = self.announce(ON_BEFORE_INSERT, change.clone()) {
            if record.is_default_prevented() {
                tracing::debug!(id = %id, "insert prevented");
                return Ok(None);
            }
        }
        // A before-listener may have stored the same id in the meantime.
        if self.contains(&id) {
            return Err(Error::DuplicateKey { id });
        }

        self.items.borrow_mut().insert(id.clone(), item);
        place(&id);
        self.sync_count();
        self.announce(ON_INSERT, change);
        Ok(Some(id))
    }

    /// Remove `id`. `unplace` runs after the item is dropped from the table
    /// and before `onRemove` fires.
    pub(crate) fn remove_entry(
        &self,
        id: &str,
        index: Option<usize>,
        force: bool,
        unplace: impl FnOnce(&Cid),
    ) -> Option<T> {
        let item = self.get(id)?;
        let id = Cid::from(id);
        let change = CollectionChange {
            collection: self.object.downgrade(),
            id: id.clone(),
            item: item.clone(),
            index,
            previous_item: Some(item),
        };

        if let Some(record) = self.announce(ON_BEFORE_REMOVE, change.clone()) {
            if record.is_default_prevented() && !force {
                tracing::debug!(id = %id, "remove prevented");
                return None;
            }
        }

        let removed = self.items.borrow_mut().remove(&id)?;
        unplace(&id);
        self.sync_count();
        self.announce(ON_REMOVE, change);
        Some(removed)
    }

    fn announce(&self, event: &str, change: CollectionChange<T>) -> Option<Rc<EventRecord>> {
        let mut seed = EventSeed::new(event).with_field("id", change.id.clone());
        if let Some(index) = change.index {
            seed = seed.with_field("index", index);
        }
        match self.object.trigger_event(seed.with_payload(change), &[]) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(event, error = %err, "collection event failed");
                None
            }
        }
    }

    fn sync_count(&self) {
        let count = self.get_count();
        if self.count.get() != count {
            self.count.set(count);
        }
    }
}
