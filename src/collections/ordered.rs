//! Ordered collection - a keyed collection plus an id order.
//!
//! The order list and the id table always hold the same ids: every insert
//! and removal goes through [`KeyedCollection`], which updates the order in
//! between storing the item and announcing it.

use std::cell::RefCell;
use std::rc::Rc;

use spark_signals::Signal;

use super::{
    CollectionItem, KeyedCollection, collection_array_class, resolve_insert_index,
    resolve_lookup_index,
};
use crate::config::Config;
use crate::engine::{Class, Object, next_cid};
use crate::error::Result;
use crate::events::EventRecord;
use crate::types::{Cid, SubscriptionId, Value};

/// Position argument for [`OrderedCollection::get`] and
/// [`OrderedCollection::remove`]. Negative indices count from the end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum At {
    Index(isize),
    Id(Cid),
}

impl From<isize> for At {
    fn from(index: isize) -> Self {
        At::Index(index)
    }
}

impl From<i32> for At {
    fn from(index: i32) -> Self {
        At::Index(index as isize)
    }
}

impl From<usize> for At {
    fn from(index: usize) -> Self {
        At::Index(isize::try_from(index).unwrap_or(isize::MAX))
    }
}

impl From<Cid> for At {
    fn from(id: Cid) -> Self {
        At::Id(id)
    }
}

impl From<&Cid> for At {
    fn from(id: &Cid) -> Self {
        At::Id(id.clone())
    }
}

impl From<&str> for At {
    fn from(id: &str) -> Self {
        At::Id(Cid::from(id))
    }
}

/// Ordered, id-addressable store that announces every insert and removal.
pub struct OrderedCollection<T: CollectionItem> {
    keyed: KeyedCollection<T>,
    order: Rc<RefCell<Vec<Cid>>>,
}

impl<T: CollectionItem> Clone for OrderedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            keyed: self.keyed.clone(),
            order: Rc::clone(&self.order),
        }
    }
}

impl<T: CollectionItem> OrderedCollection<T> {
    /// Create a `CollectionArray`.
    pub fn create(config: Config) -> Result<Self> {
        Self::with_class(&collection_array_class(), config)
    }

    pub fn with_class(class: &Rc<Class>, config: Config) -> Result<Self> {
        let keyed = KeyedCollection::with_class(class, config)?;
        let order: Rc<RefCell<Vec<Cid>>> = Rc::new(RefCell::new(Vec::new()));

        let teardown_order = Rc::clone(&order);
        keyed.bind_event(
            "onTeardown",
            move |_, _| teardown_order.borrow_mut().clear(),
            None,
        );

        Ok(Self { keyed, order })
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Insert at `index` (`None` appends, negatives count from the end and
    /// out-of-range positions clamp). Returns the id, or `None` when
    /// prevented.
    pub fn insert(&self, item: T, index: Option<isize>) -> Result<Option<Cid>> {
        let id = item.embedded_id().unwrap_or_else(next_cid);
        self.insert_with_id(id, item, index)
    }

    pub fn insert_with_id(
        &self,
        id: impl Into<Cid>,
        item: T,
        index: Option<isize>,
    ) -> Result<Option<Cid>> {
        let position = resolve_insert_index(index, self.get_count());
        let order = Rc::clone(&self.order);
        self.keyed.insert_entry(id.into(), item, Some(position), move |id| {
            let mut order = order.borrow_mut();
            let position = position.min(order.len());
            order.insert(position, id.clone());
        })
    }

    /// Append.
    pub fn push(&self, item: T) -> Result<Option<Cid>> {
        self.insert(item, None)
    }

    /// Remove by position or id. Out-of-range positions, unknown ids and
    /// prevented removals return `None`.
    pub fn remove(&self, at: impl Into<At>) -> Option<T> {
        self.remove_at(at.into(), false)
    }

    /// Remove every item front to back, honouring prevention. Returns how
    /// many were removed.
    pub fn clear(&self) -> usize {
        self.ids()
            .into_iter()
            .filter(|id| self.remove_at(At::Id(id.clone()), false).is_some())
            .count()
    }

    /// Remove every item; prevention is ignored.
    pub fn clear_forced(&self) -> usize {
        self.ids()
            .into_iter()
            .filter(|id| self.remove_at(At::Id(id.clone()), true).is_some())
            .count()
    }

    fn remove_at(&self, at: At, force: bool) -> Option<T> {
        let (id, position) = self.resolve(at)?;
        let order = Rc::clone(&self.order);
        self.keyed
            .remove_entry(id.as_str(), Some(position), force, move |id| {
                order.borrow_mut().retain(|entry| entry != id);
            })
    }

    fn resolve(&self, at: At) -> Option<(Cid, usize)> {
        let order = self.order.borrow();
        match at {
            At::Index(index) => {
                let position = resolve_lookup_index(index, order.len())?;
                Some((order[position].clone(), position))
            }
            At::Id(id) => {
                let position = order.iter().position(|entry| *entry == id)?;
                Some((id, position))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Look up by position (negatives count from the end) or id.
    pub fn get(&self, at: impl Into<At>) -> Option<T> {
        match at.into() {
            At::Id(id) => self.keyed.get(&id),
            At::Index(index) => {
                let id = self.id_at(index)?;
                self.keyed.get(&id)
            }
        }
    }

    /// All items in order.
    pub fn get_array(&self) -> Vec<T> {
        self.order
            .borrow()
            .iter()
            .filter_map(|id| self.keyed.get(id))
            .collect()
    }

    pub fn index_of(&self, id: impl AsRef<str>) -> Option<usize> {
        let id = id.as_ref();
        self.order.borrow().iter().position(|entry| entry.as_str() == id)
    }

    pub fn id_at(&self, index: isize) -> Option<Cid> {
        let order = self.order.borrow();
        resolve_lookup_index(index, order.len()).map(|position| order[position].clone())
    }

    pub fn first(&self) -> Option<T> {
        self.get(0isize)
    }

    pub fn last(&self) -> Option<T> {
        self.get(-1isize)
    }

    /// Ids in order.
    pub fn ids(&self) -> Vec<Cid> {
        self.order.borrow().clone()
    }

    pub fn contains(&self, id: impl AsRef<str>) -> bool {
        self.keyed.contains(id)
    }

    pub fn get_count(&self) -> usize {
        self.keyed.get_count()
    }

    pub fn is_empty(&self) -> bool {
        self.keyed.is_empty()
    }

    pub fn object(&self) -> &Object {
        self.keyed.object()
    }

    pub fn count_signal(&self) -> Signal<usize> {
        self.keyed.count_signal()
    }

    pub fn bind_event(
        &self,
        name: &str,
        callback: impl Fn(&EventRecord, &[Value]) + 'static,
        context: Option<&Object>,
    ) -> SubscriptionId {
        self.keyed.bind_event(name, callback, context)
    }

    pub fn teardown(&self) {
        self.keyed.teardown();
    }
}
