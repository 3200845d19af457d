//! Collections - event-emitting containers built on objects.
//!
//! - **KeyedCollection** - items by id (`CollectionHash`)
//! - **OrderedCollection** - items by id plus an order (`CollectionArray`)
//!
//! Every mutation fires a cancellable `onBefore*` event and, if not
//! prevented, an `on*` event afterwards. Both carry a [`CollectionChange`]
//! payload and mirror its `id`/`index` as record fields:
//!
//! ```text
//! insert:  onBeforeInsert --(prevented?)--> store --> onInsert
//! remove:  onBeforeRemove --(prevented?)--> drop  --> onRemove
//! ```

mod index;
mod keyed;
mod ordered;

use std::rc::Rc;

use crate::engine::{Class, Object, WeakObject, base_class};
use crate::types::{Cid, Value};

pub use index::*;
pub use keyed::*;
pub use ordered::*;

// =============================================================================
// Event names
// =============================================================================

pub const ON_BEFORE_INSERT: &str = "onBeforeInsert";
pub const ON_INSERT: &str = "onInsert";
pub const ON_BEFORE_REMOVE: &str = "onBeforeRemove";
pub const ON_REMOVE: &str = "onRemove";

// =============================================================================
// Classes
// =============================================================================

thread_local! {
    static COLLECTION_HASH: Rc<Class> = Class::extend(&base_class(), "CollectionHash").finish();
    static COLLECTION_ARRAY: Rc<Class> =
        COLLECTION_HASH.with(|hash| Class::extend(hash, "CollectionArray").finish());
}

/// `CollectionHash`, the class behind [`KeyedCollection`].
pub fn collection_hash_class() -> Rc<Class> {
    COLLECTION_HASH.with(Rc::clone)
}

/// `CollectionArray`, the class behind [`OrderedCollection`]. Extends
/// `CollectionHash`.
pub fn collection_array_class() -> Rc<Class> {
    COLLECTION_ARRAY.with(Rc::clone)
}

// =============================================================================
// Items
// =============================================================================

/// Something a collection can hold.
///
/// Items that carry their own id are stored under it; everything else gets
/// a generated cid on insert.
pub trait CollectionItem: Clone + 'static {
    fn embedded_id(&self) -> Option<Cid> {
        None
    }
}

/// JSON objects may carry their id under `"cid"` (string or number).
impl CollectionItem for Value {
    fn embedded_id(&self) -> Option<Cid> {
        match self.get("cid")? {
            Value::String(id) if !id.is_empty() => Some(Cid::from(id.as_str())),
            Value::Number(id) => Some(Cid::from(id.to_string())),
            _ => None,
        }
    }
}

impl CollectionItem for Object {
    fn embedded_id(&self) -> Option<Cid> {
        self.id()
    }
}

impl CollectionItem for String {}

// =============================================================================
// Change payload
// =============================================================================

/// Payload of every collection event.
///
/// `index` is only set by ordered collections. `previous_item` is set on
/// removals. `collection` stays the originating collection when a proxy
/// re-triggers the record.
#[derive(Clone, Debug)]
pub struct CollectionChange<T> {
    pub collection: WeakObject,
    pub id: Cid,
    pub item: T,
    pub index: Option<usize>,
    pub previous_item: Option<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_class_chain() {
        assert_eq!(collection_hash_class().chain(), vec!["CollectionHash", "AObject"]);
        assert_eq!(
            collection_array_class().chain(),
            vec!["CollectionArray", "CollectionHash", "AObject"]
        );
        assert!(collection_array_class().is_a("CollectionHash"));
        assert!(!collection_hash_class().is_a("CollectionArray"));
    }

    #[test]
    fn test_value_embedded_id() {
        assert_eq!(json!({"cid": "a"}).embedded_id(), Some(Cid::from("a")));
        assert_eq!(json!({"cid": 7}).embedded_id(), Some(Cid::from("7")));
        assert_eq!(json!({"cid": ""}).embedded_id(), None);
        assert_eq!(json!({"name": "x"}).embedded_id(), None);
        assert_eq!(json!("plain").embedded_id(), None);
    }

    #[test]
    fn test_string_has_no_embedded_id() {
        assert_eq!("x".to_string().embedded_id(), None);
    }
}
