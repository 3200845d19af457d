//! Event records - the value delivered to subscribers on trigger.
//!
//! A record is built once per `trigger_event` and shared (`Rc`) by every
//! subscriber. Handlers may still call [`EventRecord::prevent_default`] or add
//! fields; the code that triggered the event inspects the record afterwards.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use web_time::SystemTime;

use crate::engine::{Object, WeakObject};
use crate::error::{Error, Result};
use crate::types::{Value, ValueMap};

bitflags::bitflags! {
    /// Record status bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RecordFlags: u8 {
        const NONE = 0;
        /// A handler asked the triggering code to skip its default action.
        const PREVENTED = 1 << 0;
        /// The record was re-triggered by a proxying object.
        const PROXIED = 1 << 1;
    }
}

// =============================================================================
// EventSeed
// =============================================================================

/// What `trigger_event` builds its record from.
#[derive(Clone)]
pub enum EventSeed {
    /// Just an event type.
    Name(String),
    /// A type plus initial fields and an optional typed payload.
    Fields {
        event_type: Option<String>,
        fields: ValueMap,
        payload: Option<Rc<dyn Any>>,
    },
    /// An existing record, re-delivered (proxying).
    Record(Rc<EventRecord>),
}

impl EventSeed {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self::Fields {
            event_type: Some(event_type.into()),
            fields: ValueMap::new(),
            payload: None,
        }
    }

    /// Seed from a JSON value: a string is the type, an object supplies
    /// `type` plus fields.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(name) => Self::Name(name),
            Value::Object(mut fields) => {
                let event_type = match fields.remove("type") {
                    Some(Value::String(name)) => Some(name),
                    _ => None,
                };
                Self::Fields {
                    event_type,
                    fields,
                    payload: None,
                }
            }
            _ => Self::Fields {
                event_type: None,
                fields: ValueMap::new(),
                payload: None,
            },
        }
    }

    pub fn with_field(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let (event_type, mut fields, payload) = self.into_parts();
        fields.insert(key.into(), value.into());
        Self::Fields {
            event_type,
            fields,
            payload,
        }
    }

    pub fn with_payload<T: Any>(self, payload: T) -> Self {
        let (event_type, fields, _) = self.into_parts();
        Self::Fields {
            event_type,
            fields,
            payload: Some(Rc::new(payload)),
        }
    }

    /// The event name this seed resolves to, if any.
    pub fn event_type(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Fields { event_type, .. } => event_type.as_deref(),
            Self::Record(record) => Some(record.event_type()),
        }
    }

    fn into_parts(self) -> (Option<String>, ValueMap, Option<Rc<dyn Any>>) {
        match self {
            Self::Name(name) => (Some(name), ValueMap::new(), None),
            Self::Fields {
                event_type,
                fields,
                payload,
            } => (event_type, fields, payload),
            Self::Record(record) => (
                Some(record.event_type.clone()),
                record.fields(),
                record.payload.clone(),
            ),
        }
    }
}

impl From<&str> for EventSeed {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl From<String> for EventSeed {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl From<Rc<EventRecord>> for EventSeed {
    fn from(value: Rc<EventRecord>) -> Self {
        Self::Record(value)
    }
}

impl fmt::Debug for EventSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Self::Fields {
                event_type,
                fields,
                payload,
            } => f
                .debug_struct("Fields")
                .field("event_type", event_type)
                .field("fields", fields)
                .field("has_payload", &payload.is_some())
                .finish(),
            Self::Record(record) => f.debug_tuple("Record").field(record).finish(),
        }
    }
}

// =============================================================================
// EventRecord
// =============================================================================

pub struct EventRecord {
    event_type: String,
    timestamp: SystemTime,
    target: RefCell<Option<WeakObject>>,
    original_target: RefCell<Option<WeakObject>>,
    flags: Cell<RecordFlags>,
    fields: RefCell<ValueMap>,
    payload: Option<Rc<dyn Any>>,
}

impl EventRecord {
    /// Fails with [`Error::InvalidEventType`] when `event_type` is empty.
    pub fn new(event_type: impl Into<String>) -> Result<Self> {
        Self::build(Some(event_type.into()), ValueMap::new(), None)
    }

    /// Build a record from a seed. A `Record` seed is handed back unchanged.
    pub fn from_seed(seed: EventSeed) -> Result<Rc<Self>> {
        match seed {
            EventSeed::Record(record) => Ok(record),
            other => {
                let (event_type, fields, payload) = other.into_parts();
                Self::build(event_type, fields, payload).map(Rc::new)
            }
        }
    }

    fn build(
        event_type: Option<String>,
        fields: ValueMap,
        payload: Option<Rc<dyn Any>>,
    ) -> Result<Self> {
        let event_type = event_type
            .filter(|name| !name.is_empty())
            .ok_or(Error::InvalidEventType)?;

        Ok(Self {
            event_type,
            timestamp: SystemTime::now(),
            target: RefCell::new(None),
            original_target: RefCell::new(None),
            flags: Cell::new(RecordFlags::NONE),
            fields: RefCell::new(fields),
            payload,
        })
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    pub fn flags(&self) -> RecordFlags {
        self.flags.get()
    }

    // -------------------------------------------------------------------------
    // Targets
    // -------------------------------------------------------------------------

    /// The object currently delivering this record.
    pub fn target(&self) -> Option<Object> {
        self.target.borrow().as_ref().and_then(WeakObject::upgrade)
    }

    /// The object that first delivered this record, once it has been proxied.
    pub fn original_target(&self) -> Option<Object> {
        self.original_target
            .borrow()
            .as_ref()
            .and_then(WeakObject::upgrade)
    }

    /// Point the record at `target`. The first target seen is kept as the
    /// original target.
    pub fn retarget(&self, target: &Object) {
        let previous = self.target.replace(Some(target.downgrade()));
        if let Some(previous) = previous {
            if previous.ptr_eq(&target.downgrade()) {
                return;
            }
            let mut original = self.original_target.borrow_mut();
            if original.is_none() {
                *original = Some(previous);
            }
            self.flags.set(self.flags.get() | RecordFlags::PROXIED);
        }
    }

    // -------------------------------------------------------------------------
    // Default action
    // -------------------------------------------------------------------------

    pub fn prevent_default(&self) {
        self.flags.set(self.flags.get() | RecordFlags::PREVENTED);
    }

    pub fn is_default_prevented(&self) -> bool {
        self.flags.get().contains(RecordFlags::PREVENTED)
    }

    // -------------------------------------------------------------------------
    // Fields
    // -------------------------------------------------------------------------

    pub fn get(&self, key: &str) -> Option<Value> {
        self.fields.borrow().get(key).cloned()
    }

    pub fn fields(&self) -> ValueMap {
        self.fields.borrow().clone()
    }

    pub fn set_field(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.borrow_mut().insert(key.into(), value.into());
    }

    /// Merge `fields` in; later keys overwrite.
    pub fn merge_fields(&self, fields: ValueMap) {
        self.fields.borrow_mut().extend(fields);
    }

    /// Typed payload attached by the triggering code.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRecord")
            .field("event_type", &self.event_type)
            .field("timestamp", &self.timestamp)
            .field("target", &self.target().and_then(|t| t.id()))
            .field(
                "original_target",
                &self.original_target().and_then(|t| t.id()),
            )
            .field("flags", &self.flags.get())
            .field("fields", &self.fields.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_type_is_rejected() {
        assert_eq!(EventRecord::new("").err(), Some(Error::InvalidEventType));
        assert!(matches!(
            EventRecord::from_seed(EventSeed::from_value(json!({ "id": 1 }))),
            Err(Error::InvalidEventType)
        ));
    }

    #[test]
    fn test_seed_from_value() {
        let record =
            EventRecord::from_seed(EventSeed::from_value(json!({ "type": "onSave", "dirty": true })))
                .unwrap();
        assert_eq!(record.event_type(), "onSave");
        assert_eq!(record.get("dirty"), Some(json!(true)));
        assert!(record.get("type").is_none());
    }

    #[test]
    fn test_prevent_default() {
        let record = EventRecord::new("onBeforeInsert").unwrap();
        assert!(!record.is_default_prevented());
        record.prevent_default();
        assert!(record.is_default_prevented());
        assert!(record.flags().contains(RecordFlags::PREVENTED));
    }

    #[test]
    fn test_typed_payload() {
        let seed = EventSeed::new("onMove").with_field("index", 3).with_payload((4u8, "x"));
        let record = EventRecord::from_seed(seed).unwrap();
        assert_eq!(record.payload::<(u8, &'static str)>(), Some(&(4u8, "x")));
        assert!(record.payload::<String>().is_none());
        assert_eq!(record.get("index"), Some(json!(3)));
    }

    #[test]
    fn test_record_seed_is_passed_through() {
        let record = Rc::new(EventRecord::new("onChange").unwrap());
        let again = EventRecord::from_seed(EventSeed::from(record.clone())).unwrap();
        assert!(Rc::ptr_eq(&record, &again));
    }
}
