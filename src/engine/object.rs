//! Base object - id, config, children and the init/teardown lifecycle.
//!
//! ```text
//! Unconstructed --init--> Initialized --teardown--> TornDown
//! ```
//!
//! # Init
//!
//! 1. Assign the id (from config or the id generator)
//! 2. Store the config and register already-attached plugins as children
//! 3. Import config keys declared by the class chain onto the instance
//! 4. Bind the class chain's event map
//! 5. Run init hooks, root class first
//! 6. Fire `onInit`
//!
//! # Teardown
//!
//! Fires `onTeardown`, drops every binding in both directions
//! (`unbind_all` + `unbind_to_all`), tears down still-registered children,
//! then clears id, config, fields and references. Calling it twice is a
//! no-op.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::{Config, CreatePolicy, settings};
use crate::error::{Error, Result};
use crate::events::Observables;
use crate::types::{Cid, LifecycleState, SubscriptionId, Value, ValueMap};

use super::class::{Class, Method};
use super::ids::next_cid;
use super::plugin;

// =============================================================================
// Handles
// =============================================================================

/// Shared handle to an object. Clones refer to the same object.
#[derive(Clone)]
pub struct Object {
    cell: Rc<ObjectCell>,
}

/// Non-owning handle, used for back-references (plugin owner, subscribers).
#[derive(Clone)]
pub struct WeakObject {
    cell: Weak<ObjectCell>,
}

pub(crate) struct ObjectCell {
    class: Rc<Class>,
    state: Cell<LifecycleState>,
    id: RefCell<Option<Cid>>,
    config: RefCell<Option<Config>>,
    fields: RefCell<ValueMap>,
    refs: RefCell<HashMap<String, Object>>,
    children: RefCell<Vec<ChildEntry>>,
    methods: RefCell<HashMap<String, Method>>,
    plugins: RefCell<Vec<Object>>,
    owner: RefCell<Option<WeakObject>>,
    pub(crate) events: Observables,
}

/// A registered child plus the parent's `onTeardown` watch on it.
struct ChildEntry {
    id: Cid,
    object: Object,
    watch: SubscriptionId,
}

impl WeakObject {
    pub fn upgrade(&self) -> Option<Object> {
        self.cell.upgrade().map(|cell| Object { cell })
    }

    pub fn ptr_eq(&self, other: &WeakObject) -> bool {
        Weak::ptr_eq(&self.cell, &other.cell)
    }
}

impl fmt::Debug for WeakObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(object) => f.debug_tuple("WeakObject").field(&object).finish(),
            None => f.write_str("WeakObject(<dropped>)"),
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl Eq for Object {}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.cell.class.name())
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

// =============================================================================
// Creation
// =============================================================================

impl Object {
    /// Instantiate `class`, attach plugins (those declared on the class
    /// chain first, then `config.plugins`), then initialize.
    ///
    /// If an init hook fails, the runtime's [`CreatePolicy`] decides between
    /// returning the error and returning the uninitialized instance.
    pub fn create(class: &Rc<Class>, config: Config) -> Result<Object> {
        Self::create_owned(class, config, None)
    }

    pub(crate) fn create_owned(
        class: &Rc<Class>,
        config: Config,
        owner: Option<&Object>,
    ) -> Result<Object> {
        let object = Self::instantiate(class);
        if let Some(owner) = owner {
            *object.cell.owner.borrow_mut() = Some(owner.downgrade());
        }

        let mut specs = class.collect_plugins();
        specs.extend(config.plugins.iter().cloned());

        let mut plugins = Vec::with_capacity(specs.len());
        for spec in &specs {
            match plugin::attach(&object, spec) {
                Ok(attached) => plugins.push(attached),
                Err(err) => {
                    for attached in plugins {
                        attached.teardown();
                    }
                    return Err(err);
                }
            }
        }
        *object.cell.plugins.borrow_mut() = plugins;

        match object.init(config) {
            Ok(()) => Ok(object),
            Err(err) => match settings().create_policy {
                CreatePolicy::Propagate => {
                    tracing::debug!(class = class.name(), error = %err, "create failed");
                    object.teardown();
                    Err(err)
                }
                CreatePolicy::Degrade => {
                    tracing::error!(
                        class = class.name(),
                        error = %err,
                        "constructor failed; returning uninitialized instance"
                    );
                    Ok(object)
                }
            },
        }
    }

    fn instantiate(class: &Rc<Class>) -> Object {
        Object {
            cell: Rc::new(ObjectCell {
                class: Rc::clone(class),
                state: Cell::new(LifecycleState::Unconstructed),
                id: RefCell::new(None),
                config: RefCell::new(None),
                fields: RefCell::new(ValueMap::new()),
                refs: RefCell::new(HashMap::new()),
                children: RefCell::new(Vec::new()),
                methods: RefCell::new(HashMap::new()),
                plugins: RefCell::new(Vec::new()),
                owner: RefCell::new(None),
                events: Observables::default(),
            }),
        }
    }

    fn init(&self, config: Config) -> Result<()> {
        if self.state() != LifecycleState::Unconstructed {
            return Err(Error::NotInitialized { operation: "init" });
        }

        let class = Rc::clone(&self.cell.class);
        let id = config.id.clone().unwrap_or_else(next_cid);
        *self.cell.id.borrow_mut() = Some(id.clone());

        let plugins = self.plugins();
        for plugin in &plugins {
            self.add_child(plugin);
        }

        for name in class.collect_import_config() {
            if let Some(value) = config.values.get(&name).filter(|v| !v.is_null()) {
                self.cell.fields.borrow_mut().insert(name.clone(), value.clone());
            }
            if let Some(object) = config.objects.get(&name) {
                self.cell.refs.borrow_mut().insert(name, object.clone());
            }
        }

        *self.cell.config.borrow_mut() = Some(config.clone());

        for entry in class.collect_event_map() {
            let target = match &entry.field {
                None => self.clone(),
                Some(field) => match self.get_ref(field) {
                    Some(target) => target,
                    None => {
                        tracing::warn!(
                            class = class.name(),
                            event = %entry.event,
                            field = %field,
                            "event map target field is empty; skipping"
                        );
                        continue;
                    }
                },
            };
            let this = self.downgrade();
            let handler = entry.handler;
            target.bind_event(
                &entry.event,
                move |record, extra| {
                    if let Some(this) = this.upgrade() {
                        handler(&this, record, extra);
                    }
                },
                Some(self),
            );
        }

        for hook in class.collect_init_hooks() {
            hook(self, &config)?;
        }

        self.cell.state.set(LifecycleState::Initialized);
        tracing::debug!(class = class.name(), id = %id, "object initialized");

        self.trigger_event("onInit", &[])?;
        Ok(())
    }
}

// =============================================================================
// Accessors
// =============================================================================

impl Object {
    pub(crate) fn cell(&self) -> &ObjectCell {
        &self.cell
    }

    pub fn downgrade(&self) -> WeakObject {
        WeakObject {
            cell: Rc::downgrade(&self.cell),
        }
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    pub fn id(&self) -> Option<Cid> {
        self.cell.id.borrow().clone()
    }

    pub fn state(&self) -> LifecycleState {
        self.cell.state.get()
    }

    pub fn is_torn_down(&self) -> bool {
        self.state() == LifecycleState::TornDown
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.cell.class
    }

    pub fn config(&self) -> Option<Config> {
        self.cell.config.borrow().clone()
    }

    pub fn config_value(&self, key: &str) -> Option<Value> {
        self.cell
            .config
            .borrow()
            .as_ref()
            .and_then(|config| config.get(key).cloned())
    }

    /// Visit the object's class, then each ancestor.
    pub fn walk_chain(&self, visit: impl FnMut(&Class)) {
        self.cell.class.walk_chain(visit);
    }

    pub fn get_field(&self, key: &str) -> Option<Value> {
        self.cell.fields.borrow().get(key).cloned()
    }

    pub fn set_field(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.cell.fields.borrow_mut().insert(key.into(), value.into());
    }

    pub fn get_ref(&self, key: &str) -> Option<Object> {
        self.cell.refs.borrow().get(key).cloned()
    }

    pub fn set_ref(&self, key: impl Into<String>, object: &Object) {
        self.cell.refs.borrow_mut().insert(key.into(), object.clone());
    }

    pub fn take_ref(&self, key: &str) -> Option<Object> {
        self.cell.refs.borrow_mut().remove(key)
    }

    /// The host this object was attached to as a plugin.
    pub fn owner(&self) -> Option<Object> {
        self.cell.owner.borrow().as_ref().and_then(WeakObject::upgrade)
    }

    pub fn plugins(&self) -> Vec<Object> {
        self.cell.plugins.borrow().clone()
    }

    /// First attached plugin whose class is (or derives from) `class_name`.
    pub fn plugin(&self, class_name: &str) -> Option<Object> {
        self.cell
            .plugins
            .borrow()
            .iter()
            .find(|plugin| plugin.class().is_a(class_name))
            .cloned()
    }
}

// =============================================================================
// Methods
// =============================================================================

impl Object {
    /// Call a method. Methods injected by plugins shadow class methods.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        let found = self
            .cell
            .methods
            .borrow()
            .get(method)
            .cloned()
            .or_else(|| self.cell.class.find_method(method));

        match found {
            Some(callable) => callable(self, args),
            None => Err(Error::MethodNotFound {
                class: self.cell.class.name().to_string(),
                method: method.to_string(),
            }),
        }
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.cell.methods.borrow().contains_key(method)
            || self.cell.class.find_method(method).is_some()
    }

    pub(crate) fn inject_method(&self, name: String, method: Method) {
        self.cell.methods.borrow_mut().insert(name, method);
    }
}

// =============================================================================
// Children
// =============================================================================

impl Object {
    /// Register `child` for cascading teardown. Returns false when either
    /// side is torn down, the child has no id, or the id is already taken.
    ///
    /// A child that tears itself down first is dropped from the registry.
    pub fn add_child(&self, child: &Object) -> bool {
        if self.is_torn_down() {
            tracing::warn!(parent = ?self.id(), "add_child on torn-down object ignored");
            return false;
        }
        let Some(id) = child.id().filter(|_| !child.is_torn_down()) else {
            tracing::warn!(parent = ?self.id(), "add_child with a dead or unidentified child ignored");
            return false;
        };
        if self.cell.children.borrow().iter().any(|entry| entry.id == id) {
            return false;
        }

        let parent = self.downgrade();
        let watched = id.clone();
        let watch = child.bind_event(
            "onTeardown",
            move |_, _| {
                if let Some(parent) = parent.upgrade() {
                    parent.remove_child(&watched);
                }
            },
            Some(self),
        );

        self.cell.children.borrow_mut().push(ChildEntry {
            id,
            object: child.clone(),
            watch,
        });
        true
    }

    /// Release ownership of a child without tearing it down.
    pub fn remove_child(&self, id: &Cid) -> Option<Object> {
        let entry = {
            let mut children = self.cell.children.borrow_mut();
            let position = children.iter().position(|entry| entry.id == *id)?;
            children.remove(position)
        };
        entry.object.unbind_event(entry.watch);
        Some(entry.object)
    }

    pub fn child(&self, id: &Cid) -> Option<Object> {
        self.cell
            .children
            .borrow()
            .iter()
            .find(|entry| entry.id == *id)
            .map(|entry| entry.object.clone())
    }

    pub fn children(&self) -> Vec<Object> {
        self.cell
            .children
            .borrow()
            .iter()
            .map(|entry| entry.object.clone())
            .collect()
    }

    pub fn child_count(&self) -> usize {
        self.cell.children.borrow().len()
    }
}

// =============================================================================
// Teardown
// =============================================================================

impl Object {
    pub fn teardown(&self) {
        if self.is_torn_down() {
            return;
        }
        // Set first: handlers running during teardown cannot re-bind.
        self.cell.state.set(LifecycleState::TornDown);
        tracing::debug!(class = self.cell.class.name(), id = ?self.id(), "teardown");

        if let Err(err) = self.trigger_event("onTeardown", &[]) {
            tracing::warn!(error = %err, "onTeardown delivery failed");
        }

        self.unbind_all();
        self.unbind_to_all();

        loop {
            let next = {
                let mut children = self.cell.children.borrow_mut();
                if children.is_empty() {
                    None
                } else {
                    Some(children.remove(0).object)
                }
            };
            match next {
                Some(child) => child.teardown(),
                None => break,
            }
        }

        let plugins = std::mem::take(&mut *self.cell.plugins.borrow_mut());
        let refs = std::mem::take(&mut *self.cell.refs.borrow_mut());
        let methods = std::mem::take(&mut *self.cell.methods.borrow_mut());
        let config = self.cell.config.borrow_mut().take();
        drop((plugins, refs, methods, config));

        self.cell.fields.borrow_mut().clear();
        *self.cell.id.borrow_mut() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RuntimeSettings, reset_settings, set_settings};
    use crate::engine::{base_class, reset_ids};
    use serde_json::json;
    use std::cell::Cell;

    fn setup() {
        reset_ids();
        reset_settings();
    }

    fn counter(object: &Object, event: &str) -> Rc<Cell<usize>> {
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        object.bind_event(event, move |_, _| count_clone.set(count_clone.get() + 1), None);
        count
    }

    #[test]
    fn test_create_assigns_ids() {
        setup();
        let base = base_class();

        let a = base.create(Config::new()).unwrap();
        let b = base.create(Config::new().with_id("named")).unwrap();

        assert_eq!(a.id(), Some(Cid::from("c0")));
        assert_eq!(b.id(), Some(Cid::from("named")));
        assert_eq!(a.state(), LifecycleState::Initialized);
    }

    #[test]
    fn test_import_config_copies_defined_values() {
        setup();
        let class = Class::extend(&base_class(), "Panel")
            .import_config(["title", "width", "missing", "empty"])
            .finish();

        let object = class
            .create(
                Config::new()
                    .set("title", "Inbox")
                    .set("width", 40)
                    .set("empty", Value::Null)
                    .set("other", true),
            )
            .unwrap();

        assert_eq!(object.get_field("title"), Some(json!("Inbox")));
        assert_eq!(object.get_field("width"), Some(json!(40)));
        assert_eq!(object.get_field("missing"), None);
        assert_eq!(object.get_field("empty"), None);
        assert_eq!(object.get_field("other"), None);
        assert_eq!(object.config_value("other"), Some(json!(true)));
    }

    #[test]
    fn test_event_map_binds_self_and_fields() {
        setup();
        let source = base_class().create(Config::new()).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        let log_init = log.clone();
        let log_ping = log.clone();
        let class = Class::extend(&base_class(), "Listener")
            .import_config(["source"])
            .on("onInit", move |this, _, _| {
                log_init.borrow_mut().push(format!("init {}", this.id().unwrap()))
            })
            .on("onPing source", move |this, record, _| {
                log_ping
                    .borrow_mut()
                    .push(format!("{} from {}", record.event_type(), this.id().unwrap()))
            })
            .finish();

        let listener = class
            .create(Config::new().with_id("l").object("source", &source))
            .unwrap();
        source.trigger_event("onPing", &[]).unwrap();

        assert_eq!(*log.borrow(), vec!["init l", "onPing from l"]);

        // The listener holds the subscription on `source`; tearing it down
        // detaches it without the source's cooperation.
        listener.teardown();
        assert_eq!(source.listener_count("onPing"), 0);
    }

    #[test]
    fn test_init_hooks_run_root_first() {
        setup();
        let order = Rc::new(RefCell::new(Vec::new()));
        let parent_order = order.clone();
        let child_order = order.clone();

        let parent = Class::extend(&base_class(), "Parent")
            .init(move |_, _| {
                parent_order.borrow_mut().push("parent");
                Ok(())
            })
            .finish();
        let child = Class::extend(&parent, "Child")
            .init(move |_, _| {
                child_order.borrow_mut().push("child");
                Ok(())
            })
            .finish();

        child.create(Config::new()).unwrap();
        assert_eq!(*order.borrow(), vec!["parent", "child"]);
    }

    #[test]
    fn test_failing_constructor_propagates_by_default() {
        setup();
        let class = Class::extend(&base_class(), "Broken")
            .init(|_, _| Err(Error::constructor_failed("Broken", "no backing store")))
            .finish();

        let err = class.create(Config::new()).unwrap_err();
        assert_eq!(
            err,
            Error::ConstructorFailed {
                class: "Broken".into(),
                reason: "no backing store".into()
            }
        );
    }

    #[test]
    fn test_failing_constructor_degrades_when_configured() {
        setup();
        set_settings(RuntimeSettings {
            create_policy: CreatePolicy::Degrade,
            ..RuntimeSettings::default()
        });

        let class = Class::extend(&base_class(), "Broken")
            .init(|_, _| Err(Error::constructor_failed("Broken", "boom")))
            .finish();

        let object = class.create(Config::new()).unwrap();
        assert_eq!(object.state(), LifecycleState::Unconstructed);
        assert!(!object.is_event_triggered("onInit"));

        reset_settings();
    }

    #[test]
    fn test_teardown_cascades_to_children() {
        setup();
        let parent = base_class().create(Config::new()).unwrap();
        let kept = base_class().create(Config::new()).unwrap();
        let released = base_class().create(Config::new()).unwrap();

        let kept_count = counter(&kept, "onTeardown");
        let released_count = counter(&released, "onTeardown");

        assert!(parent.add_child(&kept));
        assert!(parent.add_child(&released));
        assert!(!parent.add_child(&released));
        assert_eq!(parent.child_count(), 2);

        let released_id = released.id().unwrap();
        assert!(parent.remove_child(&released_id).is_some());
        assert!(parent.remove_child(&released_id).is_none());

        parent.teardown();
        assert_eq!(kept_count.get(), 1);
        assert_eq!(released_count.get(), 0);
        assert!(kept.is_torn_down());
        assert_eq!(released.state(), LifecycleState::Initialized);
        assert_eq!(parent.child_count(), 0);
        assert_eq!(parent.id(), None);
    }

    #[test]
    fn test_child_teardown_leaves_registry() {
        setup();
        let parent = base_class().create(Config::new()).unwrap();
        let child = base_class().create(Config::new()).unwrap();
        let sibling = base_class().create(Config::new()).unwrap();
        let sibling_id = sibling.id().unwrap();

        assert!(parent.add_child(&child));
        assert!(parent.add_child(&sibling));
        assert_eq!(parent.bound_to_count(), 2);

        child.teardown();
        assert_eq!(parent.child_count(), 1);
        assert!(parent.children()[0].ptr_eq(&sibling));
        assert_eq!(parent.bound_to_count(), 1);
        assert!(!parent.add_child(&child));

        // A released child no longer reports back to its old parent.
        let released = parent.remove_child(&sibling_id).unwrap();
        assert_eq!(parent.bound_to_count(), 0);
        assert!(!released.has_listeners("onTeardown"));
        released.teardown();
        assert_eq!(parent.child_count(), 0);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        setup();
        let object = base_class().create(Config::new()).unwrap();
        let count = counter(&object, "onTeardown");

        object.teardown();
        object.teardown();
        assert_eq!(count.get(), 1);

        // No resurrection
        let late = counter(&object, "onChange");
        object.trigger_event("onChange", &[]).unwrap();
        assert_eq!(late.get(), 0);
        assert!(!object.add_child(&base_class().create(Config::new()).unwrap()));
    }

    #[test]
    fn test_call_missing_method() {
        setup();
        let object = base_class().create(Config::new()).unwrap();
        assert_eq!(
            object.call("render", &[]),
            Err(Error::MethodNotFound {
                class: "AObject".into(),
                method: "render".into()
            })
        );
    }
}
