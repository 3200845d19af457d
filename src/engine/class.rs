//! Class composition - superclass + mixins + own members.
//!
//! A [`Class`] is built once by a [`ClassBuilder`] and shared as `Rc<Class>`.
//! Two kinds of members are handled differently:
//!
//! - **Methods** are resolved at build time into one flat table. Override
//!   order: own > later mixin > earlier mixin > superclass.
//! - **Declarative tables** (config imports, event map, static plugins,
//!   init hooks) stay on the class that declared them and are merged across
//!   the whole ancestry with [`Class::walk_chain`] when an object is created.
//!   Mixin tables are folded into the class that applies the mixin.
//!
//! # Example
//!
//! ```ignore
//! use spark_objects::{Class, Mixin, Value};
//!
//! let titled = Mixin::new("Titled")
//!     .import_config(["title"])
//!     .method("title", |this, _| Ok(this.get_field("title").unwrap_or(Value::Null)));
//!
//! let panel = Class::build("Panel")
//!     .extends(&spark_objects::base_class())
//!     .mixin(titled)
//!     .on("onInit", |this, _record, _extra| tracing::debug!(id = ?this.id(), "panel ready"))
//!     .finish();
//!
//! let object = panel.create(Config::new().set("title", "Inbox"))?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::config::Config;
use crate::error::Result;
use crate::events::EventRecord;
use crate::types::Value;

use super::object::Object;
use super::plugin::PluginSpec;

/// Dynamic method: receives the object it was called on and the arguments.
pub type Method = Rc<dyn Fn(&Object, &[Value]) -> Result<Value>>;

/// Declarative event handler: receives the declaring object, the record and
/// any extra trigger arguments.
pub type EventHandler = Rc<dyn Fn(&Object, &EventRecord, &[Value])>;

/// Per-class construction step, run root-first before `onInit` fires.
pub type InitHook = Rc<dyn Fn(&Object, &Config) -> Result<()>>;

// =============================================================================
// Event map entries
// =============================================================================

/// One `"eventName [field]"` entry of a class event map.
///
/// Without a field the handler binds to the object itself; with one it binds
/// to the object stored in that reference field.
#[derive(Clone)]
pub struct EventMapEntry {
    pub event: String,
    pub field: Option<String>,
    pub handler: EventHandler,
}

impl EventMapEntry {
    pub fn parse(key: &str, handler: EventHandler) -> Self {
        let mut parts = key.split_whitespace();
        let event = parts.next().unwrap_or_default().to_string();
        let field = parts.next().map(str::to_string);
        Self {
            event,
            field,
            handler,
        }
    }
}

impl fmt::Debug for EventMapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventMapEntry")
            .field("event", &self.event)
            .field("field", &self.field)
            .finish()
    }
}

// =============================================================================
// Mixin
// =============================================================================

/// A named bag of capabilities applied to a class at build time.
#[derive(Clone, Default)]
pub struct Mixin {
    name: String,
    methods: Vec<(String, Method)>,
    import_config: Vec<String>,
    events: Vec<EventMapEntry>,
}

impl Mixin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&Object, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        self.methods.push((name.into(), Rc::new(method)));
        self
    }

    pub fn import_config<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.import_config.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn on(
        mut self,
        key: &str,
        handler: impl Fn(&Object, &EventRecord, &[Value]) + 'static,
    ) -> Self {
        self.events.push(EventMapEntry::parse(key, Rc::new(handler)));
        self
    }
}

impl fmt::Debug for Mixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mixin")
            .field("name", &self.name)
            .field("methods", &self.methods.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("import_config", &self.import_config)
            .field("events", &self.events)
            .finish()
    }
}

// =============================================================================
// Class
// =============================================================================

pub struct Class {
    name: String,
    superclass: Option<Rc<Class>>,
    mixins: Vec<String>,
    methods: HashMap<String, Method>,
    import_config: Vec<String>,
    events: Vec<EventMapEntry>,
    plugins: Vec<PluginSpec>,
    provides: Vec<(String, Method)>,
    init_hooks: Vec<InitHook>,
}

impl Class {
    /// Start a class with no superclass.
    pub fn build(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name)
    }

    /// Start a class derived from `parent`.
    pub fn extend(parent: &Rc<Class>, name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name).extends(parent)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superclass(&self) -> Option<&Rc<Class>> {
        self.superclass.as_ref()
    }

    /// Names of the mixins applied to this class (not its ancestors).
    pub fn mixins(&self) -> &[String] {
        &self.mixins
    }

    /// Visit this class, then its superclass, and so on up to the root.
    pub fn walk_chain(&self, mut visit: impl FnMut(&Class)) {
        let mut current = Some(self);
        while let Some(class) = current {
            visit(class);
            current = class.superclass.as_deref();
        }
    }

    /// Class names from this class up to the root.
    pub fn chain(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.walk_chain(|class| names.push(class.name.clone()));
        names
    }

    /// Whether `name` is this class or one of its ancestors.
    pub fn is_a(&self, name: &str) -> bool {
        let mut found = false;
        self.walk_chain(|class| found |= class.name == name);
        found
    }

    pub fn find_method(&self, name: &str) -> Option<Method> {
        self.methods.get(name).cloned()
    }

    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }

    /// Instantiate, attach plugins and initialize. See [`Object::create`].
    pub fn create(self: &Rc<Self>, config: Config) -> Result<Object> {
        Object::create(self, config)
    }

    // -------------------------------------------------------------------------
    // Ancestry-wide tables
    // -------------------------------------------------------------------------

    /// Config import names across the chain, leaf first, without repeats.
    pub(crate) fn collect_import_config(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        self.walk_chain(|class| {
            for name in &class.import_config {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        });
        names
    }

    /// Event map entries across the chain, root first.
    pub(crate) fn collect_event_map(&self) -> Vec<EventMapEntry> {
        let mut tables: Vec<Vec<EventMapEntry>> = Vec::new();
        self.walk_chain(|class| tables.push(class.events.clone()));
        tables.into_iter().rev().flatten().collect()
    }

    /// Statically declared plugins across the chain, in walk order.
    pub(crate) fn collect_plugins(&self) -> Vec<PluginSpec> {
        let mut specs = Vec::new();
        self.walk_chain(|class| specs.extend(class.plugins.iter().cloned()));
        specs
    }

    /// Methods this class injects into a host when attached as a plugin.
    /// Ancestors first so the leaf class wins.
    pub(crate) fn collect_provides(&self) -> Vec<(String, Method)> {
        let mut tables: Vec<Vec<(String, Method)>> = Vec::new();
        self.walk_chain(|class| tables.push(class.provides.clone()));
        tables.into_iter().rev().flatten().collect()
    }

    /// Init hooks across the chain, root first.
    pub(crate) fn collect_init_hooks(&self) -> Vec<InitHook> {
        let mut tables: Vec<Vec<InitHook>> = Vec::new();
        self.walk_chain(|class| tables.push(class.init_hooks.clone()));
        tables.into_iter().rev().flatten().collect()
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("chain", &self.chain())
            .field("mixins", &self.mixins)
            .field("methods", &self.method_names())
            .finish()
    }
}

// =============================================================================
// ClassBuilder
// =============================================================================

pub struct ClassBuilder {
    name: String,
    superclass: Option<Rc<Class>>,
    mixins: Vec<Mixin>,
    methods: Vec<(String, Method)>,
    import_config: Vec<String>,
    events: Vec<EventMapEntry>,
    plugins: Vec<PluginSpec>,
    provides: Vec<(String, Method)>,
    init_hooks: Vec<InitHook>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            mixins: Vec::new(),
            methods: Vec::new(),
            import_config: Vec::new(),
            events: Vec::new(),
            plugins: Vec::new(),
            provides: Vec::new(),
            init_hooks: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: &Rc<Class>) -> Self {
        self.superclass = Some(Rc::clone(parent));
        self
    }

    /// Apply a mixin. Later mixins override earlier ones.
    pub fn mixin(mut self, mixin: Mixin) -> Self {
        self.mixins.push(mixin);
        self
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&Object, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        self.methods.push((name.into(), Rc::new(method)));
        self
    }

    /// Config keys copied onto the instance (as fields or object references)
    /// when present in the creation config.
    pub fn import_config<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.import_config.extend(names.into_iter().map(Into::into));
        self
    }

    /// Add an event map entry: `"onInsert"` binds on the instance,
    /// `"onInsert items"` binds on the object in the `items` reference field.
    pub fn on(
        mut self,
        key: &str,
        handler: impl Fn(&Object, &EventRecord, &[Value]) + 'static,
    ) -> Self {
        self.events.push(EventMapEntry::parse(key, Rc::new(handler)));
        self
    }

    /// Attach a plugin to every instance of this class (and its subclasses).
    pub fn plugin(mut self, spec: impl Into<PluginSpec>) -> Self {
        self.plugins.push(spec.into());
        self
    }

    /// Method injected into the host when this class is used as a plugin.
    pub fn provides(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&Object, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        self.provides.push((name.into(), Rc::new(method)));
        self
    }

    pub fn init(mut self, hook: impl Fn(&Object, &Config) -> Result<()> + 'static) -> Self {
        self.init_hooks.push(Rc::new(hook));
        self
    }

    pub fn finish(self) -> Rc<Class> {
        let mut methods: HashMap<String, Method> = self
            .superclass
            .as_ref()
            .map(|parent| parent.methods.clone())
            .unwrap_or_default();

        let mut import_config = Vec::new();
        let mut events = Vec::new();
        let mut mixin_names = Vec::with_capacity(self.mixins.len());

        for mixin in self.mixins {
            methods.extend(mixin.methods);
            import_config.extend(mixin.import_config);
            events.extend(mixin.events);
            mixin_names.push(mixin.name);
        }

        methods.extend(self.methods);
        import_config.extend(self.import_config);
        events.extend(self.events);

        Rc::new(Class {
            name: self.name,
            superclass: self.superclass,
            mixins: mixin_names,
            methods,
            import_config,
            events,
            plugins: self.plugins,
            provides: self.provides,
            init_hooks: self.init_hooks,
        })
    }
}

// =============================================================================
// Base class
// =============================================================================

thread_local! {
    static BASE_CLASS: Rc<Class> = ClassBuilder::new("AObject").finish();
}

/// The root class every built-in class derives from.
pub fn base_class() -> Rc<Class> {
    BASE_CLASS.with(Rc::clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn constant(value: Value) -> impl Fn(&Object, &[Value]) -> Result<Value> + 'static {
        move |_, _| Ok(value.clone())
    }

    #[test]
    fn test_walk_chain_visits_leaf_to_root() {
        let base = base_class();
        let view = Class::extend(&base, "View").finish();
        let list = Class::extend(&view, "ListView").finish();

        assert_eq!(list.chain(), vec!["ListView", "View", "AObject"]);
        assert!(list.is_a("View"));
        assert!(!view.is_a("ListView"));
    }

    #[test]
    fn test_method_override_order() {
        let parent = Class::build("Parent")
            .method("a", constant(json!("parent")))
            .method("b", constant(json!("parent")))
            .method("c", constant(json!("parent")))
            .method("d", constant(json!("parent")))
            .finish();

        let first = Mixin::new("First")
            .method("b", constant(json!("first")))
            .method("c", constant(json!("first")))
            .method("d", constant(json!("first")));
        let second = Mixin::new("Second")
            .method("c", constant(json!("second")))
            .method("d", constant(json!("second")));

        let child = Class::extend(&parent, "Child")
            .mixin(first)
            .mixin(second)
            .method("d", constant(json!("own")))
            .finish();

        let object = child.create(Config::new()).unwrap();
        assert_eq!(object.call("a", &[]).unwrap(), json!("parent"));
        assert_eq!(object.call("b", &[]).unwrap(), json!("first"));
        assert_eq!(object.call("c", &[]).unwrap(), json!("second"));
        assert_eq!(object.call("d", &[]).unwrap(), json!("own"));
        assert_eq!(child.mixins(), ["First".to_string(), "Second".to_string()]);
    }

    #[test]
    fn test_import_config_merges_across_chain() {
        let parent = Class::build("Parent").import_config(["a", "shared"]).finish();
        let child = Class::extend(&parent, "Child")
            .mixin(Mixin::new("M").import_config(["m"]))
            .import_config(["b", "shared"])
            .finish();

        assert_eq!(child.collect_import_config(), vec!["m", "b", "shared", "a"]);
    }

    fn noop() -> EventHandler {
        Rc::new(|_: &Object, _: &EventRecord, _: &[Value]| {})
    }

    #[test]
    fn test_event_map_key_parsing() {
        let entry = EventMapEntry::parse("onInsert items", noop());
        assert_eq!(entry.event, "onInsert");
        assert_eq!(entry.field.as_deref(), Some("items"));

        let entry = EventMapEntry::parse("onInit", noop());
        assert_eq!(entry.field, None);
    }
}
