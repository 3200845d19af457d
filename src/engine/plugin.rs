//! Plugins - behavior attached to a host object at creation.
//!
//! A plugin is an ordinary object created from its own class, with:
//! - a weak back-reference to its host ([`Object::owner`])
//! - registration as a child of the host, so it tears down with it
//! - the methods its class `provides` injected into the host
//!
//! Plugins come from two places, attached in this order: classes on the
//! host's chain (leaf class first), then `config.plugins`.

use std::fmt;
use std::rc::Rc;

use crate::config::Config;
use crate::error::{Error, Result};

use super::class::Class;
use super::object::Object;
use super::registry::lookup_class;

/// A class given directly or by registered name.
#[derive(Clone)]
pub enum ClassRef {
    Class(Rc<Class>),
    Named(String),
}

impl ClassRef {
    pub fn name(&self) -> &str {
        match self {
            Self::Class(class) => class.name(),
            Self::Named(name) => name,
        }
    }

    /// Fails with [`Error::ClassNotFound`] for unregistered names.
    pub fn resolve(&self) -> Result<Rc<Class>> {
        match self {
            Self::Class(class) => Ok(Rc::clone(class)),
            Self::Named(name) => lookup_class(name).ok_or_else(|| Error::class_not_found(name)),
        }
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => f.debug_tuple("Class").field(&class.name()).finish(),
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

/// A plugin class plus the config its instance is created with.
#[derive(Clone, Debug)]
pub struct PluginSpec {
    pub class: ClassRef,
    pub config: Config,
}

impl PluginSpec {
    pub fn new(class: &Rc<Class>, config: Config) -> Self {
        Self {
            class: ClassRef::Class(Rc::clone(class)),
            config,
        }
    }

    pub fn named(name: impl Into<String>, config: Config) -> Self {
        Self {
            class: ClassRef::Named(name.into()),
            config,
        }
    }
}

impl From<&Rc<Class>> for PluginSpec {
    fn from(class: &Rc<Class>) -> Self {
        Self::new(class, Config::new())
    }
}

impl From<Rc<Class>> for PluginSpec {
    fn from(class: Rc<Class>) -> Self {
        Self::new(&class, Config::new())
    }
}

impl From<&str> for PluginSpec {
    fn from(name: &str) -> Self {
        Self::named(name, Config::new())
    }
}

impl From<(&Rc<Class>, Config)> for PluginSpec {
    fn from((class, config): (&Rc<Class>, Config)) -> Self {
        Self::new(class, config)
    }
}

/// Create the plugin described by `spec` for `host` and inject its methods.
pub(crate) fn attach(host: &Object, spec: &PluginSpec) -> Result<Object> {
    let class = spec.class.resolve()?;
    let plugin = Object::create_owned(&class, spec.config.clone(), Some(host))?;

    for (name, method) in class.collect_provides() {
        host.inject_method(name, method);
    }

    tracing::debug!(
        host = host.class().name(),
        plugin = class.name(),
        "plugin attached"
    );
    Ok(plugin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{base_class, register_class, reset_class_registry, reset_ids};
    use crate::types::Value;
    use serde_json::json;
    use std::cell::RefCell;

    fn setup() {
        reset_ids();
        reset_class_registry();
    }

    fn recording_plugin(name: &str, log: Rc<RefCell<Vec<String>>>) -> Rc<Class> {
        let label = name.to_string();
        Class::extend(&base_class(), name)
            .init(move |plugin, _| {
                let host = plugin.owner().map(|o| o.class().name().to_string());
                log.borrow_mut().push(format!("{label} -> {}", host.unwrap_or_default()));
                Ok(())
            })
            .finish()
    }

    #[test]
    fn test_plugin_order_and_back_reference() {
        setup();
        let log = Rc::new(RefCell::new(Vec::new()));

        let declared_on_parent = recording_plugin("ParentPlugin", log.clone());
        let declared_on_child = recording_plugin("ChildPlugin", log.clone());
        let configured = recording_plugin("Configured", log.clone());
        register_class(&configured);

        let parent = Class::extend(&base_class(), "Parent")
            .plugin(&declared_on_parent)
            .finish();
        let child = Class::extend(&parent, "Child")
            .plugin(&declared_on_child)
            .finish();

        let host = child
            .create(Config::new().plugin("Configured"))
            .unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["ChildPlugin -> Child", "ParentPlugin -> Child", "Configured -> Child"]
        );
        assert_eq!(host.plugins().len(), 3);
        assert_eq!(host.child_count(), 3);
        assert_eq!(host.plugin("Configured").unwrap().owner(), Some(host.clone()));
    }

    #[test]
    fn test_plugin_tears_down_with_host() {
        setup();
        let plugin_class = Class::extend(&base_class(), "Tooltip").finish();
        let host = base_class()
            .create(Config::new().plugin(&plugin_class))
            .unwrap();
        let plugin = host.plugin("Tooltip").unwrap();

        host.teardown();
        assert!(plugin.is_torn_down());
        assert!(host.plugins().is_empty());
    }

    #[test]
    fn test_plugin_injects_methods() {
        setup();
        let counter = Class::extend(&base_class(), "Counter")
            .provides("count_children", |host, _| Ok(json!(host.child_count())))
            .finish();
        let host = base_class().create(Config::new().plugin(&counter)).unwrap();

        assert!(host.has_method("count_children"));
        assert_eq!(host.call("count_children", &[]).unwrap(), json!(1));
        assert!(!base_class().create(Config::new()).unwrap().has_method("count_children"));
    }

    #[test]
    fn test_unknown_plugin_name() {
        setup();
        let err = base_class()
            .create(Config::new().plugin("Nope"))
            .unwrap_err();
        assert_eq!(err, Error::ClassNotFound { name: "Nope".into() });
    }

    #[test]
    fn test_plugin_config_is_passed_through() {
        setup();
        let sized = Class::extend(&base_class(), "Sized").import_config(["min"]).finish();
        let host = base_class()
            .create(Config::new().plugin((&sized, Config::new().set("min", 10))))
            .unwrap();
        assert_eq!(
            host.plugin("Sized").unwrap().get_field("min"),
            Some(Value::from(10))
        );
    }
}
