//! Class Registry - name lookup for classes and plugins.
//!
//! Lets config refer to classes by name (`"plugins": ["Tooltip"]`) and
//! lets callers create objects from a name. The built-in classes
//! (`AObject`, `CollectionHash`, `CollectionArray`) are always registered.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::collections::{collection_array_class, collection_hash_class};
use crate::config::Config;
use crate::error::{Error, Result};

use super::class::{Class, base_class};
use super::object::Object;

// =============================================================================
// Registry State
// =============================================================================

thread_local! {
    /// Map class name to class.
    static CLASSES: RefCell<HashMap<String, Rc<Class>>> = RefCell::new(builtin_classes());
}

fn builtin_classes() -> HashMap<String, Rc<Class>> {
    [base_class(), collection_hash_class(), collection_array_class()]
        .into_iter()
        .map(|class| (class.name().to_string(), class))
        .collect()
}

// =============================================================================
// Registration
// =============================================================================

/// Register `class` under its name, returning any class it replaces.
pub fn register_class(class: &Rc<Class>) -> Option<Rc<Class>> {
    CLASSES.with(|classes| {
        classes
            .borrow_mut()
            .insert(class.name().to_string(), Rc::clone(class))
    })
}

pub fn unregister_class(name: &str) -> Option<Rc<Class>> {
    CLASSES.with(|classes| classes.borrow_mut().remove(name))
}

// =============================================================================
// Lookups
// =============================================================================

pub fn lookup_class(name: &str) -> Option<Rc<Class>> {
    CLASSES.with(|classes| classes.borrow().get(name).cloned())
}

pub fn is_registered(name: &str) -> bool {
    CLASSES.with(|classes| classes.borrow().contains_key(name))
}

/// Sorted names of every registered class.
pub fn registered_names() -> Vec<String> {
    let mut names: Vec<String> =
        CLASSES.with(|classes| classes.borrow().keys().cloned().collect());
    names.sort();
    names
}

/// Create an object from a registered class name.
pub fn create_named(name: &str, config: Config) -> Result<Object> {
    let class = lookup_class(name).ok_or_else(|| Error::class_not_found(name))?;
    Object::create(&class, config)
}

// =============================================================================
// Reset (for testing)
// =============================================================================

/// Drop user registrations, keeping the built-in classes.
pub fn reset_class_registry() {
    CLASSES.with(|classes| *classes.borrow_mut() = builtin_classes());
}
