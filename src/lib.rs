//! # spark-objects
//!
//! Object lifecycle and event propagation runtime.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for the
//! reactive mirrors collections expose.
//!
//! ## Architecture
//!
//! Classes are composed from a superclass, mixins and plugins. Objects are
//! `Rc` handles that own their children and plugins and keep two-way event
//! books, so tearing down either side of a subscription detaches both:
//!
//! ```text
//! Class::create(config)
//!   -> attach plugins -> init (imports, event map, init hooks) -> onInit
//! Object::teardown()
//!   -> onTeardown -> unbind both directions -> tear down children
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Cids, subscription ids, dynamic values, lifecycle state
//! - [`error`] - The crate error type
//! - [`config`] - Creation config and runtime settings
//! - [`engine`] - Classes, registry, objects, plugins, id generation
//! - [`events`] - Observable, EventRecord, per-object event books
//! - [`collections`] - Keyed and ordered collections with cancellable events
//! - [`telemetry`] - Tracing subscriber setup

pub mod collections;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod telemetry;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use error::{Error, Result};

pub use config::{
    Config, CreatePolicy, RuntimeSettings, reset_settings, set_settings, settings,
};

pub use engine::{
    // Classes
    Class, ClassBuilder, EventHandler, EventMapEntry, InitHook, Method, Mixin, base_class,
    // Registry
    create_named, is_registered, lookup_class, register_class, registered_names,
    reset_class_registry, unregister_class,
    // Objects
    Object, WeakObject,
    // Plugins
    ClassRef, PluginSpec,
    // Ids
    IdGenerator, id_generator, next_cid, next_subscription_id, reset_ids, set_id_generator,
};

pub use events::{
    Callback, Delivery, EventRecord, EventSeed, Observable, RecordFlags, Subscription,
};

pub use collections::{
    At, CollectionChange, CollectionItem, KeyedCollection, ON_BEFORE_INSERT, ON_BEFORE_REMOVE,
    ON_INSERT, ON_REMOVE, OrderedCollection, collection_array_class, collection_hash_class,
    resolve_insert_index, resolve_lookup_index,
};

pub use telemetry::{init_test_tracing, init_tracing};

/// Reset every thread-local registry. For tests.
pub fn reset_runtime() {
    reset_ids();
    reset_settings();
    reset_class_registry();
}
