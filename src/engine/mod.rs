//! Object Engine - classes, objects, plugins and ids.
//!
//! The engine owns the object model:
//! - Ids: injectable generator for cids and subscription ids
//! - Class: superclass + mixins + declarative tables, chain walking
//! - Registry: name lookup for classes and plugins
//! - Object: id, config, children, init/teardown lifecycle
//! - Plugin: behavior attached to a host at creation
//!
//! # Architecture
//!
//! Objects are `Rc` handles. Ownership only flows downward: a parent owns
//! its children, a host owns its plugins. Everything pointing back up
//! (plugin owner, event subscriber) is weak, and the event wiring between
//! objects is severed explicitly at teardown rather than left to `Drop`.

mod class;
mod ids;
mod object;
mod plugin;
mod registry;

pub use class::*;
pub use ids::*;
pub use object::*;
pub use plugin::*;
pub use registry::*;
