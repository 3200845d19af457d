//! Events - publish/subscribe for objects.
//!
//! - **Observable** - one event's subscriber list (trigger, bind, unbind)
//! - **EventRecord** - the value delivered per trigger (type, timestamp,
//!   target, fields, prevent-default)
//! - **Observables** - per-object event table with two-way binding books,
//!   exposed as methods on [`Object`](crate::Object)
//!
//! # Example
//!
//! ```ignore
//! use spark_objects::{base_class, Config};
//!
//! let source = base_class().create(Config::new())?;
//! let listener = base_class().create(Config::new())?;
//!
//! source.bind_event("onChange", |record, _extra| {
//!     println!("{} fired", record.event_type());
//! }, Some(&listener));
//!
//! source.trigger_event("onChange", &[])?;
//!
//! // Listener detaches itself; the source needs no cooperation.
//! listener.teardown();
//! ```

mod observable;
mod observables;
mod record;

pub use observable::*;
pub use observables::{Delivery, Subscription};
pub(crate) use observables::Observables;
pub use record::*;
