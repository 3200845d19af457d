//! Id generation for objects, collection items and subscriptions.
//!
//! Ids come from an [`IdGenerator`]. One generator is installed per thread;
//! tests swap in a seeded generator (or call [`reset_ids`]) to get
//! deterministic ids.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::settings;
use crate::types::{Cid, SubscriptionId};

// =============================================================================
// IdGenerator
// =============================================================================

/// Monotonic generator. Clones share the same counters.
#[derive(Clone, Debug, Default)]
pub struct IdGenerator {
    counters: Rc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    next_cid: Cell<u64>,
    next_subscription: Cell<u64>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator whose next ids are `next_cid` and `next_subscription`.
    pub fn seeded(next_cid: u64, next_subscription: u64) -> Self {
        Self {
            counters: Rc::new(Counters {
                next_cid: Cell::new(next_cid),
                next_subscription: Cell::new(next_subscription),
            }),
        }
    }

    /// Next object/item id, using the configured prefix (`c` by default).
    pub fn next_cid(&self) -> Cid {
        let n = self.counters.next_cid.get();
        self.counters.next_cid.set(n + 1);
        Cid::new(format!("{}{}", settings().id_prefix, n))
    }

    pub fn next_subscription_id(&self) -> SubscriptionId {
        let n = self.counters.next_subscription.get();
        self.counters.next_subscription.set(n + 1);
        SubscriptionId::new(n)
    }
}

// =============================================================================
// Thread-local generator
// =============================================================================

thread_local! {
    static CURRENT: RefCell<IdGenerator> = RefCell::new(IdGenerator::new());
}

/// The generator currently installed on this thread.
pub fn id_generator() -> IdGenerator {
    CURRENT.with(|current| current.borrow().clone())
}

/// Install `generator`, returning the previous one.
pub fn set_id_generator(generator: IdGenerator) -> IdGenerator {
    CURRENT.with(|current| current.replace(generator))
}

pub fn next_cid() -> Cid {
    id_generator().next_cid()
}

pub fn next_subscription_id() -> SubscriptionId {
    id_generator().next_subscription_id()
}

/// Reset ids (for testing).
pub fn reset_ids() {
    set_id_generator(IdGenerator::new());
}
