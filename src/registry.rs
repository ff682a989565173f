use std::cell::RefCell;
use std::fmt::{self, Display};

use slab::Slab;

/// A stable numeric id for one subscriber (property or view).
///
/// Assigned by the thread-local [`registry`](self) when the subscriber is
/// created, released on teardown. Used in debug dumps and leak checks, not
/// for notification dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub usize);

impl Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}", self.0);
    }
}

struct RegistryEntry {
    debug_name: String,
}

thread_local! {
    static SUBSCRIBER_REGISTRY: RefCell<Slab<RegistryEntry>> = RefCell::new(Slab::with_capacity(32));
}

/// Register a new subscriber under `debug_name` and get its id.
pub fn register(debug_name: &str) -> SubscriberId {
    return SUBSCRIBER_REGISTRY.with(|registry| {
        let key = registry.borrow_mut().insert(RegistryEntry {
            debug_name: debug_name.to_string(),
        });
        return SubscriberId(key);
    });
}

/// Unlink `id` from the registry. Unlinking an id that is already gone is a no-op.
pub fn unregister(id: SubscriberId) {
    SUBSCRIBER_REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        if registry.try_remove(id.0).is_none() {
            log::debug!("unregister: subscriber id {} is not registered", id);
        }
    });
}

/// The debug name `id` was registered under, if it is still registered.
pub fn debug_name(id: SubscriberId) -> Option<String> {
    return SUBSCRIBER_REGISTRY.with(|registry| {
        return registry.borrow().get(id.0).map(|entry| entry.debug_name.clone());
    });
}

/// Number of currently registered subscribers on this thread.
///
/// After all views and properties are torn down this should be zero;
/// anything else points at a leaked subscriber.
pub fn registered_count() -> usize {
    return SUBSCRIBER_REGISTRY.with(|registry| {
        return registry.borrow().len();
    });
}
