//! Per-event handler storage.
//!
//! A collection decides what `on` stores and in which order `fire` sees handlers:
//! - [`HandlerSet`]: unique handlers, unspecified order.
//! - [`RankedHandlers`]: priority order, lowest first; duplicates allowed.

use crate::config::BusConfig;
use crate::handler::{Handler, HandlerId, HandlerIdentity, SharedHandler, TryHandle};
use crate::priority::{Prioritized, PrioritySet};
use crate::ranked::RankedHandler;
use fxhash::{FxBuildHasher, FxHashMap};
use std::fmt;
use std::sync::Arc;

/// Storage for the handlers of a single event.
pub trait HandlerCollection: fmt::Debug + Send + Sync {
    /// What `insert` hands back so the caller can remove the registration later.
    type Stored<T: ?Sized + 'static>;

    /// Builds an empty collection.
    fn create(config: &BusConfig) -> Self
    where
        Self: Sized;

    /// Adds a handler and returns the value actually stored.
    fn insert<T>(&mut self, handler: Handler<T>) -> Self::Stored<T>
    where
        T: ?Sized + 'static,
        Handler<T>: TryHandle;

    /// Removes one registration of the handler with this identity.
    fn remove(&mut self, id: HandlerId) -> bool;

    /// The handlers in invocation order, detached from the collection.
    fn snapshot(&self) -> Vec<SharedHandler>;

    /// Number of registrations.
    fn len(&self) -> usize;

    /// Whether nothing is registered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every registration.
    fn clear(&mut self);
}

/// Unordered handlers, at most one registration per handler.
pub struct HandlerSet {
    handlers: FxHashMap<HandlerId, SharedHandler>,
}

impl HandlerSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty set with room for `capacity` handlers.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { handlers: FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher::default()) }
    }

    /// Whether the handler is registered.
    #[must_use]
    pub fn contains(&self, handler: &impl HandlerIdentity) -> bool {
        self.handlers.contains_key(&handler.handler_id())
    }
}

impl Default for HandlerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.values()).finish()
    }
}

impl HandlerCollection for HandlerSet {
    type Stored<T: ?Sized + 'static> = Handler<T>;

    fn create(config: &BusConfig) -> Self {
        Self::with_capacity(config.capacity())
    }

    fn insert<T>(&mut self, handler: Handler<T>) -> Handler<T>
    where
        T: ?Sized + 'static,
        Handler<T>: TryHandle,
    {
        let id = handler.id();
        let shared: SharedHandler = Arc::new(handler.clone());
        self.handlers.entry(id).or_insert(shared);
        handler
    }

    fn remove(&mut self, id: HandlerId) -> bool {
        self.handlers.remove(&id).is_some()
    }

    fn snapshot(&self) -> Vec<SharedHandler> {
        self.handlers.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.handlers.len()
    }

    fn clear(&mut self) {
        self.handlers.clear();
    }
}

#[derive(Debug, Clone)]
struct RankedEntry {
    priority: i32,
    handler: SharedHandler,
}

impl Prioritized for RankedEntry {
    fn priority(&self) -> i32 {
        self.priority
    }
}

/// Handlers ordered by priority, lowest first.
///
/// The same handler may be registered more than once, at the same or different priorities;
/// every registration is kept and each removal drops one of them. Handlers sharing a
/// priority run in an unspecified order.
#[derive(Debug)]
pub struct RankedHandlers {
    entries: PrioritySet<RankedEntry>,
    default_priority: i32,
}

impl RankedHandlers {
    /// Creates an empty collection using the default priority.
    #[must_use]
    pub fn new() -> Self {
        Self::create(&BusConfig::DEFAULT)
    }

    /// Priority used by [`HandlerCollection::insert`].
    #[must_use]
    pub const fn default_priority(&self) -> i32 {
        self.default_priority
    }

    /// Adds a handler at an explicit priority.
    pub fn insert_ranked<T>(&mut self, handler: Handler<T>, priority: i32) -> RankedHandler<T>
    where
        T: ?Sized + 'static,
        Handler<T>: TryHandle,
    {
        let ranked = handler.ranked(priority);
        self.entries.insert(RankedEntry { priority, handler: Arc::new(ranked.clone()) });
        ranked
    }

    /// Priorities of the stored handlers, in invocation order.
    #[must_use]
    pub fn priorities(&self) -> Vec<i32> {
        self.entries.iter().map(|entry| entry.priority).collect()
    }
}

impl Default for RankedHandlers {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerCollection for RankedHandlers {
    type Stored<T: ?Sized + 'static> = RankedHandler<T>;

    fn create(config: &BusConfig) -> Self {
        Self {
            entries: PrioritySet::with_capacity(config.capacity()),
            default_priority: config.default_priority(),
        }
    }

    fn insert<T>(&mut self, handler: Handler<T>) -> RankedHandler<T>
    where
        T: ?Sized + 'static,
        Handler<T>: TryHandle,
    {
        self.insert_ranked(handler, self.default_priority)
    }

    fn remove(&mut self, id: HandlerId) -> bool {
        self.entries.remove_where(|entry| entry.handler.handler_id() == id).is_some()
    }

    fn snapshot(&self) -> Vec<SharedHandler> {
        self.entries.iter().map(|entry| entry.handler).collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_rejects_duplicate_registration() {
        let mut set = HandlerSet::default();
        let handler = Handler::new(|_: &u32| ());

        let stored = set.insert(handler.clone());
        set.insert(handler.clone());

        assert_eq!(stored, handler);
        assert_eq!(set.len(), 1);
        assert!(set.contains(&handler));
    }

    #[test]
    fn test_set_remove_is_idempotent() {
        let mut set = HandlerSet::default();
        let handler = set.insert(Handler::new(|_: &u32| ()));

        assert!(set.remove(handler.id()));
        assert!(!set.remove(handler.id()));
        assert!(set.is_empty());
    }

    #[test]
    fn test_ranked_snapshot_follows_priority() {
        let mut ranked = RankedHandlers::default();
        let late = ranked.insert_ranked(Handler::new(|_: &u32| ()), 100);
        let early = ranked.insert_ranked(Handler::new(|_: &u32| ()), -1);
        let middle = ranked.insert(Handler::new(|_: &u32| ()));

        let ids: Vec<_> = ranked.snapshot().iter().map(|h| h.handler_id()).collect();
        assert_eq!(ids, vec![early.handler_id(), middle.handler_id(), late.handler_id()]);
        assert_eq!(ranked.priorities(), vec![-1, 0, 100]);
    }

    #[test]
    fn test_ranked_keeps_every_registration() {
        let mut ranked = RankedHandlers::default();
        let handler = Handler::new(|_: &u32| ());

        ranked.insert_ranked(handler.clone(), 5);
        ranked.insert_ranked(handler.clone(), 9);
        assert_eq!(ranked.len(), 2);

        assert!(ranked.remove(handler.id()));
        assert!(ranked.remove(handler.id()));
        assert!(!ranked.remove(handler.id()));
    }

    #[test]
    fn test_ranked_uses_configured_default_priority() {
        let config = BusConfig::new().with_default_priority(42);
        let mut ranked = RankedHandlers::create(&config);

        let stored = ranked.insert(Handler::new(|_: &u32| ()));
        assert_eq!(stored.priority(), 42);
        assert_eq!(ranked.default_priority(), 42);
    }

    #[test]
    fn test_clear_empties_collection() {
        let mut ranked = RankedHandlers::default();
        ranked.insert(Handler::new(|_: &u32| ()));
        ranked.clear();
        assert!(ranked.is_empty());
        assert!(ranked.snapshot().is_empty());
    }
}
