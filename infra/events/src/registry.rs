//! A shared store of handler maps keyed by instance.
//!
//! Hosts that cannot, or prefer not to, hold handler storage inline attach to a
//! [`Registry`] instead. The host owns the registry handle and decides how long it lives
//! and who shares it; nothing here is global.

use crate::bus::EventName;
use crate::collection::{HandlerCollection, HandlerSet, RankedHandlers};
use crate::config::BusConfig;
use crate::dispatch::dispatch;
use crate::error::Result;
use crate::flow::Outcome;
use crate::handler::{Event, Handler, HandlerIdentity, IntoHandler, TryHandle};
use crate::ranked::RankedHandler;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::Any;
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Opaque identity of an attached instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Raw numeric value, useful for logs.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance#{}", self.0)
    }
}

type Instances<C> = FxHashMap<InstanceId, FxHashMap<EventName, C>>;

struct Shared<C> {
    instances: RwLock<Instances<C>>,
    next_id: AtomicU64,
    config: BusConfig,
}

/// Cloneable handle to a shared, thread-safe handler store.
///
/// Handlers are dispatched outside the lock, so a handler may register, remove or fire
/// through the same registry. Such changes apply from the next `fire` on.
///
/// # Example
/// ```rust
/// use eventful::{Outcome, Registry};
///
/// let registry = Registry::new();
/// let left = registry.attach();
/// let right = registry.attach();
///
/// left.on("click", |_: &u32| eventful::Flow::Consume);
///
/// assert_eq!(left.fire("click", &1_u32).unwrap(), Outcome::Consumed);
/// assert_eq!(right.fire("click", &1_u32).unwrap(), Outcome::Completed);
/// ```
pub struct Registry<C = HandlerSet> {
    inner: Arc<Shared<C>>,
}

/// A [`Registry`] whose instances run handlers in priority order.
pub type RankedRegistry = Registry<RankedHandlers>;

impl Registry {
    /// Creates an empty registry with unordered handler sets.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::DEFAULT)
    }
}

impl Registry<RankedHandlers> {
    /// Creates an empty registry whose instances order handlers by priority.
    #[must_use]
    pub fn ranked() -> Self {
        Self::with_config(BusConfig::DEFAULT)
    }
}

impl<C: HandlerCollection> Registry<C> {
    /// Creates an empty registry whose collections are built with `config`.
    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(Shared {
                instances: RwLock::new(FxHashMap::default()),
                next_id: AtomicU64::new(1),
                config,
            }),
        }
    }

    /// Allocates a fresh instance with no handlers.
    #[must_use = "Dropping the handle leaves an unreachable instance until it is detached by id."]
    pub fn attach(&self) -> Attached<C> {
        let id = InstanceId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.instances.write().insert(id, FxHashMap::default());
        trace!(instance = %id, "Instance attached");
        Attached { id, registry: self.clone() }
    }

    /// Drops every handler of an instance. Returns `false` if it was not attached.
    pub fn detach(&self, id: InstanceId) -> bool {
        let removed = self.inner.instances.write().remove(&id).is_some();
        trace!(instance = %id, removed, "Instance detached");
        removed
    }

    /// Number of attached instances.
    #[must_use]
    pub fn instances(&self) -> usize {
        self.inner.instances.read().len()
    }

    /// Whether `id` is currently attached.
    #[must_use]
    pub fn contains(&self, id: InstanceId) -> bool {
        self.inner.instances.read().contains_key(&id)
    }

    /// Settings applied to every collection this registry creates.
    #[must_use]
    pub fn config(&self) -> BusConfig {
        self.inner.config
    }

    fn insert<T>(&self, id: InstanceId, key: EventName, insert: impl FnOnce(&mut C) -> T) -> T {
        let config = self.inner.config;
        let mut instances = self.inner.instances.write();
        let handlers = instances.entry(id).or_default().entry(key).or_insert_with_key(|key| {
            trace!(
                instance = %id,
                event = %key,
                capacity = config.capacity(),
                "Initializing handler collection"
            );
            C::create(&config)
        });
        insert(handlers)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for Registry<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<C> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("instances", &self.inner.instances.read().len())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// An instance's view of a [`Registry`].
///
/// Clones share the instance. Dropping the handle does not detach it; call
/// [`Attached::detach`] for that. Registering on a detached instance attaches it again.
pub struct Attached<C = HandlerSet> {
    id: InstanceId,
    registry: Registry<C>,
}

impl<C: HandlerCollection> Attached<C> {
    /// Identity of this instance inside its registry.
    #[must_use]
    pub const fn id(&self) -> InstanceId {
        self.id
    }

    /// The registry this instance lives in.
    #[must_use]
    pub const fn registry(&self) -> &Registry<C> {
        &self.registry
    }

    /// Registers a handler under `key` for this instance.
    pub fn on<T, H>(&self, key: impl Into<EventName>, handler: H) -> C::Stored<T>
    where
        T: ?Sized + 'static,
        H: IntoHandler<T>,
        Handler<T>: TryHandle,
    {
        let key = key.into();
        let handler = handler.into_handler();
        trace!(
            instance = %self.id,
            event = %key,
            payload = handler.payload_type(),
            handler = %handler.id(),
            "Registering handler"
        );
        self.registry.insert(self.id, key, |handlers| handlers.insert(handler))
    }

    /// Removes one registration of `handler` under `key`.
    pub fn off<Q>(&self, key: &Q, handler: &impl HandlerIdentity) -> bool
    where
        EventName: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        let id = handler.handler_id();
        let removed = self
            .registry
            .inner
            .instances
            .write()
            .get_mut(&self.id)
            .and_then(|events| events.get_mut(key))
            .is_some_and(|handlers| handlers.remove(id));
        trace!(instance = %self.id, event = ?key, handler = %id, removed, "Removing handler");
        removed
    }

    /// Offers `payload` to this instance's handlers under `key`.
    ///
    /// The handler list is captured before the first handler runs.
    ///
    /// # Errors
    /// Returns [`EventError::Handler`](crate::EventError::Handler) if a handler failed.
    pub fn fire<Q, P>(&self, key: &Q, payload: &P) -> Result<Outcome>
    where
        EventName: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
        P: Event,
    {
        self.fire_dyn(key, payload)
    }

    /// Offers a type-erased payload, matched on the runtime type behind it.
    ///
    /// # Errors
    /// Same as [`Attached::fire`].
    pub fn fire_dyn<Q>(&self, key: &Q, payload: &dyn Any) -> Result<Outcome>
    where
        EventName: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        let snapshot = self
            .registry
            .inner
            .instances
            .read()
            .get(&self.id)
            .and_then(|events| events.get(key))
            .map(HandlerCollection::snapshot);

        let Some(handlers) = snapshot else {
            trace!(instance = %self.id, event = ?key, "No handlers registered");
            return Ok(Outcome::Completed);
        };
        dispatch(&key, &handlers, payload)
    }

    /// Fires with no payload.
    ///
    /// # Errors
    /// Same as [`Attached::fire`].
    pub fn fire_empty<Q>(&self, key: &Q) -> Result<Outcome>
    where
        EventName: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        self.fire(key, &())
    }

    /// Number of registrations under `key` for this instance.
    #[must_use]
    pub fn listeners<Q>(&self, key: &Q) -> usize
    where
        EventName: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.registry
            .inner
            .instances
            .read()
            .get(&self.id)
            .and_then(|events| events.get(key))
            .map_or(0, HandlerCollection::len)
    }

    /// Drops every handler of this instance.
    pub fn detach(self) -> bool {
        self.registry.detach(self.id)
    }
}

impl Attached<RankedHandlers> {
    /// Registers a handler under `key` at an explicit priority. Lower runs first.
    pub fn on_ranked<T, H>(
        &self,
        key: impl Into<EventName>,
        handler: H,
        priority: i32,
    ) -> RankedHandler<T>
    where
        T: ?Sized + 'static,
        H: IntoHandler<T>,
        Handler<T>: TryHandle,
    {
        let key = key.into();
        let handler = handler.into_handler();
        trace!(
            instance = %self.id,
            event = %key,
            payload = handler.payload_type(),
            handler = %handler.id(),
            priority,
            "Registering ranked handler"
        );
        self.registry.insert(self.id, key, |handlers| handlers.insert_ranked(handler, priority))
    }
}

impl<C> Clone for Attached<C> {
    fn clone(&self) -> Self {
        Self { id: self.id, registry: self.registry.clone() }
    }
}

impl<C> fmt::Debug for Attached<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attached").field("id", &self.id).finish_non_exhaustive()
    }
}
