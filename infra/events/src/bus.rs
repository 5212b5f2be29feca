use crate::collection::{HandlerCollection, HandlerSet, RankedHandlers};
use crate::config::BusConfig;
use crate::dispatch::dispatch;
use crate::error::Result;
use crate::flow::Outcome;
use crate::handler::{Event, Handler, HandlerIdentity, IntoHandler, TryHandle};
use crate::ranked::RankedHandler;
use fxhash::{FxBuildHasher, FxHashMap};
use std::any::Any;
use std::borrow::{Borrow, Cow};
use std::fmt;
use std::hash::Hash;
use tracing::trace;

/// Name under which handlers are grouped on an [`EventBus`].
pub type EventName = Cow<'static, str>;

/// The handler-storage capability of a multi-event owner.
///
/// Implementors supply the map from event key to handler collection; registration,
/// removal and dispatch come for free. Collections are created on the first `on` for a
/// key and are never dropped by removal.
///
/// # Example
/// ```rust
/// use eventful::{EventName, Eventful, Flow, HandlerSet};
/// use fxhash::FxHashMap;
///
/// #[derive(Debug, Default)]
/// struct Account {
///     handlers: FxHashMap<EventName, HandlerSet>,
/// }
///
/// impl Eventful for Account {
///     type Key = EventName;
///     type Handlers = HandlerSet;
///
///     fn handlers(&self) -> &FxHashMap<EventName, HandlerSet> {
///         &self.handlers
///     }
///
///     fn handlers_mut(&mut self) -> &mut FxHashMap<EventName, HandlerSet> {
///         &mut self.handlers
///     }
/// }
///
/// let mut account = Account::default();
/// account.on("withdraw", |amount: &i64| if *amount > 100 { Flow::Veto } else { Flow::Continue });
///
/// assert!(account.fire("withdraw", &20_i64).unwrap().is_success());
/// assert!(!account.fire("withdraw", &500_i64).unwrap().is_success());
/// ```
pub trait Eventful {
    /// Event key. Only used for lookup.
    type Key: Eq + Hash + fmt::Debug;
    /// Collection created for each key.
    type Handlers: HandlerCollection;

    /// The owner's map from event key to handler collection.
    fn handlers(&self) -> &FxHashMap<Self::Key, Self::Handlers>;

    /// Mutable access to the same map.
    fn handlers_mut(&mut self) -> &mut FxHashMap<Self::Key, Self::Handlers>;

    /// Settings applied when a collection is created.
    fn config(&self) -> BusConfig {
        BusConfig::DEFAULT
    }

    /// The collection for `key`, created empty if this is the first use of the key.
    fn handlers_for(&mut self, key: Self::Key) -> &mut Self::Handlers {
        let config = self.config();
        self.handlers_mut().entry(key).or_insert_with_key(|key| {
            trace!(event = ?key, capacity = config.capacity(), "Initializing handler collection");
            Self::Handlers::create(&config)
        })
    }

    /// Registers a handler under `key` and returns what was stored.
    ///
    /// On a ranked collection the handler gets the configured default priority.
    fn on<T, H>(
        &mut self,
        key: impl Into<Self::Key>,
        handler: H,
    ) -> <Self::Handlers as HandlerCollection>::Stored<T>
    where
        T: ?Sized + 'static,
        H: IntoHandler<T>,
        Handler<T>: TryHandle,
    {
        let key = key.into();
        let handler = handler.into_handler();
        trace!(
            event = ?key,
            payload = handler.payload_type(),
            handler = %handler.id(),
            "Registering handler"
        );
        self.handlers_for(key).insert(handler)
    }

    /// Removes one registration of `handler` under `key`.
    ///
    /// Accepts the handler itself, its ranked wrapper or its id. Returns `false` when
    /// nothing matched, including when the key was never used.
    fn off<Q>(&mut self, key: &Q, handler: &impl HandlerIdentity) -> bool
    where
        Self::Key: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        let id = handler.handler_id();
        let removed = self.handlers_mut().get_mut(key).is_some_and(|handlers| handlers.remove(id));
        trace!(event = ?key, handler = %id, removed, "Removing handler");
        removed
    }

    /// Offers `payload` to every handler under `key`, in collection order.
    ///
    /// A key with no handlers completes immediately. A payload that is already
    /// type-erased (a `Box<dyn Any>` or the `&dyn Any` a wildcard handler receives) goes
    /// through [`Eventful::fire_dyn`] instead, which matches on the type behind it.
    ///
    /// # Errors
    /// Returns [`EventError::Handler`](crate::EventError::Handler) if a handler failed;
    /// the handlers after it were not invoked.
    fn fire<Q, P>(&self, key: &Q, payload: &P) -> Result<Outcome>
    where
        Self::Key: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
        P: Event,
    {
        self.fire_dyn(key, payload)
    }

    /// Offers a type-erased payload to every handler under `key`.
    ///
    /// Handlers are matched against the runtime type of the value behind `payload`.
    ///
    /// # Errors
    /// Same as [`Eventful::fire`].
    fn fire_dyn<Q>(&self, key: &Q, payload: &dyn Any) -> Result<Outcome>
    where
        Self::Key: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        let Some(handlers) = self.handlers().get(key) else {
            trace!(event = ?key, "No handlers registered");
            return Ok(Outcome::Completed);
        };
        dispatch(&key, &handlers.snapshot(), payload)
    }

    /// Fires with no payload. Only `Handler<()>` and wildcard handlers run.
    ///
    /// # Errors
    /// Same as [`Eventful::fire`].
    fn fire_empty<Q>(&self, key: &Q) -> Result<Outcome>
    where
        Self::Key: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        self.fire(key, &())
    }

    /// Number of registrations under `key`.
    fn listeners<Q>(&self, key: &Q) -> usize
    where
        Self::Key: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.handlers().get(key).map_or(0, HandlerCollection::len)
    }
}

/// Priority-aware registration for owners backed by [`RankedHandlers`].
pub trait RankedEventful: Eventful<Handlers = RankedHandlers> {
    /// Registers a handler under `key` at an explicit priority. Lower runs first.
    fn on_ranked<T, H>(
        &mut self,
        key: impl Into<Self::Key>,
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
            event = ?key,
            payload = handler.payload_type(),
            handler = %handler.id(),
            priority,
            "Registering ranked handler"
        );
        self.handlers_for(key).insert_ranked(handler, priority)
    }
}

impl<E: Eventful<Handlers = RankedHandlers> + ?Sized> RankedEventful for E {}

/// A standalone owner of named event streams.
///
/// `EventBus` (the default) keeps an unordered set per event.
/// [`RankedEventBus`] keeps handlers in priority order.
///
/// # Example
/// ```rust
/// use eventful::{EventBus, Eventful, Flow, Outcome};
///
/// #[derive(Debug)]
/// struct UserCreated {
///     id: u64,
/// }
///
/// let mut bus = EventBus::new();
/// let welcome = bus.on("user.created", |user: &UserCreated| {
///     assert_eq!(user.id, 42);
/// });
///
/// assert_eq!(bus.fire("user.created", &UserCreated { id: 42 }).unwrap(), Outcome::Completed);
/// assert!(bus.off("user.created", &welcome));
/// ```
#[derive(Debug)]
pub struct EventBus<C = HandlerSet> {
    handlers: FxHashMap<EventName, C>,
    config: BusConfig,
}

/// An [`EventBus`] that runs handlers in priority order.
pub type RankedEventBus = EventBus<RankedHandlers>;

impl EventBus {
    /// Creates an empty bus with unordered handler sets.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::DEFAULT)
    }
}

impl EventBus<RankedHandlers> {
    /// Creates an empty bus that orders handlers by priority.
    ///
    /// # Example
    /// ```rust
    /// use eventful::{EventBus, Eventful, RankedEventful};
    /// use std::sync::{Arc, Mutex};
    ///
    /// let order = Arc::new(Mutex::new(Vec::new()));
    /// let mut bus = EventBus::ranked();
    /// for priority in [30, -10, 20] {
    ///     let order = Arc::clone(&order);
    ///     bus.on_ranked("tick", move |_: &()| order.lock().unwrap().push(priority), priority);
    /// }
    ///
    /// bus.fire_empty("tick").unwrap();
    /// assert_eq!(*order.lock().unwrap(), vec![-10, 20, 30]);
    /// ```
    #[must_use]
    pub fn ranked() -> Self {
        Self::with_config(BusConfig::DEFAULT)
    }
}

impl<C: HandlerCollection> EventBus<C> {
    /// Creates an empty bus whose collections are built with `config`.
    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        Self { handlers: FxHashMap::with_capacity_and_hasher(0, FxBuildHasher::default()), config }
    }

    /// Names of the events that have ever had a handler registered.
    ///
    /// Only `on` creates an entry. `fire` borrows the bus immutably and `off` on an
    /// unknown key has nothing to remove, so neither adds one; an event shows up here
    /// exactly when it has, or once had, a registration.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(|name| &**name)
    }

    /// Drops every collection. Returns the number of events that were cleared.
    pub fn clear(&mut self) -> usize {
        let count = self.handlers.len();
        self.handlers.clear();
        trace!(count, "Cleared all handler collections");
        count
    }
}

impl<C: HandlerCollection> Default for EventBus<C> {
    fn default() -> Self {
        Self::with_config(BusConfig::DEFAULT)
    }
}

impl<C: HandlerCollection> Eventful for EventBus<C> {
    type Key = EventName;
    type Handlers = C;

    fn handlers(&self) -> &FxHashMap<EventName, C> {
        &self.handlers
    }

    fn handlers_mut(&mut self) -> &mut FxHashMap<EventName, C> {
        &mut self.handlers
    }

    fn config(&self) -> BusConfig {
        self.config
    }
}
