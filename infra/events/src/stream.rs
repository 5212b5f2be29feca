//! Single-stream owners: the owner itself is the event key.

use crate::collection::{HandlerCollection, HandlerSet, RankedHandlers};
use crate::config::BusConfig;
use crate::dispatch::dispatch;
use crate::error::Result;
use crate::flow::Outcome;
use crate::handler::{Event, Handler, HandlerIdentity, IntoHandler, TryHandle};
use crate::ranked::RankedHandler;
use std::any::{Any, type_name};
use tracing::trace;

/// The capability of an owner that is its own, single, event stream.
///
/// Implementors hold an optional collection; it is created by the first `on`.
pub trait EventStream {
    /// Collection backing the stream.
    type Handlers: HandlerCollection;

    /// The stream's collection, or `None` before the first registration.
    fn handlers(&self) -> Option<&Self::Handlers>;

    /// The slot holding the collection.
    fn handlers_mut(&mut self) -> &mut Option<Self::Handlers>;

    /// Settings applied when the collection is created.
    fn config(&self) -> BusConfig {
        BusConfig::DEFAULT
    }

    /// The stream's collection, created empty on first use.
    fn collection(&mut self) -> &mut Self::Handlers {
        let config = self.config();
        self.handlers_mut().get_or_insert_with(|| {
            trace!(
                event = type_name::<Self>(),
                capacity = config.capacity(),
                "Initializing handler collection"
            );
            Self::Handlers::create(&config)
        })
    }

    /// Registers a handler and returns what was stored.
    fn on<T, H>(&mut self, handler: H) -> <Self::Handlers as HandlerCollection>::Stored<T>
    where
        T: ?Sized + 'static,
        H: IntoHandler<T>,
        Handler<T>: TryHandle,
    {
        let handler = handler.into_handler();
        trace!(
            event = type_name::<Self>(),
            payload = handler.payload_type(),
            handler = %handler.id(),
            "Registering handler"
        );
        self.collection().insert(handler)
    }

    /// Removes one registration of `handler`. Returns `false` when nothing matched.
    fn off(&mut self, handler: &impl HandlerIdentity) -> bool {
        let id = handler.handler_id();
        let removed = self.handlers_mut().as_mut().is_some_and(|handlers| handlers.remove(id));
        trace!(event = type_name::<Self>(), handler = %id, removed, "Removing handler");
        removed
    }

    /// Offers `payload` to every handler, in collection order.
    ///
    /// # Errors
    /// Returns [`EventError::Handler`](crate::EventError::Handler) if a handler failed.
    fn fire<P: Event>(&self, payload: &P) -> Result<Outcome> {
        self.fire_dyn(payload)
    }

    /// Offers a type-erased payload, matched on the runtime type behind it.
    ///
    /// # Errors
    /// Same as [`EventStream::fire`].
    fn fire_dyn(&self, payload: &dyn Any) -> Result<Outcome> {
        let event = type_name::<Self>();
        let Some(handlers) = self.handlers() else {
            trace!(event, "No handlers registered");
            return Ok(Outcome::Completed);
        };
        dispatch(&event, &handlers.snapshot(), payload)
    }

    /// Fires with no payload.
    ///
    /// # Errors
    /// Same as [`EventStream::fire`].
    fn fire_empty(&self) -> Result<Outcome> {
        self.fire(&())
    }

    /// Number of registrations on the stream.
    fn listeners(&self) -> usize {
        self.handlers().map_or(0, HandlerCollection::len)
    }
}

/// Priority-aware registration for streams backed by [`RankedHandlers`].
pub trait RankedEventStream: EventStream<Handlers = RankedHandlers> {
    /// Registers a handler at an explicit priority. Lower runs first.
    fn on_ranked<T, H>(&mut self, handler: H, priority: i32) -> RankedHandler<T>
    where
        T: ?Sized + 'static,
        H: IntoHandler<T>,
        Handler<T>: TryHandle,
    {
        let handler = handler.into_handler();
        trace!(
            event = type_name::<Self>(),
            payload = handler.payload_type(),
            handler = %handler.id(),
            priority,
            "Registering ranked handler"
        );
        self.collection().insert_ranked(handler, priority)
    }
}

impl<S: EventStream<Handlers = RankedHandlers> + ?Sized> RankedEventStream for S {}

/// A standalone single-stream owner.
///
/// # Example
/// ```rust
/// use eventful::{Emitter, EventStream, Flow, Outcome};
///
/// let mut saves = Emitter::new();
/// saves.on(|path: &String| if path.ends_with(".lock") { Flow::Veto } else { Flow::Continue });
///
/// assert_eq!(saves.fire(&String::from("notes.txt")).unwrap(), Outcome::Completed);
/// assert_eq!(saves.fire(&String::from("db.lock")).unwrap(), Outcome::Vetoed);
/// ```
#[derive(Debug)]
pub struct Emitter<C = HandlerSet> {
    handlers: Option<C>,
    config: BusConfig,
}

/// An [`Emitter`] that runs handlers in priority order.
pub type RankedEmitter = Emitter<RankedHandlers>;

impl Emitter {
    /// Creates an emitter with an unordered handler set.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_config(BusConfig::DEFAULT)
    }
}

impl Emitter<RankedHandlers> {
    /// Creates an emitter that orders handlers by priority.
    #[must_use]
    pub const fn ranked() -> Self {
        Self::with_config(BusConfig::DEFAULT)
    }
}

impl<C> Emitter<C> {
    /// Creates an emitter whose collection will be built with `config`.
    #[must_use]
    pub const fn with_config(config: BusConfig) -> Self {
        Self { handlers: None, config }
    }
}

impl<C: HandlerCollection> Default for Emitter<C> {
    fn default() -> Self {
        Self::with_config(BusConfig::DEFAULT)
    }
}

impl<C: HandlerCollection> EventStream for Emitter<C> {
    type Handlers = C;

    fn handlers(&self) -> Option<&C> {
        self.handlers.as_ref()
    }

    fn handlers_mut(&mut self) -> &mut Option<C> {
        &mut self.handlers
    }

    fn config(&self) -> BusConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::Flow;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct Saved(&'static str);

    #[test]
    fn test_emitter_lazy_collection() {
        let mut emitter = Emitter::new();
        assert!(emitter.handlers().is_none());
        assert_eq!(emitter.fire(&Saved("a")).unwrap(), Outcome::Completed);
        assert!(!emitter.off(&Handler::new(|_: &Saved| ())));
        assert!(emitter.handlers().is_none());

        let handler = emitter.on(|_: &Saved| ());
        assert_eq!(emitter.listeners(), 1);
        assert!(emitter.off(&handler));
        assert!(emitter.handlers().is_some());
        assert_eq!(emitter.listeners(), 0);
    }

    #[test]
    fn test_ranked_emitter_orders_and_consumes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut emitter = RankedEmitter::ranked();

        let plan =
            [("late", 9, Flow::Continue), ("first", 1, Flow::Continue), ("stop", 5, Flow::Consume)];
        for (name, priority, flow) in plan {
            let log = Arc::clone(&log);
            emitter.on_ranked(
                move |s: &Saved| {
                    log.lock().unwrap().push((name, s.0));
                    flow
                },
                priority,
            );
        }

        assert_eq!(emitter.fire(&Saved("x")).unwrap(), Outcome::Consumed);
        assert_eq!(*log.lock().unwrap(), vec![("first", "x"), ("stop", "x")]);
    }

    #[test]
    fn test_remove_ranked_through_bare_handler() {
        let mut emitter = Emitter::ranked();
        let handler = Handler::new(|_: &Saved| Flow::Veto);
        emitter.on_ranked(handler.clone(), 3);

        assert_eq!(emitter.fire(&Saved("y")).unwrap(), Outcome::Vetoed);
        assert!(emitter.off(&handler));
        assert!(!emitter.off(&handler));
        assert_eq!(emitter.fire(&Saved("y")).unwrap(), Outcome::Completed);
    }

    #[test]
    fn test_forwarding_erased_payloads() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut audit = Emitter::new();
        let seen = Arc::clone(&log);
        audit.on(move |s: &Saved| seen.lock().unwrap().push(s.0));

        let mut source = Emitter::new();
        source.on(Handler::any(move |payload: &dyn Any| {
            audit.fire_dyn(payload).map(|_| Flow::Continue)
        }));

        assert_eq!(source.fire(&Saved("z")).unwrap(), Outcome::Completed);
        assert_eq!(source.fire(&7_u8).unwrap(), Outcome::Completed);
        assert_eq!(*log.lock().unwrap(), vec!["z"]);
    }

    #[test]
    fn test_fire_empty() {
        let mut emitter = Emitter::new();
        emitter.on(|_: &Saved| Flow::Veto);
        emitter.on(|_: &()| Flow::Consume);
        assert_eq!(emitter.fire_empty().unwrap(), Outcome::Consumed);
    }
}
