//! # Eventful
//!
//! Synchronous, in-process, typed event dispatch.
//!
//! ## Overview
//!
//! Handlers are registered against an event key and bound to a concrete payload type.
//! Firing an event offers the payload to every handler under the key, in order, and calls
//! only those whose payload type matches the payload's runtime type. Any handler can stop
//! the dispatch early:
//!
//! * [`Flow::Veto`] stops it and reports failure ([`Outcome::Vetoed`]).
//! * [`Flow::Consume`] stops it and reports success ([`Outcome::Consumed`]).
//!
//! ## Owners
//!
//! * [`EventBus`]: named events, unordered handlers. [`RankedEventBus`] orders by priority.
//! * [`Emitter`]: a single stream where the owner itself is the key.
//! * [`Registry`]: a shared, thread-safe store keyed by attached instance.
//! * [`Eventful`] / [`EventStream`]: implement these to keep handler storage inside
//!   your own types.
//!
//! # Example
//!
//! ```rust
//! use eventful::{EventBus, Eventful, Flow, Outcome, RankedEventful};
//!
//! #[derive(Debug)]
//! struct Transfer {
//!     amount: u64,
//! }
//!
//! fn main() -> Result<(), eventful::EventError> {
//!     let mut bus = EventBus::ranked();
//!
//!     let limit = |t: &Transfer| if t.amount > 1_000 { Flow::Veto } else { Flow::Continue };
//!     bus.on_ranked("transfer", limit, -10);
//!     bus.on("transfer", |t: &Transfer| println!("moving {}", t.amount));
//!
//!     assert_eq!(bus.fire("transfer", &Transfer { amount: 10 })?, Outcome::Completed);
//!     assert_eq!(bus.fire("transfer", &Transfer { amount: 5_000 })?, Outcome::Vetoed);
//!     Ok(())
//! }
//! ```

mod bus;
mod collection;
mod config;
mod dispatch;
mod error;
mod flow;
mod handler;
mod priority;
mod ranked;
mod registry;
mod stream;

pub use bus::{EventBus, EventName, Eventful, RankedEventBus, RankedEventful};
pub use collection::{HandlerCollection, HandlerSet, RankedHandlers};
pub use config::{BusConfig, DEFAULT_CAPACITY, DEFAULT_PRIORITY};
pub use error::{BoxError, EventError, EventErrorExt, Result};
pub use flow::{Attempt, Flow, IntoFlow, Outcome};
pub use handler::{
    Event, Handler, HandlerId, HandlerIdentity, IntoHandler, SharedHandler, TryHandle,
};
pub use priority::{Ordered, Prioritized, PrioritySet};
pub use ranked::RankedHandler;
pub use registry::{Attached, InstanceId, RankedRegistry, Registry};
pub use stream::{Emitter, EventStream, RankedEmitter, RankedEventStream};
