use crate::config::DEFAULT_PRIORITY;
use crate::error::Result;
use crate::flow::{Attempt, Flow};
use crate::handler::{Handler, HandlerId, HandlerIdentity, TryHandle};
use std::any::{Any, type_name};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A [`Handler`] paired with an invocation priority. Lower priorities run first.
///
/// Equality and hashing look only at the wrapped handler, so a ranked handler equals the
/// bare handler it wraps and can be removed through it. Two ranked handlers wrapping the
/// same handler at different priorities are therefore equal.
pub struct RankedHandler<T: ?Sized + 'static> {
    handler: Handler<T>,
    priority: i32,
}

impl<T: ?Sized + 'static> RankedHandler<T> {
    /// Pairs `handler` with `priority`.
    #[must_use]
    pub const fn new(handler: Handler<T>, priority: i32) -> Self {
        Self { handler, priority }
    }

    /// Invocation priority. Lower runs first.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// The wrapped handler.
    #[must_use]
    pub const fn handler(&self) -> &Handler<T> {
        &self.handler
    }

    /// Unwraps the handler, dropping the priority.
    #[must_use]
    pub fn into_inner(self) -> Handler<T> {
        self.handler
    }

    /// Invokes the wrapped handler with an already-typed payload.
    ///
    /// # Errors
    /// Returns [`EventError::Handler`](crate::EventError::Handler) if the handler failed.
    pub fn handle(&self, payload: &T) -> Result<Flow> {
        self.handler.handle(payload)
    }

    /// Orders by priority, except that wrappers of the same handler are always `Equal`.
    ///
    /// Distinct handlers with equal priority also compare `Equal`; their relative
    /// invocation order is unspecified.
    #[must_use]
    pub fn compare<U: ?Sized + 'static>(&self, other: &RankedHandler<U>) -> Ordering {
        if self.handler.id() == other.handler.id() {
            return Ordering::Equal;
        }
        self.priority.cmp(&other.priority)
    }
}

impl<T: ?Sized + 'static> Handler<T> {
    /// Wraps this handler with a priority.
    #[must_use]
    pub const fn ranked(self, priority: i32) -> RankedHandler<T> {
        RankedHandler::new(self, priority)
    }
}

impl<T: ?Sized + 'static> From<Handler<T>> for RankedHandler<T> {
    fn from(handler: Handler<T>) -> Self {
        Self::new(handler, DEFAULT_PRIORITY)
    }
}

impl<T: ?Sized + 'static> Clone for RankedHandler<T> {
    fn clone(&self) -> Self {
        Self { handler: self.handler.clone(), priority: self.priority }
    }
}

impl<T: ?Sized + 'static> fmt::Debug for RankedHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RankedHandler")
            .field("id", &self.handler.id())
            .field("payload", &type_name::<T>())
            .field("priority", &self.priority)
            .finish()
    }
}

impl<T: ?Sized + 'static> PartialEq for RankedHandler<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handler == other.handler
    }
}

impl<T: ?Sized + 'static> Eq for RankedHandler<T> {}

impl<T: ?Sized + 'static> PartialEq<Handler<T>> for RankedHandler<T> {
    fn eq(&self, other: &Handler<T>) -> bool {
        self.handler == *other
    }
}

impl<T: ?Sized + 'static> PartialEq<RankedHandler<T>> for Handler<T> {
    fn eq(&self, other: &RankedHandler<T>) -> bool {
        *self == other.handler
    }
}

impl<T: ?Sized + 'static> Hash for RankedHandler<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handler.hash(state);
    }
}

impl<T: ?Sized + 'static> HandlerIdentity for RankedHandler<T> {
    #[inline]
    fn handler_id(&self) -> HandlerId {
        self.handler.id()
    }
}

impl<T: ?Sized + 'static> TryHandle for RankedHandler<T>
where
    Handler<T>: TryHandle,
{
    #[inline]
    fn try_handle(&self, payload: &dyn Any) -> Result<Attempt> {
        self.handler.try_handle(payload)
    }

    fn payload_type(&self) -> &'static str {
        type_name::<T>()
    }
}
