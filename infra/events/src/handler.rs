//! Typed handlers and their type-erased dispatch contract.

use crate::error::Result;
use crate::flow::{Attempt, Flow, IntoFlow};
use std::any::{Any, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Marker trait for values that can be fired as event payloads.
///
/// Any `'static` type implements this trait. Payloads are only borrowed for the length
/// of one `fire`, so they need not be `Send` or `Sync`: a `Cell` or `RefCell` payload
/// lets handlers write results back to the caller.
pub trait Event: Any {}
impl<T: Any> Event for T {}

/// Stable identity of a registered callable.
///
/// Allocated once per [`Handler::new`] and shared by every clone of that handler,
/// including the copy stored inside a [`RankedHandler`](crate::RankedHandler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    fn next() -> Self {
        Self(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, useful for logs.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Anything that can name the handler it stands for. Used by removal.
pub trait HandlerIdentity {
    /// The identity of the underlying callable.
    fn handler_id(&self) -> HandlerId;
}

impl HandlerIdentity for HandlerId {
    #[inline]
    fn handler_id(&self) -> HandlerId {
        *self
    }
}

/// The type-erased face of a handler, as stored in a collection.
///
/// Offering a payload of the wrong type is a silent skip, never an error.
pub trait TryHandle: HandlerIdentity + fmt::Debug + Send + Sync {
    /// Invokes the handler if `payload` has the handler's payload type.
    ///
    /// # Errors
    /// Returns [`EventError::Handler`](crate::EventError::Handler) if the handler ran and failed.
    fn try_handle(&self, payload: &dyn Any) -> Result<Attempt>;

    /// Name of the payload type this handler accepts.
    fn payload_type(&self) -> &'static str;
}

/// A type-erased handler shared between a collection and the snapshots taken from it.
pub type SharedHandler = Arc<dyn TryHandle>;

/// A unit of logic bound to payloads of type `T`.
///
/// Cloning is cheap and preserves identity: a clone compares equal to the original and
/// removes the same registration. Two handlers built from identical closures are distinct.
///
/// `Handler<dyn Any>` is the wildcard: it accepts every payload.
///
/// # Example
/// ```rust
/// use eventful::{Flow, Handler};
///
/// let audit =
///     Handler::new(|amount: &u64| if *amount > 1_000 { Flow::Veto } else { Flow::Continue });
/// assert_eq!(audit.handle(&5).unwrap(), Flow::Continue);
/// assert_eq!(audit.handle(&5_000).unwrap(), Flow::Veto);
/// ```
pub struct Handler<T: ?Sized + 'static> {
    id: HandlerId,
    func: Arc<dyn Fn(&T) -> Result<Flow> + Send + Sync>,
}

impl<T: ?Sized + 'static> Handler<T> {
    /// Wraps a closure. The closure may return `()`, [`Flow`], or a `Result` of either.
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: IntoFlow,
    {
        Self { id: HandlerId::next(), func: Arc::new(move |payload: &T| f(payload).into_flow()) }
    }

    /// Identity of this handler.
    #[must_use]
    pub const fn id(&self) -> HandlerId {
        self.id
    }

    /// Invokes the handler with an already-typed payload.
    ///
    /// # Errors
    /// Returns [`EventError::Handler`](crate::EventError::Handler) if the closure failed.
    pub fn handle(&self, payload: &T) -> Result<Flow> {
        (self.func)(payload)
    }

    /// Name of the payload type this handler accepts.
    #[must_use]
    pub fn payload_type(&self) -> &'static str {
        type_name::<T>()
    }
}

impl Handler<dyn Any> {
    /// Builds a wildcard handler that sees every payload, including the empty one.
    ///
    /// The payload arrives type-erased; it can be inspected with `is`/`downcast_ref` or
    /// forwarded as is through `fire_dyn`.
    pub fn any<F, R>(f: F) -> Self
    where
        F: Fn(&dyn Any) -> R + Send + Sync + 'static,
        R: IntoFlow,
    {
        Self::new(f)
    }
}

impl<T: ?Sized + 'static> Clone for Handler<T> {
    fn clone(&self) -> Self {
        Self { id: self.id, func: Arc::clone(&self.func) }
    }
}

impl<T: ?Sized + 'static> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("id", &self.id).field("payload", &type_name::<T>()).finish()
    }
}

impl<T: ?Sized + 'static> PartialEq for Handler<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: ?Sized + 'static> Eq for Handler<T> {}

impl<T: ?Sized + 'static> Hash for Handler<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: ?Sized + 'static> HandlerIdentity for Handler<T> {
    #[inline]
    fn handler_id(&self) -> HandlerId {
        self.id
    }
}

impl<T: Event> TryHandle for Handler<T> {
    fn try_handle(&self, payload: &dyn Any) -> Result<Attempt> {
        payload
            .downcast_ref::<T>()
            .map_or(Ok(Attempt::Skipped), |payload| self.handle(payload).map(Attempt::Handled))
    }

    fn payload_type(&self) -> &'static str {
        type_name::<T>()
    }
}

impl TryHandle for Handler<dyn Any> {
    fn try_handle(&self, payload: &dyn Any) -> Result<Attempt> {
        self.handle(payload).map(Attempt::Handled)
    }

    fn payload_type(&self) -> &'static str {
        type_name::<dyn Any>()
    }
}

/// Conversion used by `on`: accepts a ready [`Handler`] or a bare closure.
///
/// Closures need an explicit argument type (`|e: &MyEvent| ...`) so the payload
/// type can be inferred.
pub trait IntoHandler<T: ?Sized + 'static> {
    /// Produces the handler to register.
    fn into_handler(self) -> Handler<T>;
}

impl<T: ?Sized + 'static> IntoHandler<T> for Handler<T> {
    #[inline]
    fn into_handler(self) -> Self {
        self
    }
}

impl<T, F, R> IntoHandler<T> for F
where
    T: ?Sized + 'static,
    F: Fn(&T) -> R + Send + Sync + 'static,
    R: IntoFlow,
{
    #[inline]
    fn into_handler(self) -> Handler<T> {
        Handler::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    struct Deposit(u64);

    #[derive(Debug)]
    struct Withdrawal(u64);

    #[test]
    fn test_try_handle_matches_runtime_type() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let handler = Handler::new(move |d: &Deposit| {
            counter.fetch_add(usize::try_from(d.0).unwrap_or(0), Ordering::SeqCst);
        });

        let attempt = handler.try_handle(&Deposit(7)).unwrap();
        assert_eq!(attempt, Attempt::Handled(Flow::Continue));
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_try_handle_skips_other_types_silently() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let handler = Handler::new(move |_: &Deposit| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(handler.try_handle(&Withdrawal(3)).unwrap(), Attempt::Skipped);
        assert_eq!(handler.try_handle(&()).unwrap(), Attempt::Skipped);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_wildcard_accepts_everything() {
        let handler = Handler::any(|payload: &dyn Any| {
            if payload.is::<Withdrawal>() {
                return Flow::Veto;
            }
            Flow::Continue
        });

        assert_eq!(handler.try_handle(&Deposit(1)).unwrap(), Attempt::Handled(Flow::Continue));
        assert_eq!(handler.try_handle(&Withdrawal(1)).unwrap(), Attempt::Handled(Flow::Veto));
        assert_eq!(handler.try_handle(&()).unwrap(), Attempt::Handled(Flow::Continue));
    }

    #[test]
    fn test_try_handle_uses_runtime_type_of_erased_payload() {
        let handler =
            Handler::new(|d: &Deposit| if d.0 > 10 { Flow::Veto } else { Flow::Continue });
        let boxed: Box<dyn Any + Send + Sync> = Box::new(Deposit(11));

        assert_eq!(handler.try_handle(&*boxed).unwrap(), Attempt::Handled(Flow::Veto));
        assert_eq!(handler.try_handle(&boxed).unwrap(), Attempt::Skipped);
    }

    #[test]
    fn test_failures_propagate() {
        let handler = Handler::new(|_: &Deposit| -> std::result::Result<(), BoxError> {
            Err("ledger closed".into())
        });

        let err = handler.try_handle(&Deposit(1)).unwrap_err();
        assert_eq!(err.to_string(), "Handler failed: ledger closed");
    }

    #[test]
    fn test_identity_survives_clone_only() {
        let a = Handler::new(|_: &Deposit| ());
        let b = Handler::new(|_: &Deposit| ());
        let a2 = a.clone();

        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(a.handler_id(), a2.handler_id());
    }

    #[test]
    fn test_into_handler_from_closure() {
        let closure = |d: &Deposit| if d.0 == 0 { Flow::Veto } else { Flow::Continue };
        let handler: Handler<Deposit> = closure.into_handler();
        assert_eq!(handler.handle(&Deposit(0)).unwrap(), Flow::Veto);
        assert!(handler.payload_type().ends_with("Deposit"));
    }
}
