use std::borrow::Cow;

/// Type-erased failure produced by handler logic.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can escape a dispatch.
///
/// Veto and consume are not errors: they are reported through
/// [`Outcome`](crate::Outcome). Only faults a handler raises on its own end up here.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// A handler failed with something other than a control signal.
    /// Dispatch of the remaining handlers was abandoned.
    #[error("Handler failed{}: {source}", format_context(.context))]
    Handler {
        #[source]
        source: BoxError,
        context: Option<Cow<'static, str>>,
    },
}

/// Result alias used across the crate.
pub type Result<T, E = EventError> = std::result::Result<T, E>;

/// Adds `.context(..)` to results that carry, or convert into, an [`EventError`].
pub trait EventErrorExt<T> {
    /// Attaches a human-readable context to the error, replacing any previous one.
    ///
    /// # Errors
    /// Returns the original error, annotated with `context`.
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T>;
}

impl<T> EventErrorExt<T> for Result<T, EventError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Self {
        self.map_err(|mut e| {
            match &mut e {
                EventError::Handler { context: c, .. } => *c = Some(context.into()),
            }
            e
        })
    }
}

impl<T> EventErrorExt<T> for Result<T, BoxError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T> {
        self.map_err(|source| EventError::Handler { source, context: Some(context.into()) })
    }
}

impl From<BoxError> for EventError {
    #[inline]
    fn from(source: BoxError) -> Self {
        Self::Handler { source, context: None }
    }
}

fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}
