//! Control-flow values exchanged between handlers and the dispatch loop.

use crate::error::{BoxError, EventError, Result};

/// What a handler asks the dispatch loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Flow {
    /// Keep going with the next handler.
    #[default]
    Continue,
    /// Stop dispatching and report the fire as failed.
    Veto,
    /// Stop dispatching and report the fire as successful.
    Consume,
}

/// Result of offering a payload to a single handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attempt {
    /// The payload's runtime type did not match; the handler was not called.
    Skipped,
    /// The handler ran and returned this flow.
    Handled(Flow),
}

impl Attempt {
    /// `true` if the handler accepted the payload.
    #[must_use]
    pub const fn matched(self) -> bool {
        matches!(self, Self::Handled(_))
    }

    /// The flow requested by the handler, treating a skip as [`Flow::Continue`].
    #[must_use]
    pub const fn flow(self) -> Flow {
        match self {
            Self::Skipped => Flow::Continue,
            Self::Handled(flow) => flow,
        }
    }
}

/// Terminal state of one `fire` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Every handler was offered the payload.
    Completed,
    /// A handler consumed the event; later handlers were not invoked.
    Consumed,
    /// A handler vetoed the event; later handlers were not invoked.
    Vetoed,
}

impl Outcome {
    /// `false` only when the event was vetoed.
    #[must_use]
    pub const fn is_success(self) -> bool {
        !matches!(self, Self::Vetoed)
    }

    /// `true` if a handler stopped dispatch early, by veto or by consume.
    #[must_use]
    pub const fn is_interrupted(self) -> bool {
        !matches!(self, Self::Completed)
    }
}

impl From<Outcome> for bool {
    #[inline]
    fn from(outcome: Outcome) -> Self {
        outcome.is_success()
    }
}

/// Return types a handler closure may use.
///
/// `()` means [`Flow::Continue`]. Any error converts into [`EventError::Handler`].
pub trait IntoFlow {
    /// Converts the handler's return value into a flow or a failure.
    ///
    /// # Errors
    /// Returns [`EventError::Handler`] when the handler itself failed.
    fn into_flow(self) -> Result<Flow>;
}

impl IntoFlow for () {
    #[inline]
    fn into_flow(self) -> Result<Flow> {
        Ok(Flow::Continue)
    }
}

impl IntoFlow for Flow {
    #[inline]
    fn into_flow(self) -> Result<Flow> {
        Ok(self)
    }
}

impl<E: Into<BoxError>> IntoFlow for std::result::Result<(), E> {
    #[inline]
    fn into_flow(self) -> Result<Flow> {
        self.map(|()| Flow::Continue).map_err(|e| EventError::from(e.into()))
    }
}

impl<E: Into<BoxError>> IntoFlow for std::result::Result<Flow, E> {
    #[inline]
    fn into_flow(self) -> Result<Flow> {
        self.map_err(|e| EventError::from(e.into()))
    }
}
