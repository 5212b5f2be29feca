use crate::error::{EventErrorExt, Result};
use crate::flow::{Attempt, Flow, Outcome};
use crate::handler::SharedHandler;
use std::any::Any;
use std::fmt;
use tracing::{debug, trace};

/// Offers `payload` to each handler in order until one vetoes, consumes, or fails.
///
/// Matching goes by the runtime type behind `payload`. `handlers` is a snapshot; nothing
/// done by a handler can change what this call visits.
pub(crate) fn dispatch(
    event: &dyn fmt::Debug,
    handlers: &[SharedHandler],
    payload: &dyn Any,
) -> Result<Outcome> {
    let mut matched = 0_usize;

    for handler in handlers {
        let attempt =
            handler.try_handle(payload).context(handler.payload_type()).inspect_err(|e| {
                debug!(
                    event = ?event,
                    payload = handler.payload_type(),
                    handler = %handler.handler_id(),
                    error = %e,
                    "Handler failed, dispatch abandoned"
                );
            })?;

        let flow = match attempt {
            Attempt::Skipped => continue,
            Attempt::Handled(flow) => flow,
        };
        matched += 1;

        match flow {
            Flow::Continue => {},
            Flow::Veto => {
                debug!(
                    event = ?event,
                    payload = handler.payload_type(),
                    handler = %handler.handler_id(),
                    "Event vetoed"
                );
                return Ok(Outcome::Vetoed);
            },
            Flow::Consume => {
                debug!(
                    event = ?event,
                    payload = handler.payload_type(),
                    handler = %handler.handler_id(),
                    "Event consumed"
                );
                return Ok(Outcome::Consumed);
            },
        }
    }

    trace!(
        event = ?event,
        offered = handlers.len(),
        matched,
        "Event dispatched"
    );
    Ok(Outcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BoxError, EventError};
    use crate::handler::Handler;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn recording(log: &Log, name: &'static str, flow: Flow) -> SharedHandler {
        let log = Arc::clone(log);
        Arc::new(Handler::new(move |_: &u32| {
            log.lock().unwrap().push(name);
            flow
        }))
    }

    #[test]
    fn test_runs_all_on_continue() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers =
            vec![recording(&log, "a", Flow::Continue), recording(&log, "b", Flow::Continue)];

        assert_eq!(dispatch(&"t", &handlers, &1_u32).unwrap(), Outcome::Completed);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_first_signal_wins() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = vec![
            recording(&log, "a", Flow::Consume),
            recording(&log, "b", Flow::Veto),
        ];

        assert_eq!(dispatch(&"t", &handlers, &1_u32).unwrap(), Outcome::Consumed);
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[test]
    fn test_skipped_handlers_do_not_signal() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = vec![recording(&log, "a", Flow::Veto)];

        assert_eq!(dispatch(&"t", &handlers, &"text").unwrap(), Outcome::Completed);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_matches_type_behind_erased_payload() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handlers = vec![recording(&log, "a", Flow::Consume)];
        let erased: Box<dyn Any> = Box::new(4_u32);

        assert_eq!(dispatch(&"t", &handlers, &*erased).unwrap(), Outcome::Consumed);
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[test]
    fn test_failure_names_payload_type() {
        let failing: SharedHandler =
            Arc::new(Handler::new(|_: &u32| -> std::result::Result<(), BoxError> {
                Err("quota exceeded".into())
            }));

        let err = dispatch(&"t", &[failing], &1_u32).unwrap_err();
        assert!(matches!(&err, EventError::Handler { context: Some(c), .. } if c == "u32"));
        assert_eq!(err.to_string(), "Handler failed (u32): quota exceeded");
    }
}
