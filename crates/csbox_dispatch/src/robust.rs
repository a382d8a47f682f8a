//! Failure-isolating delivery that reports instead of raising.

use crate::{Dispatch, Kwargs, Sender, Signal};

/// Where isolated receiver failures are reported.
pub trait FailureReporter {
    fn report(&self, line: &str);
}

/// Reports through `tracing::warn!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn report(&self, line: &str) {
        tracing::warn!("{line}");
    }
}

/// Send with no sender, logging every failed receiver as a warning.
pub fn fire_robust(signal: &Signal, kwargs: &Kwargs) -> Dispatch {
    fire_robust_from(signal, Sender::NONE, kwargs, &TracingReporter)
}

pub fn fire_robust_from(
    signal: &Signal,
    sender: Sender,
    kwargs: &Kwargs,
    reporter: &dyn FailureReporter,
) -> Dispatch {
    let dispatch = signal.send_robust(sender, kwargs);
    check_responses(&dispatch, reporter);
    dispatch
}

/// Report one line per failed response. Returns how many failed.
pub fn check_responses(dispatch: &Dispatch, reporter: &dyn FailureReporter) -> usize {
    let mut failed = 0;
    for response in dispatch.failures() {
        if let Some(failure) = response.failure() {
            reporter.report(&format!(
                "Error in receiver {} (module: {}): {}",
                response.name(),
                response.module(),
                failure
            ));
            failed += 1;
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{receiver_fn, ConnectOptions, ReceiverResult};
    use serde_json::Value;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        lines: RefCell<Vec<String>>,
    }

    impl FailureReporter for Recorder {
        fn report(&self, line: &str) {
            self.lines.borrow_mut().push(line.to_string());
        }
    }

    #[test]
    fn one_warning_per_failed_receiver() {
        let signal = Signal::new();
        let ok = receiver_fn("on_prelevelinit", "scripts.level", |_, _| Ok(Value::Bool(true)));
        let bad = receiver_fn("parse_threshold", "scripts.rules", |_, _| -> ReceiverResult {
            Err("ValueError: invalid literal".into())
        });
        signal.connect_with(&ok, ConnectOptions::new().strong()).unwrap();
        signal.connect_with(&bad, ConnectOptions::new().strong()).unwrap();

        let recorder = Recorder::default();
        let dispatch = fire_robust_from(&signal, Sender::NONE, &Kwargs::new(), &recorder);

        assert_eq!(dispatch.len(), 2);
        assert_eq!(dispatch.failure_count(), 1);
        assert_eq!(
            *recorder.lines.borrow(),
            vec![
                "Error in receiver parse_threshold (module: scripts.rules): ValueError: invalid literal"
                    .to_string()
            ]
        );
    }

    #[test]
    fn every_receiver_runs_even_when_all_fail() {
        let signal = Signal::new();
        let receivers: Vec<_> = (0..4)
            .map(|i| {
                receiver_fn(format!("failing_{i}"), "scripts", |_, _| -> ReceiverResult {
                    Err("nope".into())
                })
            })
            .collect();
        for receiver in &receivers {
            signal.connect(receiver).unwrap();
        }

        let recorder = Recorder::default();
        let dispatch = fire_robust_from(&signal, Sender::NONE, &Kwargs::new(), &recorder);
        assert_eq!(dispatch.failure_count(), 4);
        assert_eq!(recorder.lines.borrow().len(), 4);
    }

    #[test]
    fn fire_robust_on_unbound_signal_is_quiet() {
        let signal = Signal::new();
        let dispatch = fire_robust(&signal, &Kwargs::new());
        assert!(dispatch.is_empty());
    }
}
