//! Per-receiver outcomes of a send.

use crate::{Receiver, ReceiverError};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// A receiver failure captured by `send_robust` instead of being propagated.
#[derive(Debug, Error)]
pub enum ReceiverFailure {
    #[error("{0}")]
    Error(ReceiverError),

    #[error("receiver panicked: {0}")]
    Panic(String),
}

impl ReceiverFailure {
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "<non-string panic payload>".to_string()
        };
        ReceiverFailure::Panic(message)
    }
}

/// One receiver's outcome.
pub struct Response {
    receiver: Rc<dyn Receiver>,
    outcome: Result<Value, ReceiverFailure>,
}

impl Response {
    pub(crate) fn new(receiver: Rc<dyn Receiver>, outcome: Result<Value, ReceiverFailure>) -> Self {
        Self { receiver, outcome }
    }

    pub fn receiver(&self) -> &Rc<dyn Receiver> {
        &self.receiver
    }

    pub fn name(&self) -> &str {
        self.receiver.name()
    }

    pub fn module(&self) -> &str {
        self.receiver.module()
    }

    pub fn outcome(&self) -> Result<&Value, &ReceiverFailure> {
        self.outcome.as_ref()
    }

    pub fn value(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    pub fn failure(&self) -> Option<&ReceiverFailure> {
        self.outcome.as_ref().err()
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("receiver", &self.name())
            .field("module", &self.module())
            .field("outcome", &self.outcome)
            .finish()
    }
}

/// Responses of a single send, in delivery order.
#[derive(Debug, Default)]
pub struct Dispatch {
    responses: Vec<Response>,
}

impl Dispatch {
    pub(crate) fn new(responses: Vec<Response>) -> Self {
        Self { responses }
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Response> {
        self.responses.iter()
    }

    pub fn failures(&self) -> impl Iterator<Item = &Response> {
        self.responses.iter().filter(|response| response.is_failure())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.responses.iter().filter_map(Response::value)
    }

    pub fn into_responses(self) -> Vec<Response> {
        self.responses
    }
}

impl<'a> IntoIterator for &'a Dispatch {
    type Item = &'a Response;
    type IntoIter = std::slice::Iter<'a, Response>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.iter()
    }
}
