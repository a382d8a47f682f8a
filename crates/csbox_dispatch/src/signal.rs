// signal.rs - Named event channel with synchronous fan-out
//
// Delivery always iterates a snapshot of the receivers that were live when the
// send started, so receivers may connect or disconnect from inside a callback.

use crate::registry::{Ownership, ReceiverKey, ReceiverRegistry};
use crate::{
    Dispatch, DispatchError, Kwargs, Receiver, ReceiverFailure, Response, Sender, SenderFilter,
};
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// Options for [`Signal::connect_with`].
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    sender: SenderFilter,
    ownership: Ownership,
    dispatch_uid: Option<String>,
}

impl ConnectOptions {
    /// Any sender, weak ownership, identity by object.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sender(mut self, sender: impl Into<SenderFilter>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Keep the receiver alive for as long as it stays connected.
    pub fn strong(mut self) -> Self {
        self.ownership = Ownership::Strong;
        self
    }

    pub fn weak(mut self) -> Self {
        self.ownership = Ownership::Weak;
        self
    }

    /// Identify the subscription by `uid` instead of by receiver object.
    pub fn dispatch_uid(mut self, uid: impl Into<String>) -> Self {
        self.dispatch_uid = Some(uid.into());
        self
    }

    pub fn sender_filter(&self) -> SenderFilter {
        self.sender
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }
}

/// Whether a signal currently has anyone listening.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SignalState {
    Unbound,
    Bound,
}

/// A publish/subscribe event channel.
///
/// Receivers are invoked synchronously on the calling thread, in the order
/// they were connected.
pub struct Signal {
    providing_args: Vec<String>,
    registry: RefCell<ReceiverRegistry>,
}

impl Signal {
    pub fn new() -> Self {
        Self::with_args(std::iter::empty::<String>())
    }

    /// Create a signal documenting the keyword arguments its producers supply.
    pub fn with_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            providing_args: args.into_iter().map(Into::into).collect(),
            registry: RefCell::new(ReceiverRegistry::new()),
        }
    }

    pub fn providing_args(&self) -> &[String] {
        &self.providing_args
    }

    /// Connect `receiver` for any sender, held weakly.
    pub fn connect<R: Receiver + 'static>(&self, receiver: &Rc<R>) -> Result<(), DispatchError> {
        self.connect_with(receiver, ConnectOptions::default())
    }

    pub fn connect_with<R: Receiver + 'static>(
        &self,
        receiver: &Rc<R>,
        options: ConnectOptions,
    ) -> Result<(), DispatchError> {
        let receiver: Rc<dyn Receiver> = receiver.clone();
        self.connect_dyn(&receiver, options)
    }

    /// Connect an already type-erased receiver.
    ///
    /// Connecting the same (receiver, sender filter) pair twice is a no-op.
    pub fn connect_dyn(
        &self,
        receiver: &Rc<dyn Receiver>,
        options: ConnectOptions,
    ) -> Result<(), DispatchError> {
        self.validate(receiver.as_ref(), &options)?;

        let key = match options.dispatch_uid {
            Some(uid) => ReceiverKey::Uid(uid),
            None => ReceiverKey::of(receiver),
        };
        let inserted =
            self.registry
                .borrow_mut()
                .insert(key, options.sender, receiver, options.ownership);

        if inserted {
            tracing::debug!(
                receiver = receiver.name(),
                module = receiver.module(),
                sender = ?options.sender,
                ownership = ?options.ownership,
                "receiver connected"
            );
        } else {
            tracing::trace!(receiver = receiver.name(), "receiver already connected");
        }
        Ok(())
    }

    /// Returns whether a subscription was removed. Unknown receivers are ignored.
    pub fn disconnect<R: Receiver + 'static>(
        &self,
        receiver: &Rc<R>,
        sender: impl Into<SenderFilter>,
    ) -> bool {
        let receiver: Rc<dyn Receiver> = receiver.clone();
        self.disconnect_dyn(&receiver, sender)
    }

    pub fn disconnect_dyn(&self, receiver: &Rc<dyn Receiver>, sender: impl Into<SenderFilter>) -> bool {
        self.remove(ReceiverKey::of(receiver), sender.into())
    }

    /// Remove a subscription made with [`ConnectOptions::dispatch_uid`].
    pub fn disconnect_uid(&self, uid: &str, sender: impl Into<SenderFilter>) -> bool {
        self.remove(ReceiverKey::Uid(uid.to_string()), sender.into())
    }

    fn remove(&self, key: ReceiverKey, filter: SenderFilter) -> bool {
        let removed = self.registry.borrow_mut().remove(&key, filter);
        if removed {
            tracing::debug!(key = ?key, sender = ?filter, "receiver disconnected");
        }
        removed
    }

    /// Deliver to every live matching receiver, stopping at the first failure.
    ///
    /// Meant for trusted producers; a failure is handed back to the caller and
    /// receivers after the failing one are not invoked.
    pub fn send(&self, sender: Sender, kwargs: &Kwargs) -> Result<Dispatch, DispatchError> {
        let receivers = self.live_receivers(sender);
        let mut responses = Vec::with_capacity(receivers.len());

        for receiver in receivers {
            match receiver.receive(sender, kwargs) {
                Ok(value) => responses.push(Response::new(receiver, Ok(value))),
                Err(error) => {
                    return Err(DispatchError::Propagated {
                        receiver: receiver.name().to_string(),
                        module: receiver.module().to_string(),
                        error,
                    })
                }
            }
        }

        Ok(Dispatch::new(responses))
    }

    /// Deliver to every live matching receiver, capturing each failure.
    ///
    /// Errors and panics raised by a receiver end up in its [`Response`];
    /// every other receiver is still invoked.
    pub fn send_robust(&self, sender: Sender, kwargs: &Kwargs) -> Dispatch {
        let receivers = self.live_receivers(sender);
        let responses = receivers
            .into_iter()
            .map(|receiver| {
                let outcome =
                    match panic::catch_unwind(AssertUnwindSafe(|| receiver.receive(sender, kwargs))) {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(error)) => Err(ReceiverFailure::Error(error)),
                        Err(payload) => Err(ReceiverFailure::from_panic(payload.as_ref())),
                    };
                Response::new(receiver, outcome)
            })
            .collect();

        Dispatch::new(responses)
    }

    /// Whether a send from `sender` would reach anyone.
    pub fn has_listeners(&self, sender: Sender) -> bool {
        self.registry.borrow().has_match(sender)
    }

    /// Number of live subscriptions, whatever their sender filter.
    pub fn receiver_count(&self) -> usize {
        self.registry.borrow().live_count()
    }

    pub fn state(&self) -> SignalState {
        if self.receiver_count() == 0 {
            SignalState::Unbound
        } else {
            SignalState::Bound
        }
    }

    fn live_receivers(&self, sender: Sender) -> Vec<Rc<dyn Receiver>> {
        let receivers = self.registry.borrow_mut().live_matching(sender);
        tracing::trace!(%sender, receivers = receivers.len(), "dispatching signal");
        receivers
    }

    fn validate(&self, receiver: &dyn Receiver, options: &ConnectOptions) -> Result<(), DispatchError> {
        if let Some(uid) = &options.dispatch_uid {
            if uid.trim().is_empty() {
                return Err(DispatchError::InvalidReceiver {
                    receiver: receiver.name().to_string(),
                    reason: "dispatch uid must not be empty".to_string(),
                });
            }
        }

        for arg in receiver.required_args() {
            if !self.providing_args.iter().any(|provided| provided == arg) {
                return Err(DispatchError::InvalidReceiver {
                    receiver: receiver.name().to_string(),
                    reason: format!("requires argument '{arg}' which the signal does not provide"),
                });
            }
        }

        Ok(())
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("providing_args", &self.providing_args)
            .field("receivers", &self.receiver_count())
            .finish()
    }
}

/// Connect one receiver to several signals at once.
///
/// Every signal validates the receiver before any connection is made, so a
/// rejection leaves all of them untouched.
pub fn connect_all<R: Receiver + 'static>(
    signals: &[&Signal],
    receiver: &Rc<R>,
    options: ConnectOptions,
) -> Result<(), DispatchError> {
    let receiver: Rc<dyn Receiver> = receiver.clone();
    for signal in signals {
        signal.validate(receiver.as_ref(), &options)?;
    }
    for signal in signals {
        signal.connect_dyn(&receiver, options.clone())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{receiver_fn, ReceiverResult};
    use serde_json::Value;
    use std::cell::Cell;

    /// Counts invocations into a cell that outlives the receiver itself.
    struct Probe {
        hits: Rc<Cell<usize>>,
        fail: bool,
    }

    impl Probe {
        fn new(fail: bool) -> (Rc<Self>, Rc<Cell<usize>>) {
            let hits = Rc::new(Cell::new(0));
            let probe = Rc::new(Self {
                hits: Rc::clone(&hits),
                fail,
            });
            (probe, hits)
        }
    }

    impl Receiver for Probe {
        fn receive(&self, _sender: Sender, _kwargs: &Kwargs) -> ReceiverResult {
            self.hits.set(self.hits.get() + 1);
            if self.fail {
                Err("invalid literal for int()".into())
            } else {
                Ok(Value::from(self.hits.get()))
            }
        }
    }

    #[test]
    fn send_on_unbound_signal_delivers_nothing() {
        let signal = Signal::new();
        assert_eq!(signal.state(), SignalState::Unbound);
        let dispatch = signal.send(Sender::NONE, &Kwargs::new()).unwrap();
        assert!(dispatch.is_empty());
    }

    #[test]
    fn send_robust_invokes_every_receiver() {
        let signal = Signal::new();
        let (r1, r1_hits) = Probe::new(false);
        let (r2, r2_hits) = Probe::new(true);
        signal.connect(&r1).unwrap();
        signal.connect(&r2).unwrap();

        let dispatch = signal.send_robust(Sender::NONE, &Kwargs::new());

        assert_eq!(r1_hits.get(), 1);
        assert_eq!(r2_hits.get(), 1);
        assert_eq!(dispatch.len(), 2);
        assert_eq!(dispatch.failure_count(), 1);
        assert_eq!(dispatch.values().count(), 1);
        let failed = dispatch.failures().next().unwrap();
        assert_eq!(
            Rc::as_ptr(failed.receiver()) as *const (),
            Rc::as_ptr(&r2) as *const ()
        );
    }

    #[test]
    fn send_stops_at_first_failure() {
        let signal = Signal::new();
        let (failing, failing_hits) = Probe::new(true);
        let (after, after_hits) = Probe::new(false);
        signal.connect(&failing).unwrap();
        signal.connect(&after).unwrap();

        let err = signal.send(Sender::NONE, &Kwargs::new()).unwrap_err();

        assert!(matches!(err, DispatchError::Propagated { ref receiver, .. } if receiver == "Probe"));
        assert_eq!(failing_hits.get(), 1);
        assert_eq!(after_hits.get(), 0);
    }

    #[test]
    fn panics_are_captured_by_send_robust() {
        let signal = Signal::new();
        let panicking = receiver_fn("explodes", "scripts", |_, _| -> ReceiverResult {
            panic!("bad script")
        });
        let (after, after_hits) = Probe::new(false);
        signal
            .connect_with(&panicking, ConnectOptions::new().strong())
            .unwrap();
        signal.connect(&after).unwrap();

        let dispatch = signal.send_robust(Sender::NONE, &Kwargs::new());

        assert_eq!(after_hits.get(), 1);
        let failure = dispatch.failures().next().unwrap().failure().unwrap();
        assert!(matches!(failure, ReceiverFailure::Panic(msg) if msg == "bad script"));
    }

    #[test]
    fn sender_filter_mismatch_skips_receiver() {
        let signal = Signal::new();
        let player_a = Sender::from_raw(1);
        let player_b = Sender::from_raw(2);
        let (r1, hits) = Probe::new(false);
        signal
            .connect_with(&r1, ConnectOptions::new().sender(player_a))
            .unwrap();

        signal.send(player_b, &Kwargs::new()).unwrap();
        assert_eq!(hits.get(), 0);
        assert!(!signal.has_listeners(player_b));

        signal.send(player_a, &Kwargs::new()).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn filter_on_sender_zero_ignores_other_senders() {
        let signal = Signal::new();
        let world = Sender::from_raw(0);
        let (r1, hits) = Probe::new(false);
        signal
            .connect_with(&r1, ConnectOptions::new().strong().sender(world))
            .unwrap();

        signal.send(Sender::from_raw(7), &Kwargs::new()).unwrap();
        signal.send(Sender::NONE, &Kwargs::new()).unwrap();
        assert_eq!(hits.get(), 0);

        signal.send(world, &Kwargs::new()).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn dropped_weak_receiver_is_skipped_silently() {
        let signal = Signal::new();
        let (r1, hits) = Probe::new(false);
        signal.connect(&r1).unwrap();
        assert_eq!(signal.state(), SignalState::Bound);

        drop(r1);

        let dispatch = signal.send(Sender::NONE, &Kwargs::new()).unwrap();
        assert!(dispatch.is_empty());
        assert_eq!(hits.get(), 0);
        assert_eq!(signal.state(), SignalState::Unbound);
    }

    #[test]
    fn strong_receiver_outlives_caller_handle() {
        let signal = Signal::new();
        let (r1, hits) = Probe::new(false);
        signal
            .connect_with(&r1, ConnectOptions::new().strong())
            .unwrap();
        drop(r1);

        signal.send(Sender::NONE, &Kwargs::new()).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn connecting_twice_delivers_once() {
        let signal = Signal::new();
        let (r1, hits) = Probe::new(false);
        signal.connect(&r1).unwrap();
        signal.connect(&r1).unwrap();

        signal.send(Sender::NONE, &Kwargs::new()).unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(signal.receiver_count(), 1);
    }

    #[test]
    fn disconnect_stops_delivery() {
        let signal = Signal::new();
        let (r1, hits) = Probe::new(false);
        signal.connect(&r1).unwrap();

        assert!(signal.disconnect(&r1, SenderFilter::Any));
        signal.send(Sender::NONE, &Kwargs::new()).unwrap();
        assert_eq!(hits.get(), 0);

        // Never connected, or already removed: nothing happens.
        assert!(!signal.disconnect(&r1, SenderFilter::Any));
    }

    #[test]
    fn dispatch_uid_replaces_object_identity() {
        let signal = Signal::new();
        let (first, first_hits) = Probe::new(false);
        let (second, second_hits) = Probe::new(false);
        let options = ConnectOptions::new().strong().dispatch_uid("gamerules.install");
        signal.connect_with(&first, options.clone()).unwrap();
        signal.connect_with(&second, options).unwrap();

        signal.send(Sender::NONE, &Kwargs::new()).unwrap();
        assert_eq!(first_hits.get(), 1);
        assert_eq!(second_hits.get(), 0);

        assert!(signal.disconnect_uid("gamerules.install", Sender::NONE));
        assert_eq!(signal.state(), SignalState::Unbound);
    }

    #[test]
    fn receiver_requiring_undeclared_argument_is_rejected() {
        let signal = Signal::with_args(["client"]);
        let needs_client = Rc::new(
            crate::FnReceiver::new("on_active", "scripts", |_, kwargs: &Kwargs| {
                Ok(kwargs.require("client")?.clone())
            })
            .requires(["client"]),
        );
        let needs_bla = Rc::new(
            crate::FnReceiver::new("on_postlevelinit", "scripts", |_, _| Ok(Value::Null))
                .requires(["bla"]),
        );

        assert!(signal.connect(&needs_client).is_ok());
        let err = signal.connect(&needs_bla).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidReceiver { ref receiver, .. } if receiver == "on_postlevelinit"));
    }

    #[test]
    fn empty_dispatch_uid_is_rejected() {
        let signal = Signal::new();
        let (r1, _) = Probe::new(false);
        let err = signal
            .connect_with(&r1, ConnectOptions::new().dispatch_uid("  "))
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidReceiver { .. }));
        assert_eq!(signal.receiver_count(), 0);
    }

    #[test]
    fn receiver_connected_during_delivery_waits_for_next_send() {
        let signal = Rc::new(Signal::new());
        let (late, late_hits) = Probe::new(false);

        let connector = {
            let signal = Rc::clone(&signal);
            let late = Rc::clone(&late);
            receiver_fn("connector", "scripts", move |_, _| {
                signal.connect_with(&late, ConnectOptions::new().strong())?;
                Ok(Value::Null)
            })
        };
        signal.connect(&connector).unwrap();

        signal.send(Sender::NONE, &Kwargs::new()).unwrap();
        assert_eq!(late_hits.get(), 0);

        signal.send(Sender::NONE, &Kwargs::new()).unwrap();
        assert_eq!(late_hits.get(), 1);
    }

    #[test]
    fn disconnect_during_delivery_skips_no_one() {
        let signal = Rc::new(Signal::new());
        let (first, first_hits) = Probe::new(false);
        let (third, third_hits) = Probe::new(false);

        let remover = {
            let signal = Rc::clone(&signal);
            let first = Rc::clone(&first);
            receiver_fn("remover", "scripts", move |_, _| {
                signal.disconnect(&first, SenderFilter::Any);
                Ok(Value::Null)
            })
        };
        signal.connect(&first).unwrap();
        signal.connect(&remover).unwrap();
        signal.connect(&third).unwrap();

        let dispatch = signal.send(Sender::NONE, &Kwargs::new()).unwrap();
        assert_eq!(dispatch.len(), 3);
        assert_eq!(first_hits.get(), 1);
        assert_eq!(third_hits.get(), 1);

        signal.send(Sender::NONE, &Kwargs::new()).unwrap();
        assert_eq!(first_hits.get(), 1);
        assert_eq!(third_hits.get(), 2);
    }

    #[test]
    fn receiver_disconnected_by_an_earlier_one_still_runs_once() {
        let signal = Rc::new(Signal::new());
        let (later, later_hits) = Probe::new(false);

        let remover = {
            let signal = Rc::clone(&signal);
            let later = Rc::clone(&later);
            receiver_fn("remover", "scripts", move |_, _| {
                signal.disconnect(&later, SenderFilter::Any);
                Ok(Value::Null)
            })
        };
        signal.connect(&remover).unwrap();
        signal.connect(&later).unwrap();

        let dispatch = signal.send(Sender::NONE, &Kwargs::new()).unwrap();
        assert_eq!(dispatch.len(), 2);
        assert_eq!(later_hits.get(), 1);

        signal.send(Sender::NONE, &Kwargs::new()).unwrap();
        assert_eq!(later_hits.get(), 1);
        assert_eq!(signal.receiver_count(), 1);
    }

    #[test]
    fn receiver_can_disconnect_itself() {
        let signal = Rc::new(Signal::new());
        let hits = Rc::new(Cell::new(0));
        let (after, after_hits) = Probe::new(false);

        let once = {
            let signal = Rc::clone(&signal);
            let hits = Rc::clone(&hits);
            receiver_fn("once", "scripts", move |_, _| {
                hits.set(hits.get() + 1);
                signal.disconnect_uid("once", SenderFilter::Any);
                Ok(Value::Null)
            })
        };
        signal
            .connect_with(&once, ConnectOptions::new().dispatch_uid("once"))
            .unwrap();
        signal.connect(&after).unwrap();

        let dispatch = signal.send(Sender::NONE, &Kwargs::new()).unwrap();
        assert_eq!(dispatch.len(), 2);
        signal.send(Sender::NONE, &Kwargs::new()).unwrap();

        assert_eq!(hits.get(), 1);
        assert_eq!(after_hits.get(), 2);
    }

    #[test]
    fn connect_all_is_all_or_nothing() {
        let init = Signal::new();
        let active = Signal::with_args(["client"]);
        let needs_client = Rc::new(
            crate::FnReceiver::new("needs_client", "scripts", |_, _| Ok(Value::Null))
                .requires(["client"]),
        );

        let err = connect_all(&[&active, &init], &needs_client, ConnectOptions::new());
        assert!(err.is_err());
        assert_eq!(active.receiver_count(), 0);

        let (probe, hits) = Probe::new(false);
        connect_all(&[&active, &init], &probe, ConnectOptions::new()).unwrap();
        active.send(Sender::NONE, &Kwargs::new()).unwrap();
        init.send(Sender::NONE, &Kwargs::new()).unwrap();
        assert_eq!(hits.get(), 2);
    }
}
