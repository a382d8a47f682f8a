use crate::{Kwargs, Sender};
use serde_json::Value;
use std::any::type_name;
use std::rc::Rc;

/// Error type receivers may fail with. Anything implementing `Error` converts via `?`.
pub type ReceiverError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type ReceiverResult = Result<Value, ReceiverError>;

/// Something that can be subscribed to a [`Signal`](crate::Signal).
///
/// `name` and `module` identify the receiver in failure reports. The defaults
/// are derived from the implementing type's path.
pub trait Receiver {
    fn receive(&self, sender: Sender, kwargs: &Kwargs) -> ReceiverResult;

    fn name(&self) -> &str {
        split_type_name(type_name::<Self>()).1
    }

    fn module(&self) -> &str {
        split_type_name(type_name::<Self>()).0
    }

    /// Keyword arguments this receiver cannot run without. Checked against the
    /// signal's declared arguments on connect.
    fn required_args(&self) -> &[&str] {
        &[]
    }
}

/// Closure-backed receiver with an explicit name and owning module.
pub struct FnReceiver<F> {
    name: String,
    module: String,
    required: Vec<&'static str>,
    func: F,
}

impl<F> FnReceiver<F>
where
    F: Fn(Sender, &Kwargs) -> ReceiverResult,
{
    pub fn new(name: impl Into<String>, module: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            required: Vec::new(),
            func,
        }
    }

    /// Declare keyword arguments the closure reads unconditionally.
    pub fn requires<I>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        self.required.extend(args);
        self
    }
}

impl<F> Receiver for FnReceiver<F>
where
    F: Fn(Sender, &Kwargs) -> ReceiverResult,
{
    fn receive(&self, sender: Sender, kwargs: &Kwargs) -> ReceiverResult {
        (self.func)(sender, kwargs)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn module(&self) -> &str {
        &self.module
    }

    fn required_args(&self) -> &[&str] {
        &self.required
    }
}

/// Wrap a closure in an `Rc` ready to be connected.
pub fn receiver_fn<F>(name: impl Into<String>, module: impl Into<String>, func: F) -> Rc<FnReceiver<F>>
where
    F: Fn(Sender, &Kwargs) -> ReceiverResult,
{
    Rc::new(FnReceiver::new(name, module, func))
}

/// Build an [`FnReceiver`] owned by the calling module.
///
/// # Example
/// ```ignore
/// let on_init = receiver!("on_prelevelinit", |_sender, _kwargs| Ok(Value::Null));
/// signals.pre_level_init.connect_with(&on_init, ConnectOptions::new().strong())?;
/// ```
#[macro_export]
macro_rules! receiver {
    ($name:expr, $func:expr $(,)?) => {
        $crate::receiver_fn($name, module_path!(), $func)
    };
}

/// Split `a::b::Type<Generic>` into (`a::b`, `Type`).
fn split_type_name(full: &'static str) -> (&'static str, &'static str) {
    let base = full.split('<').next().unwrap_or(full);
    match base.rsplit_once("::") {
        Some((module, name)) => (module, name),
        None => ("", base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LevelScript;

    impl Receiver for LevelScript {
        fn receive(&self, _sender: Sender, _kwargs: &Kwargs) -> ReceiverResult {
            Ok(Value::Null)
        }
    }

    #[test]
    fn default_identity_comes_from_the_type_path() {
        let script = LevelScript;
        assert_eq!(script.name(), "LevelScript");
        assert_eq!(script.module(), "csbox_dispatch::receiver::tests");
    }

    #[test]
    fn split_ignores_generic_arguments() {
        assert_eq!(
            split_type_name("a::b::Holder<c::d::Inner>"),
            ("a::b", "Holder")
        );
        assert_eq!(split_type_name("bare"), ("", "bare"));
    }

    #[test]
    fn fn_receiver_reports_given_identity() {
        let on_active = receiver!("on_clientactive", |_, kwargs: &Kwargs| {
            Ok(kwargs.require("client")?.clone())
        });
        assert_eq!(on_active.name(), "on_clientactive");
        assert_eq!(on_active.module(), module_path!());

        let kwargs = Kwargs::new().with("client", 2);
        assert_eq!(on_active.receive(Sender::NONE, &kwargs).unwrap(), Value::from(2));
        assert!(on_active.receive(Sender::NONE, &Kwargs::new()).is_err());
    }

    #[test]
    fn requires_records_arguments() {
        let receiver = FnReceiver::new("needs_client", "scripts", |_, _| Ok(Value::Null))
            .requires(["client"]);
        assert_eq!(receiver.required_args(), &["client"]);
    }
}
