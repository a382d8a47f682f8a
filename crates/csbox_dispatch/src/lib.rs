//! csbox Signal Dispatch
//!
//! Multi-consumer / multi-producer event dispatch for the scripting layer:
//! - [`Signal`]: named channel with connect / disconnect / send / send_robust
//! - Receiver registry with strong or weak ownership and sender filters
//! - [`KeyedSignals`]: per-key channels (one per map name) created on demand
//! - [`fire_robust`]: failure-isolating delivery that logs instead of raising
//!
//! Delivery is synchronous and single-threaded: everything here is `Rc`-based
//! and runs on the host's simulation thread.
//!
//! # Usage
//!
//! ```ignore
//! use csbox_dispatch::{fire_robust, receiver, ConnectOptions, Kwargs, Signal};
//!
//! let level_init = Signal::new();
//! let on_init = receiver!("on_prelevelinit", |_sender, _kwargs| Ok(Value::Null));
//! level_init.connect_with(&on_init, ConnectOptions::new().strong())?;
//! fire_robust(&level_init, &Kwargs::new());
//! ```

mod error;
mod keyed;
mod kwargs;
mod receiver;
mod registry;
mod response;
mod robust;
mod sender;
mod signal;

pub use error::DispatchError;
pub use keyed::KeyedSignals;
pub use kwargs::{Kwargs, MissingArgument};
pub use receiver::{receiver_fn, FnReceiver, Receiver, ReceiverError, ReceiverResult};
pub use registry::{Ownership, ReceiverKey};
pub use response::{Dispatch, ReceiverFailure, Response};
pub use robust::{check_responses, fire_robust, fire_robust_from, FailureReporter, TracingReporter};
pub use sender::{Sender, SenderFilter};
pub use signal::{connect_all, ConnectOptions, Signal, SignalState};

pub use serde_json::Value;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
