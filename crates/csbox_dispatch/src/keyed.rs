use crate::Signal;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Signals partitioned by an arbitrary string key, created on first access.
///
/// Typically keyed by map name so a script can listen to a single map's
/// level events.
pub struct KeyedSignals {
    providing_args: Vec<String>,
    signals: RefCell<HashMap<String, Rc<Signal>>>,
}

impl KeyedSignals {
    pub fn new() -> Self {
        Self::with_args(std::iter::empty::<String>())
    }

    /// Every signal created by this table declares `args`.
    pub fn with_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            providing_args: args.into_iter().map(Into::into).collect(),
            signals: RefCell::new(HashMap::new()),
        }
    }

    /// The signal for `key`; the same instance for the life of the table.
    pub fn get_or_create(&self, key: &str) -> Rc<Signal> {
        let mut signals = self.signals.borrow_mut();
        if let Some(signal) = signals.get(key) {
            return Rc::clone(signal);
        }

        let signal = Rc::new(Signal::with_args(self.providing_args.iter().cloned()));
        signals.insert(key.to_string(), Rc::clone(&signal));
        tracing::trace!(key, "keyed signal created");
        signal
    }

    /// Look up without creating.
    pub fn get(&self, key: &str) -> Option<Rc<Signal>> {
        self.signals.borrow().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.signals.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.borrow().is_empty()
    }

    /// Keys created so far, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.signals.borrow().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }
}

impl Default for KeyedSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyedSignals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedSignals")
            .field("providing_args", &self.providing_args)
            .field("keys", &self.keys())
            .finish()
    }
}
