use crate::{Receiver, Sender, SenderFilter};
use std::rc::{Rc, Weak};

/// How a signal holds on to a receiver.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Ownership {
    /// The subscription keeps the receiver alive.
    Strong,
    /// The subscription lapses once every other `Rc` to the receiver is gone.
    #[default]
    Weak,
}

/// Identity a subscription is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReceiverKey {
    /// Explicit dispatch uid chosen by the caller.
    Uid(String),
    /// Address of the receiver allocation.
    Object(usize),
}

impl ReceiverKey {
    pub(crate) fn of(receiver: &Rc<dyn Receiver>) -> Self {
        ReceiverKey::Object(Rc::as_ptr(receiver) as *const () as usize)
    }
}

enum Handle {
    Strong(Rc<dyn Receiver>),
    Weak(Weak<dyn Receiver>),
}

impl Handle {
    fn upgrade(&self) -> Option<Rc<dyn Receiver>> {
        match self {
            Handle::Strong(receiver) => Some(Rc::clone(receiver)),
            Handle::Weak(receiver) => receiver.upgrade(),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            Handle::Strong(_) => true,
            Handle::Weak(receiver) => receiver.strong_count() > 0,
        }
    }
}

struct Entry {
    key: ReceiverKey,
    filter: SenderFilter,
    handle: Handle,
}

/// Subscriptions of one signal, in registration order.
///
/// Dead weak entries are only discovered lazily: whenever the registry is
/// walked for a send, a connect or a disconnect.
pub(crate) struct ReceiverRegistry {
    entries: Vec<Entry>,
}

impl ReceiverRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Returns `false` when the (key, filter) pair is already registered.
    pub fn insert(
        &mut self,
        key: ReceiverKey,
        filter: SenderFilter,
        receiver: &Rc<dyn Receiver>,
        ownership: Ownership,
    ) -> bool {
        // An address freed by a reclaimed receiver may be reused by the new one.
        self.prune();

        if self
            .entries
            .iter()
            .any(|entry| entry.key == key && entry.filter == filter)
        {
            return false;
        }

        let handle = match ownership {
            Ownership::Strong => Handle::Strong(Rc::clone(receiver)),
            Ownership::Weak => Handle::Weak(Rc::downgrade(receiver)),
        };
        self.entries.push(Entry {
            key,
            filter,
            handle,
        });
        true
    }

    pub fn remove(&mut self, key: &ReceiverKey, filter: SenderFilter) -> bool {
        self.prune();
        let before = self.entries.len();
        self.entries
            .retain(|entry| !(entry.key == *key && entry.filter == filter));
        self.entries.len() != before
    }

    /// Upgrade every live receiver matching `sender`, pruning dead ones on the way.
    pub fn live_matching(&mut self, sender: Sender) -> Vec<Rc<dyn Receiver>> {
        let mut live = Vec::with_capacity(self.entries.len());
        self.entries.retain(|entry| match entry.handle.upgrade() {
            Some(receiver) => {
                if entry.filter.matches(sender) {
                    live.push(receiver);
                }
                true
            }
            None => false,
        });
        live
    }

    pub fn has_match(&self, sender: Sender) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.filter.matches(sender) && entry.handle.is_alive())
    }

    pub fn live_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.handle.is_alive())
            .count()
    }

    /// Drop entries whose weakly-held receiver has been reclaimed.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.handle.is_alive());
        before - self.entries.len()
    }
}
