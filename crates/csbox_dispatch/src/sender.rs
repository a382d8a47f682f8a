use std::fmt;

/// Identity of the object a signal is sent from.
///
/// The host hands out raw ids (entity indices, player slots, rule sets).
/// `Sender::NONE` is an event with no particular origin. It sits outside the
/// id space, so every raw id (entity index 0 included) is a real sender.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sender(Option<u64>);

impl Sender {
    pub const NONE: Sender = Sender(None);

    pub const fn from_raw(id: u64) -> Self {
        Self(Some(id))
    }

    /// The raw id, `None` for [`Sender::NONE`].
    #[inline]
    pub fn id(self) -> Option<u64> {
        self.0
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "#{id}"),
            None => write!(f, "None"),
        }
    }
}

/// Which senders a receiver listens to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum SenderFilter {
    /// Every send, whatever the sender.
    #[default]
    Any,
    /// Only sends coming from this sender.
    Only(Sender),
}

impl SenderFilter {
    #[inline]
    pub fn matches(self, sender: Sender) -> bool {
        match self {
            SenderFilter::Any => true,
            SenderFilter::Only(expected) => expected == sender,
        }
    }
}

/// `Sender::NONE` converts to `Any`, everything else filters on that sender.
impl From<Sender> for SenderFilter {
    fn from(sender: Sender) -> Self {
        if sender.is_none() {
            SenderFilter::Any
        } else {
            SenderFilter::Only(sender)
        }
    }
}
