//! csbox Game Signals
//!
//! The game-facing half of the scripting layer:
//! - [`GameSignals`]: level, client and game rules signals, routed per map
//! - [`Lifecycle`]: the host's entry points, firing those signals robustly
//! - [`Settings`]: JSON-backed runtime settings
//!
//! Entity classes are re-initialized for each map by connecting a
//! [`ClassInitReceiver`] to `pre_level_init`.

mod lifecycle;
mod settings;
mod signals;

pub use lifecycle::{ClassInitReceiver, EventReport, Lifecycle, LifecycleError};
pub use settings::{Settings, SettingsError, Side};
pub use signals::{GameSignals, RoutedSignal};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_matches_dispatch() {
        assert_eq!(VERSION, csbox_dispatch::VERSION);
    }
}
