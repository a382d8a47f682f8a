//! Well-known game signals
//!
//! Created once when the scripting layer boots, before the host can fire any
//! of them, and passed by reference to producers and consumers.

use crate::settings::Side;
use csbox_dispatch::{KeyedSignals, Signal};
use std::rc::Rc;

/// A signal that is also routed per map name.
///
/// Scripts connect to `global` for every map, or to `for_map(name)` to
/// hear about a single map only.
#[derive(Debug)]
pub struct RoutedSignal {
    pub global: Signal,
    pub by_map: KeyedSignals,
}

impl RoutedSignal {
    pub fn with_args(args: &[&str]) -> Self {
        Self {
            global: Signal::with_args(args.iter().copied()),
            by_map: KeyedSignals::with_args(args.iter().copied()),
        }
    }

    pub fn for_map(&self, map: &str) -> Rc<Signal> {
        self.by_map.get_or_create(map)
    }
}

/// The lifecycle signals the host fires into the scripting layer.
#[derive(Debug)]
pub struct GameSignals {
    side: Side,
    /// Level init, before entities are spawned.
    pub pre_level_init: RoutedSignal,
    /// Level init, after entities are spawned.
    pub post_level_init: RoutedSignal,
    /// Level shutdown, before entities are removed.
    pub pre_level_shutdown: RoutedSignal,
    /// Level shutdown, after entities are removed.
    pub post_level_shutdown: RoutedSignal,
    client_active: Option<RoutedSignal>,
    pub pre_init_gamerules: Signal,
    pub post_init_gamerules: Signal,
}

impl GameSignals {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            pre_level_init: RoutedSignal::with_args(&["map"]),
            post_level_init: RoutedSignal::with_args(&["map"]),
            pre_level_shutdown: RoutedSignal::with_args(&["map"]),
            post_level_shutdown: RoutedSignal::with_args(&["map"]),
            client_active: side
                .is_server()
                .then(|| RoutedSignal::with_args(&["client", "map"])),
            pre_init_gamerules: Signal::with_args(["gamerules"]),
            post_init_gamerules: Signal::with_args(["gamerules"]),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Sent when a client becomes active. Server side only.
    pub fn client_active(&self) -> Option<&RoutedSignal> {
        self.client_active.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_active_only_exists_on_the_server() {
        assert!(GameSignals::new(Side::Server).client_active().is_some());
        assert!(GameSignals::new(Side::Client).client_active().is_none());
    }

    #[test]
    fn routed_signals_share_declared_args() {
        let signals = GameSignals::new(Side::Server);
        let active = signals.client_active().unwrap();
        assert_eq!(active.global.providing_args(), &["client", "map"]);
        assert_eq!(active.for_map("dm_lockdown").providing_args(), &["client", "map"]);
        assert!(Rc::ptr_eq(
            &signals.pre_level_init.for_map("dm_lockdown"),
            &signals.pre_level_init.for_map("dm_lockdown")
        ));
    }
}
