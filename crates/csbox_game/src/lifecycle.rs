//! Host lifecycle notifications
//!
//! The host calls into [`Lifecycle`] at fixed points of a level's life. Each
//! call fires the matching game signal robustly, globally first and then on
//! the channel of the active map, so a misbehaving script can never take the
//! host down with it.

use crate::signals::{GameSignals, RoutedSignal};
use csbox_dispatch::{
    fire_robust_from, Dispatch, FailureReporter, Kwargs, Receiver, ReceiverResult, Response,
    Sender, Signal, TracingReporter, Value,
};
use csbox_entities::EntityClassRegistry;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("no level is active")]
    NoActiveLevel,

    #[error("level '{0}' is already active")]
    LevelAlreadyActive(String),

    #[error("client_active is only sent on the server")]
    ServerOnly,
}

/// Every dispatch made for one lifecycle event.
#[derive(Debug, Default)]
pub struct EventReport {
    dispatches: Vec<Dispatch>,
}

impl EventReport {
    /// Number of receivers reached, failed ones included.
    pub fn delivered(&self) -> usize {
        self.dispatches.iter().map(Dispatch::len).sum()
    }

    pub fn failures(&self) -> usize {
        self.dispatches.iter().map(Dispatch::failure_count).sum()
    }

    pub fn dispatches(&self) -> &[Dispatch] {
        &self.dispatches
    }

    pub fn iter(&self) -> impl Iterator<Item = &Response> {
        self.dispatches.iter().flat_map(Dispatch::iter)
    }

    fn push(&mut self, dispatch: Dispatch) {
        self.dispatches.push(dispatch);
    }
}

/// Tracks the active level and installed game rules, firing the game
/// signals as they change.
pub struct Lifecycle<'a> {
    signals: &'a GameSignals,
    reporter: &'a dyn FailureReporter,
    current_map: Option<String>,
    game_rules: Option<String>,
}

impl<'a> Lifecycle<'a> {
    /// Failures are logged as warnings.
    pub fn new(signals: &'a GameSignals) -> Self {
        Self::with_reporter(signals, &TracingReporter)
    }

    pub fn with_reporter(signals: &'a GameSignals, reporter: &'a dyn FailureReporter) -> Self {
        Self {
            signals,
            reporter,
            current_map: None,
            game_rules: None,
        }
    }

    pub fn current_map(&self) -> Option<&str> {
        self.current_map.as_deref()
    }

    pub fn game_rules(&self) -> Option<&str> {
        self.game_rules.as_deref()
    }

    /// Level init, before entities are spawned.
    pub fn level_init_pre_entity(&mut self, map: &str) -> Result<EventReport, LifecycleError> {
        if let Some(active) = &self.current_map {
            return Err(LifecycleError::LevelAlreadyActive(active.clone()));
        }

        tracing::info!(map, "level init");
        self.current_map = Some(map.to_string());
        Ok(self.fire_routed(&self.signals.pre_level_init, map, Kwargs::new()))
    }

    /// Level init, after entities are spawned.
    pub fn level_init_post_entity(&mut self) -> Result<EventReport, LifecycleError> {
        let map = self.active_map()?;
        Ok(self.fire_routed(&self.signals.post_level_init, &map, Kwargs::new()))
    }

    /// Level shutdown, before entities are removed.
    pub fn level_shutdown_pre_entity(&mut self) -> Result<EventReport, LifecycleError> {
        let map = self.active_map()?;
        tracing::info!(map = %map, "level shutdown");
        Ok(self.fire_routed(&self.signals.pre_level_shutdown, &map, Kwargs::new()))
    }

    /// Level shutdown, after entities are removed. Clears the active level.
    pub fn level_shutdown_post_entity(&mut self) -> Result<EventReport, LifecycleError> {
        let map = self.active_map()?;
        let report = self.fire_routed(&self.signals.post_level_shutdown, &map, Kwargs::new());
        self.current_map = None;
        Ok(report)
    }

    /// A client finished connecting and is now active in the level.
    pub fn client_active(&mut self, client: impl Into<Value>) -> Result<EventReport, LifecycleError> {
        let signal = self.signals.client_active().ok_or(LifecycleError::ServerOnly)?;
        let map = self.active_map()?;
        let client = client.into();
        tracing::debug!(map = %map, client = %client, "client active");
        Ok(self.fire_routed(signal, &map, Kwargs::new().with("client", client)))
    }

    /// Swap the installed game rules, `None` clearing them. Listeners hear the
    /// old rules before the swap and the new ones after.
    pub fn install_game_rules(&mut self, name: Option<&str>) -> EventReport {
        let mut report = EventReport::default();
        report.push(self.fire(&self.signals.pre_init_gamerules, gamerules_kwargs(self.game_rules())));

        self.game_rules = name.map(str::to_string);
        tracing::info!(gamerules = ?self.game_rules, "game rules installed");

        report.push(self.fire(&self.signals.post_init_gamerules, gamerules_kwargs(self.game_rules())));
        report
    }

    fn active_map(&self) -> Result<String, LifecycleError> {
        self.current_map.clone().ok_or(LifecycleError::NoActiveLevel)
    }

    fn fire_routed(&self, routed: &RoutedSignal, map: &str, kwargs: Kwargs) -> EventReport {
        let kwargs = kwargs.with("map", map);
        let mut report = EventReport::default();
        report.push(self.fire(&routed.global, kwargs.clone()));
        if let Some(per_map) = routed.by_map.get(map) {
            report.push(self.fire(&per_map, kwargs));
        }
        report
    }

    fn fire(&self, signal: &Signal, kwargs: Kwargs) -> Dispatch {
        fire_robust_from(signal, Sender::NONE, &kwargs, self.reporter)
    }
}

fn gamerules_kwargs(name: Option<&str>) -> Kwargs {
    Kwargs::new().with("gamerules", name.map_or(Value::Null, Value::from))
}

enum ClassSource {
    Global,
    Local(Rc<RefCell<EntityClassRegistry>>),
}

/// Re-initializes registered entity classes for the map being loaded.
///
/// Connect it to the global `pre_level_init` signal.
pub struct ClassInitReceiver {
    source: ClassSource,
}

impl ClassInitReceiver {
    /// Initializes classes in the process-wide registry.
    pub fn global() -> Rc<Self> {
        Rc::new(Self {
            source: ClassSource::Global,
        })
    }

    pub fn local(registry: Rc<RefCell<EntityClassRegistry>>) -> Rc<Self> {
        Rc::new(Self {
            source: ClassSource::Local(registry),
        })
    }
}

impl Receiver for ClassInitReceiver {
    fn receive(&self, _sender: Sender, kwargs: &Kwargs) -> ReceiverResult {
        let map = kwargs
            .require("map")?
            .as_str()
            .ok_or("map must be a string")?;

        let count = match &self.source {
            ClassSource::Global => csbox_entities::registry_mut().init_classes(map),
            ClassSource::Local(registry) => registry.borrow_mut().init_classes(map),
        };
        Ok(Value::from(count))
    }

    fn required_args(&self) -> &[&str] {
        &["map"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Side;
    use csbox_dispatch::{receiver_fn, ConnectOptions, FnReceiver};
    use csbox_entities::{EntityClass, EntityClassDescriptor, NativeClass};

    #[derive(Default)]
    struct Recorder {
        lines: RefCell<Vec<String>>,
    }

    impl FailureReporter for Recorder {
        fn report(&self, line: &str) {
            self.lines.borrow_mut().push(line.to_string());
        }
    }

    fn log_receiver(name: &str, log: &Rc<RefCell<Vec<String>>>) -> Rc<impl Receiver> {
        let log = Rc::clone(log);
        let tag = name.to_string();
        receiver_fn(name, "tests", move |_, kwargs: &Kwargs| {
            let map = kwargs.get("map").and_then(Value::as_str).unwrap_or("-");
            log.borrow_mut().push(format!("{tag}:{map}"));
            Ok(Value::Null)
        })
    }

    #[test]
    fn level_events_fire_global_then_per_map() {
        let signals = GameSignals::new(Side::Server);
        let log = Rc::new(RefCell::new(Vec::new()));

        let global = log_receiver("global", &log);
        let lockdown = log_receiver("lockdown", &log);
        let overwatch = log_receiver("overwatch", &log);
        signals.pre_level_init.global.connect(&global).unwrap();
        signals.pre_level_init.for_map("dm_lockdown").connect(&lockdown).unwrap();
        signals.pre_level_init.for_map("dm_overwatch").connect(&overwatch).unwrap();

        let mut lifecycle = Lifecycle::new(&signals);
        let report = lifecycle.level_init_pre_entity("dm_lockdown").unwrap();

        assert_eq!(report.delivered(), 2);
        assert_eq!(report.dispatches().len(), 2);
        assert_eq!(*log.borrow(), vec!["global:dm_lockdown", "lockdown:dm_lockdown"]);
        assert_eq!(lifecycle.current_map(), Some("dm_lockdown"));
    }

    #[test]
    fn unsubscribed_map_gets_no_channel() {
        let signals = GameSignals::new(Side::Server);
        let mut lifecycle = Lifecycle::new(&signals);

        let report = lifecycle.level_init_pre_entity("dm_lockdown").unwrap();
        assert_eq!(report.delivered(), 0);
        assert!(signals.pre_level_init.by_map.is_empty());
    }

    #[test]
    fn full_level_cycle() {
        let signals = GameSignals::new(Side::Server);
        let mut lifecycle = Lifecycle::new(&signals);

        assert_eq!(lifecycle.level_init_post_entity().unwrap_err(), LifecycleError::NoActiveLevel);

        lifecycle.level_init_pre_entity("dm_lockdown").unwrap();
        assert_eq!(
            lifecycle.level_init_pre_entity("dm_overwatch").unwrap_err(),
            LifecycleError::LevelAlreadyActive("dm_lockdown".to_string())
        );

        lifecycle.level_init_post_entity().unwrap();
        lifecycle.level_shutdown_pre_entity().unwrap();
        assert_eq!(lifecycle.current_map(), Some("dm_lockdown"));
        lifecycle.level_shutdown_post_entity().unwrap();
        assert_eq!(lifecycle.current_map(), None);

        lifecycle.level_init_pre_entity("dm_overwatch").unwrap();
        assert_eq!(lifecycle.current_map(), Some("dm_overwatch"));
    }

    #[test]
    fn failing_receiver_is_reported_and_isolated() {
        let signals = GameSignals::new(Side::Server);
        let recorder = Recorder::default();
        let log = Rc::new(RefCell::new(Vec::new()));

        let broken = receiver_fn("broken", "tests", |_, _| Err("boom".into()));
        let after = log_receiver("after", &log);
        signals.post_level_init.global.connect(&broken).unwrap();
        signals.post_level_init.global.connect(&after).unwrap();

        let mut lifecycle = Lifecycle::with_reporter(&signals, &recorder);
        lifecycle.level_init_pre_entity("dm_lockdown").unwrap();
        let report = lifecycle.level_init_post_entity().unwrap();

        assert_eq!(report.failures(), 1);
        assert_eq!(*log.borrow(), vec!["after:dm_lockdown"]);
        assert_eq!(
            *recorder.lines.borrow(),
            vec!["Error in receiver broken (module: tests): boom"]
        );
    }

    #[test]
    fn client_active_carries_client_and_map() {
        let signals = GameSignals::new(Side::Server);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let on_active = {
            let seen = Rc::clone(&seen);
            Rc::new(
                FnReceiver::new("on_active", "tests", move |_, kwargs: &Kwargs| {
                    seen.borrow_mut()
                        .push((kwargs.require("client")?.clone(), kwargs.require("map")?.clone()));
                    Ok(Value::Null)
                })
                .requires(["client", "map"]),
            )
        };
        signals
            .client_active()
            .unwrap()
            .for_map("dm_lockdown")
            .connect(&on_active)
            .unwrap();

        let mut lifecycle = Lifecycle::new(&signals);
        assert_eq!(lifecycle.client_active(1).unwrap_err(), LifecycleError::NoActiveLevel);

        lifecycle.level_init_pre_entity("dm_lockdown").unwrap();
        let report = lifecycle.client_active(1).unwrap();
        assert_eq!(report.delivered(), 1);
        assert_eq!(*seen.borrow(), vec![(Value::from(1), Value::from("dm_lockdown"))]);
    }

    #[test]
    fn client_active_is_server_only() {
        let signals = GameSignals::new(Side::Client);
        let mut lifecycle = Lifecycle::new(&signals);
        lifecycle.level_init_pre_entity("dm_lockdown").unwrap();
        assert_eq!(lifecycle.client_active(1).unwrap_err(), LifecycleError::ServerOnly);
    }

    #[test]
    fn game_rules_swap_between_pre_and_post() {
        let signals = GameSignals::new(Side::Server);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let listener = |tag: &'static str| {
            let seen = Rc::clone(&seen);
            receiver_fn(tag, "tests", move |_, kwargs: &Kwargs| {
                seen.borrow_mut().push((tag, kwargs.require("gamerules")?.clone()));
                Ok(Value::Null)
            })
        };
        let pre = listener("pre");
        let post = listener("post");
        signals.pre_init_gamerules.connect(&pre).unwrap();
        signals.post_init_gamerules.connect(&post).unwrap();

        let mut lifecycle = Lifecycle::new(&signals);
        lifecycle.install_game_rules(Some("CustomGameRules"));
        assert_eq!(lifecycle.game_rules(), Some("CustomGameRules"));
        lifecycle.install_game_rules(None);
        assert_eq!(lifecycle.game_rules(), None);

        assert_eq!(
            *seen.borrow(),
            vec![
                ("pre", Value::Null),
                ("post", Value::from("CustomGameRules")),
                ("pre", Value::from("CustomGameRules")),
                ("post", Value::Null),
            ]
        );
    }

    struct EntExample;

    impl EntityClass for EntExample {
        fn describe() -> EntityClassDescriptor {
            EntityClassDescriptor::new("ent_example", NativeClass::BaseEntity)
        }
    }

    #[test]
    fn class_init_receiver_initializes_for_the_map() {
        let registry = Rc::new(RefCell::new(EntityClassRegistry::new()));
        registry.borrow_mut().register::<EntExample>().unwrap();

        let signals = GameSignals::new(Side::Server);
        let class_init = ClassInitReceiver::local(Rc::clone(&registry));
        signals
            .pre_level_init
            .global
            .connect_with(&class_init, ConnectOptions::new().dispatch_uid("class_init"))
            .unwrap();

        let mut lifecycle = Lifecycle::new(&signals);
        let report = lifecycle.level_init_pre_entity("dm_lockdown").unwrap();
        assert_eq!(report.iter().next().and_then(Response::value), Some(&Value::from(1)));

        let registry = registry.borrow();
        let class = registry.by_classname("ent_example").unwrap();
        assert_eq!(class.initialized_for(), Some("dm_lockdown"));
        assert_eq!(class.init_count(), 1);
    }

    #[test]
    fn class_init_receiver_rejects_signals_without_map() {
        let class_init = ClassInitReceiver::global();
        let signals = GameSignals::new(Side::Server);
        assert!(signals.pre_init_gamerules.connect(&class_init).is_err());
    }
}
