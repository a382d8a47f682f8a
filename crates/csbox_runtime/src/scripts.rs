//! Script-side receivers wired up at boot

use csbox_dispatch::{
    connect_all, receiver, ConnectOptions, DispatchError, Kwargs, Receiver, ReceiverResult,
    Sender, Value,
};
use csbox_game::GameSignals;
use std::cell::RefCell;
use std::rc::Rc;

/// State for the interactive console, kept current by game signals.
///
/// On the server it hears `client_active` and keeps the client in slot 1. On
/// the client it hears `post_level_init` and takes the local player.
#[derive(Debug)]
pub struct ConsoleSpace {
    local_player: Value,
    player: RefCell<Option<Value>>,
}

impl ConsoleSpace {
    /// The local player is the client in slot 1.
    pub fn new() -> Rc<Self> {
        Self::with_local_player(1)
    }

    pub fn with_local_player(local_player: impl Into<Value>) -> Rc<Self> {
        Rc::new(Self {
            local_player: local_player.into(),
            player: RefCell::new(None),
        })
    }

    pub fn player(&self) -> Option<Value> {
        self.player.borrow().clone()
    }

    fn set_player(&self, player: &Value) {
        tracing::debug!(%player, "console player set");
        *self.player.borrow_mut() = Some(player.clone());
    }
}

impl Receiver for ConsoleSpace {
    fn receive(&self, _sender: Sender, kwargs: &Kwargs) -> ReceiverResult {
        match kwargs.get("client") {
            Some(client) if client.as_u64() == Some(1) => self.set_player(client),
            Some(_) => {}
            None => self.set_player(&self.local_player),
        }
        Ok(Value::Null)
    }
}

/// Connect the logging receivers and `console`.
///
/// `console` is held weakly; it stops hearing events once the caller drops it.
pub fn connect(
    signals: &GameSignals,
    console: &Rc<ConsoleSpace>,
    start_map: &str,
) -> Result<(), DispatchError> {
    let on_pre_init = receiver!("on_prelevelinit", |_, kwargs| {
        tracing::info!(map = ?kwargs.get("map"), "pre level init callback");
        Ok(Value::Null)
    });
    signals.pre_level_init.global.connect_with(
        &on_pre_init,
        ConnectOptions::new().strong().dispatch_uid("scripts.on_prelevelinit"),
    )?;

    let on_start_map = receiver!("on_prelevelinit_start_map", |_, kwargs| {
        tracing::info!(map = ?kwargs.get("map"), "pre level init callback for the start map");
        Ok(Value::Null)
    });
    signals
        .pre_level_init
        .for_map(start_map)
        .connect_with(&on_start_map, ConnectOptions::new().strong())?;

    let on_post_init = receiver!("on_postlevelinit", |_, _| {
        tracing::info!("post level init callback");
        Ok(Value::Null)
    });
    signals
        .post_level_init
        .global
        .connect_with(&on_post_init, ConnectOptions::new().strong())?;

    let on_shutdown = receiver!("on_levelshutdown", |_, kwargs| {
        tracing::info!(map = ?kwargs.get("map"), "level shutdown callback");
        Ok(Value::Null)
    });
    connect_all(
        &[
            &signals.pre_level_shutdown.global,
            &signals.post_level_shutdown.global,
        ],
        &on_shutdown,
        ConnectOptions::new().strong(),
    )?;

    let on_gamerules = receiver!("on_postinitgamerules", |_, kwargs| {
        tracing::info!(gamerules = ?kwargs.get("gamerules"), "game rules changed");
        Ok(Value::Null)
    });
    signals
        .post_init_gamerules
        .connect_with(&on_gamerules, ConnectOptions::new().strong())?;

    match signals.client_active() {
        Some(client_active) => client_active.global.connect(console)?,
        None => signals.post_level_init.global.connect(console)?,
    }
    Ok(())
}
