//! csbox Runtime
//!
//! Boots the scripting layer and walks it through one simulated level:
//! game rules, level init, client activation and shutdown.

mod entities;
mod scripts;

use anyhow::{Context, Result};
use csbox_dispatch::ConnectOptions;
use csbox_game::{ClassInitReceiver, GameSignals, Lifecycle, Settings};
use std::path::PathBuf;

fn main() -> Result<()> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("csbox.json"));
    let settings = Settings::load(&path)?;

    tracing_subscriber::fmt()
        .with_max_level(settings.log_level()?)
        .init();

    tracing::info!("csbox v{}", csbox_game::VERSION);
    tracing::info!(side = ?settings.side, "initializing scripting layer");

    let handles = entities::register_examples(&mut csbox_entities::registry_mut())
        .context("failed to register example entities")?;
    tracing::info!(classes = handles.len(), "entity classes registered");

    let signals = GameSignals::new(settings.side);
    let class_init = ClassInitReceiver::global();
    signals.pre_level_init.global.connect_with(
        &class_init,
        ConnectOptions::new().strong().dispatch_uid("csbox.class_init"),
    )?;

    let console = scripts::ConsoleSpace::new();
    scripts::connect(&signals, &console, &settings.start_map)?;

    run_level(&signals, &settings)?;

    tracing::info!(player = ?console.player(), "runtime finished");
    Ok(())
}

fn run_level(signals: &GameSignals, settings: &Settings) -> Result<()> {
    let mut lifecycle = Lifecycle::new(signals);
    lifecycle.install_game_rules(settings.game_rules.as_deref());

    let report = lifecycle.level_init_pre_entity(&settings.start_map)?;
    if report.failures() > 0 {
        tracing::warn!(failures = report.failures(), "level init had failing receivers");
    }

    spawn_logical_entity()?;
    lifecycle.level_init_post_entity()?;

    if settings.side.is_server() {
        for client in 1..=settings.example_clients {
            lifecycle.client_active(client)?;
        }
    }

    lifecycle.level_shutdown_pre_entity()?;
    lifecycle.level_shutdown_post_entity()?;
    lifecycle.install_game_rules(None);
    Ok(())
}

/// Spawn a `my_logical_entity` from map keyvalues and tick it to its threshold.
fn spawn_logical_entity() -> Result<()> {
    let mut fields = csbox_entities::registry()
        .by_classname("my_logical_entity")
        .map(|class| class.create_fields())
        .context("my_logical_entity is not registered")?;

    for (key, value) in [("threshold", "3"), ("OnThreshold", "relay_end,Trigger,,0,1")] {
        fields
            .apply_keyvalue(key, value)
            .with_context(|| format!("bad keyvalue {key}"))?;
    }

    let data = entities::InputData::default();
    for tick in 1..=3 {
        for connection in entities::fire_input(&mut fields, "Tick", &data)? {
            tracing::info!(tick, output = %connection, "OnThreshold fired");
        }
    }
    Ok(())
}
