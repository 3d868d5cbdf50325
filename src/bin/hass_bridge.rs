//! Console front-end for the bridge
//!
//! Reads orchestrator replies (free text, optionally carrying a JSON action
//! plan) from stdin, one per line, executes them against the hub and prints
//! the text answer. Alerts triggered by state changes are printed as they
//! arrive.
//!
//! Usage: `hass-bridge [identity]` (identity defaults to `console`)

use anyhow::{Context, Result};
use hass_bridge::bin_common::{load_config_from_env, parse_args, ConfigType};
use homehub::{
    init_tracing_with_level, AlertNotifier, AllowList, AutomationClient, BridgeConfig, Dispatcher,
    HubCommands, ShutdownManager,
};
use hubsockets::EventFrame;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load config first (before logging is initialized)
    let config_path = load_config_from_env(ConfigType::Bridge);
    let config = if config_path.exists() {
        BridgeConfig::load(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?
    } else {
        BridgeConfig::from_env().context("no config file found, reading HA_URL/HA_TOKEN")?
    };

    init_tracing_with_level(&config.log_level);
    config.log();

    let identity = parse_args()
        .into_iter()
        .next()
        .unwrap_or_else(|| "console".to_string());

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    let connection = Arc::new(
        hubsockets::builder()
            .url(config.hub.url.as_str())
            .token(config.token.as_str())
            .reconnect_delay(config.reconnect_delay())
            .event_type(config.hub.event_type.as_str())
            .shutdown_flag(shutdown.flag())
            .build()
            .await?,
    );

    connection.subscribe(|frame: &EventFrame| {
        if let Ok(Some(change)) = frame.event.state_change() {
            let state = change.new_state.as_ref().map(|s| s.state.as_str());
            debug!(entity_id = %change.entity_id, ?state, "State changed");
        }
    });
    connection.subscribe(AlertNotifier::new(config.alerts.clone(), |message| {
        println!("[alert] {}", message);
    }));

    let dispatcher = Dispatcher::new(
        HubCommands::new(
            Arc::clone(&connection),
            AutomationClient::new(
                config.rest_base_url(),
                config.token.as_str(),
                config.automations.id_prefix.as_str(),
            ),
        ),
        AllowList::new(
            config.access.users.iter().cloned(),
            config.access.admins.iter().cloned(),
        ),
    );

    print_banner("hass-bridge", &identity);

    tokio::select! {
        _ = connection.wait_ready() => info!("Hub ready"),
        _ = shutdown.wait() => {}
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = shutdown.wait() => break,
        };

        let Some(line) = line else {
            info!("stdin closed");
            shutdown.trigger();
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = dispatcher.handle_reply(&identity, &line).await;
        println!("{}", reply);
    }

    drop(dispatcher);
    match Arc::try_unwrap(connection) {
        Ok(connection) => connection.shutdown().await?,
        Err(_) => warn!("Hub connection still shared at exit, dropping it"),
    }

    print_shutdown("hass-bridge");
    Ok(())
}

fn print_banner(name: &str, identity: &str) {
    info!("");
    info!("========================================");
    info!("Starting {}", name);
    info!("Acting as: {}", identity);
    info!("Press Ctrl+C to stop");
    info!("========================================");
    info!("");
}

fn print_shutdown(name: &str) {
    info!("");
    info!("========================================");
    info!("{} stopped gracefully", name);
    info!("========================================");
}
