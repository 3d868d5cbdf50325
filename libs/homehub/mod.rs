//! # homehub
//!
//! Everything a chat front-end needs on top of a hub connection: typed
//! commands, orchestrator action plans, state-change alerts, configuration,
//! logging and shutdown handling.

pub mod actions;
pub mod alerts;
pub mod config;
pub mod error;
pub mod facade;
pub mod logging;
pub mod shutdown;

pub use actions::{ActionPlan, AllowList, Dispatcher, PermissionCheck};
pub use alerts::{AlertNotifier, AlertRule};
pub use config::{BridgeConfig, ConfigError};
pub use error::{FacadeError, Result};
pub use facade::{
    AutomationClient, AutomationSummary, EntityTarget, HubCommands, SceneTarget,
    ScheduledAutomation, ServiceCall,
};
pub use logging::{init_tracing, init_tracing_with_level};
pub use shutdown::ShutdownManager;
