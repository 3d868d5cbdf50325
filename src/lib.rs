//! hass-bridge - chat front-ends to a home-automation hub
//!
//! ## Architecture
//!
//! - **hubsockets**: the hub connection client (re-exported from workspace)
//! - **homehub**: commands, action plans, alerts, config (re-exported from workspace)
//! - **bin_common**: Common utilities for binary executables
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use hass_bridge::bin_common::{load_config_from_env, ConfigType};
//! use hass_bridge::homehub::BridgeConfig;
//! ```

// Re-export workspace libraries for convenience
pub use homehub;
pub use hubsockets;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;

    pub use cli::{load_config_from_env, parse_args, ConfigType};
}
