//! Config path resolution and argument helpers shared by the binaries

use std::path::PathBuf;

/// Which configuration file a binary reads
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Bridge configuration (config/bridge.yaml)
    Bridge,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Path used when no override is set
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Bridge => "config/bridge.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Variable that overrides the path
    pub fn env_var_name(&self) -> &str {
        "BRIDGE_CONFIG_PATH"
    }
}

/// Resolve the config path: `Custom` as given, otherwise the env override
/// or the default
///
/// # Examples
/// ```
/// use hass_bridge::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Bridge);
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    if let ConfigType::Custom(path) = &config_type {
        return PathBuf::from(path);
    }

    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Positional arguments without the program name
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_type_paths() {
        assert_eq!(ConfigType::Bridge.default_path(), "config/bridge.yaml");

        let custom = ConfigType::Custom("custom/path.yaml".to_string());
        assert_eq!(custom.default_path(), "custom/path.yaml");
    }

    #[test]
    fn test_config_type_env_vars() {
        assert_eq!(ConfigType::Bridge.env_var_name(), "BRIDGE_CONFIG_PATH");
    }
}
