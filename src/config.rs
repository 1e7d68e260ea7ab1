use std::{collections::HashMap, time::Duration};

use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub device: DeviceConfig,
    pub test: TestConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Bluetooth address of a known device. Unset means discovery by
    /// advertised name.
    pub address: Option<String>,
    pub scan_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestConfig {
    pub timeout_secs: u64,
    /// BAC percent the `check` command gates on when no threshold is given
    /// on the command line.
    pub threshold: f64,
}

impl DeviceConfig {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }
}

impl TestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ConfigLib::builder()
            .set_default("device.scan_timeout_secs", 10)?
            .set_default("test.timeout_secs", 60)?
            .set_default("test.threshold", 0.08)?
            .add_source(File::with_name("config/settings").required(false));

        // If env_vars is provided, we use it instead of system environment
        // This is to avoid systems variables pollution across tests
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // Use system environment variables
            // Should be in the format BACSTOP_DEVICE__ADDRESS or BACSTOP_TEST__TIMEOUT_SECS
            builder = builder.add_source(
                Environment::with_prefix("BACSTOP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::load().expect("Failed to load config");

        assert!(config.device.address.is_none());
        assert_eq!(config.device.scan_timeout_secs, 10);
        assert_eq!(config.test.timeout_secs, 60);
        assert_eq!(config.test.threshold, 0.08);
    }

    #[test]
    fn test_env_config() {
        let mut env_vars = HashMap::new();
        env_vars.insert(
            "device.address".to_string(),
            "AA:BB:CC:DD:EE:FF".to_string(),
        );
        env_vars.insert("test.timeout_secs".to_string(), "90".to_string());

        let config = Config::load_with_sources(Some(env_vars)).expect("Failed to load config");

        assert_eq!(config.device.address.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(config.test.timeout_secs, 90);
    }

    #[test]
    fn test_partial_env_override() {
        let mut env_vars = HashMap::new();
        // We just override the threshold
        env_vars.insert("test.threshold".to_string(), "0.05".to_string());

        let config = Config::load_with_sources(Some(env_vars)).expect("Failed to load config");

        assert_eq!(config.test.threshold, 0.05);
        // The other values should use default
        assert_eq!(config.device.scan_timeout_secs, 10);
        assert_eq!(config.test.timeout_secs, 60);
    }
}
