use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Every tunable knob of the sync protocol, loaded from an optional JSON file and
/// otherwise defaulted. CLI flags in the binaries override individual fields after
/// loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub master_ip: String,
    pub sync_port: u16,
    pub sync_timeout: f64,
    pub sync_interval: f64,
    pub rounds_per_sync: usize,
    pub sync_threshold: f64,
    pub large_offset_threshold: f64,
    pub master_offline_timeout: f64,
    pub pid_kp: f64,
    pub pid_ki: f64,
    pub pid_kd: f64,
    pub pid_integral_limit: f64,
    pub max_rate_adjustment: f64,
    pub pid_large_offset_reset: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            master_ip: "127.0.0.1".to_string(),
            sync_port: 12345,
            sync_timeout: 1.0,
            sync_interval: 5.0,
            rounds_per_sync: 6,
            sync_threshold: 0.001,
            large_offset_threshold: 5.0,
            master_offline_timeout: 15.0,
            pid_kp: 0.8,
            pid_ki: 0.5,
            pid_kd: 0.1,
            pid_integral_limit: 1.0,
            max_rate_adjustment: 1.0,
            pid_large_offset_reset: 1.0,
        }
    }
}

impl SyncConfig {
    /// Reads a JSON config file. Callers fall back to `Default::default()` when no
    /// path was given; a path that is given but unreadable/unparseable is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: SyncConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Rejects configurations that would make the protocol state machine or the
    /// PID controller ill-defined. Fatal at startup — never silently clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.master_ip.trim().is_empty() {
            return Err(ConfigError::Invalid("master_ip must not be empty".into()));
        }
        if self.sync_timeout <= 0.0 {
            return Err(ConfigError::Invalid("sync_timeout must be positive".into()));
        }
        if self.sync_interval <= 0.0 {
            return Err(ConfigError::Invalid("sync_interval must be positive".into()));
        }
        if self.rounds_per_sync == 0 {
            return Err(ConfigError::Invalid("rounds_per_sync must be at least 1".into()));
        }
        if self.sync_threshold < 0.0 {
            return Err(ConfigError::Invalid("sync_threshold must not be negative".into()));
        }
        if self.large_offset_threshold <= self.sync_threshold {
            return Err(ConfigError::Invalid(
                "large_offset_threshold must exceed sync_threshold".into(),
            ));
        }
        if self.master_offline_timeout <= 0.0 {
            return Err(ConfigError::Invalid("master_offline_timeout must be positive".into()));
        }
        if self.pid_integral_limit <= 0.0 {
            return Err(ConfigError::Invalid("pid_integral_limit must be positive".into()));
        }
        if self.max_rate_adjustment <= 0.0 || self.max_rate_adjustment > 1.0 {
            return Err(ConfigError::Invalid(
                "max_rate_adjustment must be in (0, 1.0]".into(),
            ));
        }
        if self.pid_large_offset_reset <= 0.0 {
            return Err(ConfigError::Invalid("pid_large_offset_reset must be positive".into()));
        }
        Ok(())
    }
}
