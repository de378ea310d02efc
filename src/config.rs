use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::coordinator::ActuatorAddresses;
use crate::error::{ConfigError, GripperError, ValidationError};
use crate::executor::RetryPolicy;
use crate::position::PositionRange;
use crate::registers::RegisterMap;
use crate::transport::SerialConfig;

/// Deployment settings of one dual gripper.
///
/// Every field has a default, so a JSON file only needs the keys that differ:
///
/// ```json
/// {
///     "serial": { "port": "/dev/ttyUSB_gripper", "timeout_ms": 50 },
///     "addresses": { "left": 2, "right": 10 },
///     "position_range": { "at_zero": 580, "at_hundred": 100 },
///     "position_retry": { "max_attempts": null }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GripperConfig {
    pub serial: SerialConfig,
    pub addresses: ActuatorAddresses,
    pub position_range: PositionRange,
    pub registers: RegisterMap,
    /// Retry policy of position writes.
    pub position_retry: RetryPolicy,
    /// Retry policy of speed, PID, target-lock and other register writes.
    pub command_retry: RetryPolicy,
    /// Pause after every transaction while the link is still held.
    pub inter_command_delay_ms: u64,
}

impl Default for GripperConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            addresses: ActuatorAddresses::default(),
            position_range: PositionRange::default(),
            registers: RegisterMap::standard(),
            position_retry: RetryPolicy::bounded(100),
            command_retry: RetryPolicy::once(),
            inter_command_delay_ms: 1,
        }
    }
}

impl GripperConfig {
    pub fn from_json_str(json: &str) -> Result<Self, GripperError> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GripperError> {
        let json = std::fs::read_to_string(path).map_err(ConfigError::from)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, GripperError> {
        Ok(serde_json::to_string_pretty(self).map_err(ConfigError::from)?)
    }

    pub fn inter_command_delay(&self) -> Duration {
        Duration::from_millis(self.inter_command_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.addresses.validate()?;
        self.registers.validate()?;
        Ok(())
    }
}
