use std::time::Duration;

use thiserror::Error;

use crate::registers::Register;

/// Bad input from the caller. Raised before any register transaction is issued.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("percent position {0} is outside [0, 100]")]
    PercentOutOfRange(f64),
    #[error("speed {0} is outside [200, 1023]")]
    SpeedOutOfRange(u16),
    #[error("raw position {raw} is outside the configured range [{low}, {high}]")]
    RawOutOfRange { raw: u16, low: u16, high: u16 },
    #[error("position range has identical bounds ({0})")]
    DegenerateRange(u16),
    #[error("left and right actuators share slave address {0}")]
    DuplicateAddress(u8),
    #[error("register offset {offset} is assigned to both {first:?} and {second:?}")]
    DuplicateRegisterOffset {
        offset: u16,
        first: Register,
        second: Register,
    },
}

/// The serial link could not carry the transaction. Usually transient.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("modbus protocol or transport error: {0}")]
    Protocol(#[from] tokio_modbus::Error),
    #[error("session is closed")]
    Closed,
    #[error("short response, expected {expected} registers, got {actual}")]
    ShortResponse { expected: usize, actual: usize },
}

/// Failure to load a [`GripperConfig`](crate::GripperConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum GripperError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("a server (slave) exception: {0}")]
    Device(#[from] tokio_modbus::Exception),
    #[error("gave up after {attempts} attempts, last error: {last}")]
    RetryExhausted {
        attempts: u32,
        last: Box<GripperError>,
    },
    #[error("retry loop cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
    #[error("not attempted, the preceding side did not confirm")]
    NotAttempted,
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl GripperError {
    /// Whether re-issuing the same transaction could plausibly succeed.
    ///
    /// A closed session stays closed, so it is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            GripperError::Transport(TransportError::Closed) => false,
            GripperError::Transport(_) | GripperError::Device(_) => true,
            _ => false,
        }
    }

    /// The error behind any retry bookkeeping.
    pub fn root(&self) -> &GripperError {
        match self {
            GripperError::RetryExhausted { last, .. } => last.root(),
            other => other,
        }
    }
}

impl From<std::io::Error> for GripperError {
    fn from(value: std::io::Error) -> Self {
        GripperError::Transport(TransportError::Io(value))
    }
}

impl From<tokio_modbus::Error> for GripperError {
    fn from(value: tokio_modbus::Error) -> Self {
        GripperError::Transport(TransportError::Protocol(value))
    }
}
