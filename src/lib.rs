//! # dual-gripper-rs
//!
//! `dual-gripper-rs` is a library for driving a dual-actuator (left / right) electric gripper
//! over Modbus RTU.
//!
//! Both actuators hang off one RS485 link and are told apart by their slave id. The
//! [`Coordinator`] sends every logical command (position, speed, PID gains, target lock) to
//! both of them and reports what each side answered.
//!
//! ### Register map
//! | Register          | Offset | Notes                        |
//! |-------------------|--------|------------------------------|
//! | `Position`        | 2      | raw position code            |
//! | `Speed`           | 3      | `200..=1023`                 |
//! | `LoopMode`        | 4      |                              |
//! | `TargetWriteback` | 6      |                              |
//! | `Polarity`        | 7      |                              |
//! | `TargetLock`      | 8      | hold commanded position      |
//! | `PidP/I/D`        | 9..=11 |                              |
//! | `Deadzone`        | 14     |                              |
//! | `MaxTorque`       | 15     |                              |
//!
//! ### Position commands
//! - [`Coordinator::set_position_raw`]: left is retried until confirmed, only then right.
//!   The retry bound comes from [`GripperConfig::position_retry`]; it may be unbounded,
//!   in which case pass a [`CancelToken`] to
//!   [`set_position_raw_with_cancel`](Coordinator::set_position_raw_with_cancel).
//! - [`Coordinator::set_position_raw_direct`]: both sides once, no retry, per-side outcome.
//!
//! Reads (positions, PID gains, snapshots) are single attempt. Wrap them with
//! [`Coordinator::read_position_with_retry`] or [`execute_with_retry`] when needed.
//!
//! ## Example
//! ```no_run
//! use dual_gripper_rs::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), GripperError> {
//!     // The serial port path and the slave ids of the two actuators
//!     let config = GripperConfig {
//!         serial: SerialConfig {
//!             port: "/dev/ttyUSB0".to_string(),
//!             ..Default::default()
//!         },
//!         addresses: ActuatorAddresses::new(1, 0)?,
//!         position_range: PositionRange::new(580, 100)?,
//!         ..Default::default()
//!     };
//!
//!     // open the RS485 link, shared by both actuators
//!     let gripper = Coordinator::open(&config)?;
//!
//!     // speed applies to both sides
//!     gripper.set_speed(1022).await?.into_result()?;
//!
//!     // half closed, left first then right
//!     let outcome = gripper.set_position_percent(50.0).await?;
//!     if !outcome.is_success() {
//!         println!("not confirmed on {:?}", outcome.failed_sides());
//!     }
//!
//!     // fire and forget on both sides
//!     let outcome = gripper.set_position_percent_direct(0.0).await?;
//!     println!("left: {:?}, right: {:?}", outcome.left, outcome.right);
//!
//!     // read back
//!     let (left, right) = gripper.read_position().await.into_result()?;
//!     println!("left at {left}, right at {right}");
//!
//!     // everything the left actuator exposes
//!     let snapshot = gripper.read_snapshot(Side::Left).await;
//!     println!("{:?}", snapshot);
//!
//!     gripper.close().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod coordinator;
mod error;
mod executor;
mod position;
mod registers;
mod snapshot;
mod transport;

pub use config::GripperConfig;
pub use coordinator::{
    ActuatorAddresses, Coordinator, DualOutcome, Side, MAX_SPEED, MIN_SPEED,
};
pub use error::{ConfigError, GripperError, TransportError, ValidationError};
pub use executor::{execute_with_retry, CancelToken, RetryPolicy};
pub use position::PositionRange;
pub use registers::{PidGain, Register, RegisterMap};
pub use snapshot::ActuatorSnapshot;
pub use transport::{
    connect_serial, with_timeout, ConnectionStrategy, Connector, ModbusSession, SerialConfig,
    Transport,
};

/// Modbus exception codes reported by the actuators, see [`GripperError::Device`].
pub use tokio_modbus::Exception;
