use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::GripperConfig;
use crate::error::{GripperError, TransportError, ValidationError};
use crate::executor::{execute_with_retry, CancelToken, RetryPolicy};
use crate::position::PositionRange;
use crate::registers::{PidGain, Register, RegisterMap};
use crate::snapshot::ActuatorSnapshot;
use crate::transport::{ModbusSession, Transport};

/// Lowest accepted value of the speed register.
pub const MIN_SPEED: u16 = 200;
/// Highest accepted value of the speed register.
pub const MAX_SPEED: u16 = 1023;

/// One of the two actuators on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

/// Modbus slave ids of the two actuators. Deployments differ (`1/0`, `2/10`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorAddresses {
    pub left: u8,
    pub right: u8,
}

impl Default for ActuatorAddresses {
    fn default() -> Self {
        Self { left: 1, right: 0 }
    }
}

impl ActuatorAddresses {
    pub fn new(left: u8, right: u8) -> Result<Self, ValidationError> {
        let addresses = Self { left, right };
        addresses.validate()?;
        Ok(addresses)
    }

    pub fn get(&self, side: Side) -> u8 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.left == self.right {
            return Err(ValidationError::DuplicateAddress(self.left));
        }
        Ok(())
    }
}

/// Per-side result of a command sent to both actuators.
///
/// A partial failure is reported as such; nothing is rolled back, so the two actuators may
/// be left at different raw positions.
#[derive(Debug)]
pub struct DualOutcome<T> {
    pub left: Result<T, GripperError>,
    pub right: Result<T, GripperError>,
}

impl<T> DualOutcome<T> {
    pub fn side(&self, side: Side) -> &Result<T, GripperError> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Both sides confirmed.
    pub fn is_success(&self) -> bool {
        self.left.is_ok() && self.right.is_ok()
    }

    /// Exactly one side confirmed.
    pub fn is_partial(&self) -> bool {
        self.left.is_ok() != self.right.is_ok()
    }

    /// Sides that did not confirm.
    pub fn failed_sides(&self) -> Vec<Side> {
        [Side::Left, Side::Right]
            .into_iter()
            .filter(|side| self.side(*side).is_err())
            .collect()
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> DualOutcome<U> {
        DualOutcome {
            left: self.left.map(&mut f),
            right: self.right.map(&mut f),
        }
    }

    /// Collapse into a single result, reporting the left error first.
    pub fn into_result(self) -> Result<(T, T), GripperError> {
        Ok((self.left?, self.right?))
    }
}

/// Drives the left and right actuators over one shared transport.
///
/// Every register transaction takes the transport lock for one round trip plus the
/// inter-command delay, so a `Coordinator` can be shared between tasks (e.g. behind an
/// `Arc`) without overlapping frames on the wire.
pub struct Coordinator<T> {
    transport: Mutex<T>,
    addresses: ActuatorAddresses,
    registers: RegisterMap,
    range: PositionRange,
    timeout: Duration,
    inter_command_delay: Duration,
    position_retry: RetryPolicy,
    command_retry: RetryPolicy,
}

impl Coordinator<ModbusSession> {
    /// Open the configured serial port and build a coordinator on it.
    pub fn open(config: &GripperConfig) -> Result<Self, GripperError> {
        config.validate()?;
        let session = ModbusSession::open(config.serial.clone())?;
        Self::new(session, config)
    }
}

impl<T: Transport> Coordinator<T> {
    pub fn new(transport: T, config: &GripperConfig) -> Result<Self, GripperError> {
        config.validate()?;
        Ok(Self {
            transport: Mutex::new(transport),
            addresses: config.addresses,
            registers: config.registers,
            range: config.position_range,
            timeout: config.serial.timeout(),
            inter_command_delay: config.inter_command_delay(),
            position_retry: config.position_retry,
            command_retry: config.command_retry,
        })
    }

    pub fn addresses(&self) -> ActuatorAddresses {
        self.addresses
    }

    pub fn registers(&self) -> &RegisterMap {
        &self.registers
    }

    pub fn position_range(&self) -> PositionRange {
        self.range
    }

    pub fn position_retry(&self) -> RetryPolicy {
        self.position_retry
    }

    /// Release the transport. Later commands fail with a transport error.
    pub async fn close(&self) -> Result<(), GripperError> {
        self.transport.lock().await.close().await
    }

    /// Hand the transport back, e.g. to inspect a test double.
    pub fn into_transport(self) -> T {
        self.transport.into_inner()
    }

    async fn settle(&self) {
        if !self.inter_command_delay.is_zero() {
            tokio::time::sleep(self.inter_command_delay).await;
        }
    }

    /// Single-attempt write of one register on one side.
    pub async fn write_side(
        &self,
        side: Side,
        register: Register,
        value: u16,
    ) -> Result<(), GripperError> {
        let slave = self.addresses.get(side);
        let offset = self.registers.offset(register);
        let mut link = self.transport.lock().await;
        let res = link.write_register(slave, offset, value, self.timeout).await;
        self.settle().await;
        drop(link);

        match &res {
            Ok(()) => debug!(?side, ?register, value, "register written"),
            Err(err) => debug!(?side, ?register, value, %err, "register write failed"),
        }
        res
    }

    /// Single-attempt read of one register on one side.
    pub async fn read_side(&self, side: Side, register: Register) -> Result<u16, GripperError> {
        let slave = self.addresses.get(side);
        let offset = self.registers.offset(register);
        let mut link = self.transport.lock().await;
        let res = link.read_registers(slave, offset, 1, self.timeout).await;
        self.settle().await;
        drop(link);

        let value = res?.first().copied().ok_or(TransportError::ShortResponse {
            expected: 1,
            actual: 0,
        })?;
        debug!(?side, ?register, value, "register read");
        Ok(value)
    }

    /// Write one side under `policy`, re-issuing the same write until it is confirmed.
    pub async fn write_side_retrying(
        &self,
        side: Side,
        register: Register,
        value: u16,
        policy: &RetryPolicy,
        cancel: &CancelToken,
    ) -> Result<(), GripperError> {
        execute_with_retry(policy, cancel, || self.write_side(side, register, value)).await
    }

    /// Read one side under `policy`.
    pub async fn read_side_retrying(
        &self,
        side: Side,
        register: Register,
        policy: &RetryPolicy,
        cancel: &CancelToken,
    ) -> Result<u16, GripperError> {
        execute_with_retry(policy, cancel, || self.read_side(side, register)).await
    }

    /// Left until confirmed, only then right until confirmed.
    ///
    /// If the left side never confirms the right side is not touched and reports
    /// [`GripperError::NotAttempted`].
    async fn write_sequential(
        &self,
        register: Register,
        value: u16,
        policy: &RetryPolicy,
        cancel: &CancelToken,
    ) -> DualOutcome<()> {
        let left = self
            .write_side_retrying(Side::Left, register, value, policy, cancel)
            .await;
        let right = match left {
            Ok(()) => {
                self.write_side_retrying(Side::Right, register, value, policy, cancel)
                    .await
            }
            Err(_) => Err(GripperError::NotAttempted),
        };
        DualOutcome { left, right }
    }

    /// Left then right, each under `policy`, the right side regardless of the left outcome.
    async fn write_each(
        &self,
        register: Register,
        value: u16,
        policy: &RetryPolicy,
        cancel: &CancelToken,
    ) -> DualOutcome<()> {
        let left = self
            .write_side_retrying(Side::Left, register, value, policy, cancel)
            .await;
        let right = self
            .write_side_retrying(Side::Right, register, value, policy, cancel)
            .await;
        DualOutcome { left, right }
    }

    async fn read_each(
        &self,
        register: Register,
        policy: &RetryPolicy,
        cancel: &CancelToken,
    ) -> DualOutcome<u16> {
        let left = self
            .read_side_retrying(Side::Left, register, policy, cancel)
            .await;
        let right = self
            .read_side_retrying(Side::Right, register, policy, cancel)
            .await;
        DualOutcome { left, right }
    }

    fn report(&self, what: &str, value: u16, outcome: &DualOutcome<()>) {
        if outcome.is_success() {
            info!(value, "{what} confirmed on both sides");
        } else {
            warn!(value, failed = ?outcome.failed_sides(), "{what} not confirmed");
        }
    }

    /// Sequential-retry position write under the configured position policy.
    pub async fn set_position_raw(&self, raw: u16) -> Result<DualOutcome<()>, GripperError> {
        self.set_position_raw_with_cancel(raw, &CancelToken::new())
            .await
    }

    /// Like [`set_position_raw`](Self::set_position_raw), abortable through `cancel`.
    pub async fn set_position_raw_with_cancel(
        &self,
        raw: u16,
        cancel: &CancelToken,
    ) -> Result<DualOutcome<()>, GripperError> {
        let raw = self.range.check_raw(raw)?;
        let outcome = self
            .write_sequential(Register::Position, raw, &self.position_retry, cancel)
            .await;
        self.report("position", raw, &outcome);
        Ok(outcome)
    }

    /// Concurrent-direct position write: both sides once, no retry.
    pub async fn set_position_raw_direct(
        &self,
        raw: u16,
    ) -> Result<DualOutcome<()>, GripperError> {
        let raw = self.range.check_raw(raw)?;
        let (left, right) = tokio::join!(
            self.write_side(Side::Left, Register::Position, raw),
            self.write_side(Side::Right, Register::Position, raw),
        );
        let outcome = DualOutcome { left, right };
        self.report("direct position", raw, &outcome);
        Ok(outcome)
    }

    /// Map `percent` through the position range, then [`set_position_raw`](Self::set_position_raw).
    pub async fn set_position_percent(
        &self,
        percent: f64,
    ) -> Result<DualOutcome<()>, GripperError> {
        self.set_position_percent_with_cancel(percent, &CancelToken::new())
            .await
    }

    pub async fn set_position_percent_with_cancel(
        &self,
        percent: f64,
        cancel: &CancelToken,
    ) -> Result<DualOutcome<()>, GripperError> {
        let raw = self.range.percent_to_raw(percent)?;
        self.set_position_raw_with_cancel(raw, cancel).await
    }

    pub async fn set_position_percent_direct(
        &self,
        percent: f64,
    ) -> Result<DualOutcome<()>, GripperError> {
        let raw = self.range.percent_to_raw(percent)?;
        self.set_position_raw_direct(raw).await
    }

    /// Set the maximum travel speed of both actuators, `200..=1023`.
    pub async fn set_speed(&self, speed: u16) -> Result<DualOutcome<()>, GripperError> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(ValidationError::SpeedOutOfRange(speed).into());
        }
        let outcome = self
            .write_each(Register::Speed, speed, &self.command_retry, &CancelToken::new())
            .await;
        self.report("speed", speed, &outcome);
        Ok(outcome)
    }

    pub async fn set_pid(&self, gain: PidGain, value: u16) -> DualOutcome<()> {
        let outcome = self
            .write_each(gain.register(), value, &self.command_retry, &CancelToken::new())
            .await;
        self.report("pid gain", value, &outcome);
        outcome
    }

    pub async fn read_pid(&self, gain: PidGain) -> DualOutcome<u16> {
        self.read_register(gain.register()).await
    }

    pub async fn set_target_lock(&self, value: u16) -> DualOutcome<()> {
        self.write_register(Register::TargetLock, value).await
    }

    pub async fn read_target_lock(&self) -> DualOutcome<u16> {
        self.read_register(Register::TargetLock).await
    }

    /// Write any register on both sides under the command policy.
    pub async fn write_register(&self, register: Register, value: u16) -> DualOutcome<()> {
        let outcome = self
            .write_each(register, value, &self.command_retry, &CancelToken::new())
            .await;
        self.report("register write", value, &outcome);
        outcome
    }

    /// Single-attempt read of any register on both sides.
    pub async fn read_register(&self, register: Register) -> DualOutcome<u16> {
        self.read_each(register, &RetryPolicy::once(), &CancelToken::new())
            .await
    }

    /// Single-attempt read of both raw positions.
    pub async fn read_position(&self) -> DualOutcome<u16> {
        self.read_register(Register::Position).await
    }

    /// Read both positions, each side retried under `policy`.
    pub async fn read_position_with_retry(
        &self,
        policy: &RetryPolicy,
        cancel: &CancelToken,
    ) -> DualOutcome<u16> {
        self.read_each(Register::Position, policy, cancel).await
    }

    /// Both positions as a percentage of the configured range.
    pub async fn read_position_percent(&self) -> DualOutcome<f64> {
        let range = self.range;
        self.read_position()
            .await
            .map(|raw| range.raw_to_percent(raw))
    }

    /// Fresh single-attempt read of every mapped register of one side.
    ///
    /// A failed register is left empty; the remaining reads still go out.
    pub async fn read_snapshot(&self, side: Side) -> ActuatorSnapshot {
        let mut snapshot = ActuatorSnapshot::new(side, self.addresses.get(side));
        for register in Register::ALL {
            let value = match self.read_side(side, register).await {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(?side, ?register, %err, "snapshot read failed");
                    None
                }
            };
            snapshot.record(register, value);
        }
        snapshot
    }

    pub async fn read_snapshots(&self) -> (ActuatorSnapshot, ActuatorSnapshot) {
        let left = self.read_snapshot(Side::Left).await;
        let right = self.read_snapshot(Side::Right).await;
        (left, right)
    }
}
