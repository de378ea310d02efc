use serde::{Deserialize, Serialize};

use crate::coordinator::Side;
use crate::registers::Register;

/// Every mapped register of one actuator, read at one point in time.
///
/// Built on demand by [`Coordinator::read_snapshot`](crate::Coordinator::read_snapshot) and
/// never cached. A field is `None` when its read failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorSnapshot {
    pub side: Side,
    /// Modbus slave id the values were read from.
    pub address: u8,
    pub position: Option<u16>,
    pub speed: Option<u16>,
    pub loop_mode: Option<u16>,
    pub target_writeback: Option<u16>,
    pub polarity: Option<u16>,
    pub target_lock: Option<u16>,
    pub pid_p: Option<u16>,
    pub pid_i: Option<u16>,
    pub pid_d: Option<u16>,
    pub deadzone: Option<u16>,
    pub max_torque: Option<u16>,
}

impl ActuatorSnapshot {
    pub(crate) fn new(side: Side, address: u8) -> Self {
        Self {
            side,
            address,
            position: None,
            speed: None,
            loop_mode: None,
            target_writeback: None,
            polarity: None,
            target_lock: None,
            pid_p: None,
            pid_i: None,
            pid_d: None,
            deadzone: None,
            max_torque: None,
        }
    }

    fn slot(&mut self, register: Register) -> &mut Option<u16> {
        match register {
            Register::Position => &mut self.position,
            Register::Speed => &mut self.speed,
            Register::LoopMode => &mut self.loop_mode,
            Register::TargetWriteback => &mut self.target_writeback,
            Register::Polarity => &mut self.polarity,
            Register::TargetLock => &mut self.target_lock,
            Register::PidP => &mut self.pid_p,
            Register::PidI => &mut self.pid_i,
            Register::PidD => &mut self.pid_d,
            Register::Deadzone => &mut self.deadzone,
            Register::MaxTorque => &mut self.max_torque,
        }
    }

    pub(crate) fn record(&mut self, register: Register, value: Option<u16>) {
        *self.slot(register) = value;
    }

    pub fn get(&self, register: Register) -> Option<u16> {
        match register {
            Register::Position => self.position,
            Register::Speed => self.speed,
            Register::LoopMode => self.loop_mode,
            Register::TargetWriteback => self.target_writeback,
            Register::Polarity => self.polarity,
            Register::TargetLock => self.target_lock,
            Register::PidP => self.pid_p,
            Register::PidI => self.pid_i,
            Register::PidD => self.pid_d,
            Register::Deadzone => self.deadzone,
            Register::MaxTorque => self.max_torque,
        }
    }

    /// Registers whose read failed.
    pub fn missing(&self) -> Vec<Register> {
        Register::ALL
            .into_iter()
            .filter(|register| self.get(*register).is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}
