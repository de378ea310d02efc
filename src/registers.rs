use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Symbolic holding registers of one actuator.
///
/// The discriminant is the offset used by the stock firmware, see [`RegisterMap::standard`].
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Register {
    /// Target / current raw position.
    Position = 2,
    /// Maximum travel speed, `200..=1023`.
    Speed = 3,
    /// Control loop mode.
    LoopMode = 4,
    /// Write-back of the accepted target.
    TargetWriteback = 6,
    /// Motion direction polarity.
    Polarity = 7,
    /// Whether the actuator holds its commanded position.
    TargetLock = 8,
    PidP = 9,
    PidI = 10,
    PidD = 11,
    Deadzone = 14,
    MaxTorque = 15,
}

impl Register {
    /// Every register, in map order.
    pub const ALL: [Register; 11] = [
        Register::Position,
        Register::Speed,
        Register::LoopMode,
        Register::TargetWriteback,
        Register::Polarity,
        Register::TargetLock,
        Register::PidP,
        Register::PidI,
        Register::PidD,
        Register::Deadzone,
        Register::MaxTorque,
    ];
}

/// Proportional / integral / derivative gain selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PidGain {
    P,
    I,
    D,
}

impl PidGain {
    pub fn register(&self) -> Register {
        match self {
            PidGain::P => Register::PidP,
            PidGain::I => Register::PidI,
            PidGain::D => Register::PidD,
        }
    }
}

/// Register offsets of one actuator model.
///
/// Offsets are fixed once the map is built; use [`RegisterMap::standard`] unless the
/// deployment runs a firmware with a shifted layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterMap {
    position: u16,
    speed: u16,
    loop_mode: u16,
    target_writeback: u16,
    polarity: u16,
    target_lock: u16,
    pid_p: u16,
    pid_i: u16,
    pid_d: u16,
    deadzone: u16,
    max_torque: u16,
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self::standard()
    }
}

impl RegisterMap {
    /// Offsets of the stock firmware.
    pub const fn standard() -> Self {
        Self {
            position: Register::Position as u16,
            speed: Register::Speed as u16,
            loop_mode: Register::LoopMode as u16,
            target_writeback: Register::TargetWriteback as u16,
            polarity: Register::Polarity as u16,
            target_lock: Register::TargetLock as u16,
            pid_p: Register::PidP as u16,
            pid_i: Register::PidI as u16,
            pid_d: Register::PidD as u16,
            deadzone: Register::Deadzone as u16,
            max_torque: Register::MaxTorque as u16,
        }
    }

    /// Build a map from `(register, offset)` overrides on top of the stock layout.
    pub fn with_offsets(
        overrides: impl IntoIterator<Item = (Register, u16)>,
    ) -> Result<Self, ValidationError> {
        let mut map = Self::standard();
        for (register, offset) in overrides {
            *map.slot(register) = offset;
        }
        map.validate()?;
        Ok(map)
    }

    fn slot(&mut self, register: Register) -> &mut u16 {
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

    pub fn offset(&self, register: Register) -> u16 {
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

    /// Reverse lookup of an offset in this map.
    pub fn register_at(&self, offset: u16) -> Option<Register> {
        Register::ALL
            .into_iter()
            .find(|register| self.offset(*register) == offset)
    }

    /// Offsets must be pairwise distinct.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for register in Register::ALL {
            let offset = self.offset(register);
            match self.register_at(offset) {
                Some(first) if first != register => {
                    return Err(ValidationError::DuplicateRegisterOffset {
                        offset,
                        first,
                        second: register,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}
