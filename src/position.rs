use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Raw register values at 0% and 100% travel.
///
/// `at_zero` may be numerically larger than `at_hundred`: grippers mounted the other way
/// round close towards the lower code, and the interpolation does not care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct PositionRange {
    at_zero: u16,
    at_hundred: u16,
}

#[derive(Deserialize)]
struct RawRange {
    at_zero: u16,
    at_hundred: u16,
}

impl TryFrom<RawRange> for PositionRange {
    type Error = ValidationError;

    fn try_from(value: RawRange) -> Result<Self, Self::Error> {
        PositionRange::new(value.at_zero, value.at_hundred)
    }
}

impl Default for PositionRange {
    fn default() -> Self {
        Self {
            at_zero: 100,
            at_hundred: 580,
        }
    }
}

impl PositionRange {
    pub fn new(at_zero: u16, at_hundred: u16) -> Result<Self, ValidationError> {
        if at_zero == at_hundred {
            return Err(ValidationError::DegenerateRange(at_zero));
        }
        Ok(Self {
            at_zero,
            at_hundred,
        })
    }

    pub fn at_zero(&self) -> u16 {
        self.at_zero
    }

    pub fn at_hundred(&self) -> u16 {
        self.at_hundred
    }

    /// Numerically smallest raw value of the range.
    pub fn low(&self) -> u16 {
        self.at_zero.min(self.at_hundred)
    }

    /// Numerically largest raw value of the range.
    pub fn high(&self) -> u16 {
        self.at_zero.max(self.at_hundred)
    }

    pub fn is_inverted(&self) -> bool {
        self.at_zero > self.at_hundred
    }

    /// Map a percentage to the raw register value.
    ///
    /// `raw = at_zero + (at_hundred - at_zero) * percent / 100`, truncated toward zero.
    /// Out-of-range (or NaN) input is rejected, never clamped.
    pub fn percent_to_raw(&self, percent: f64) -> Result<u16, ValidationError> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(ValidationError::PercentOutOfRange(percent));
        }
        let span = f64::from(self.at_hundred) - f64::from(self.at_zero);
        let raw = f64::from(self.at_zero) + span * percent / 100.0;
        Ok(raw.trunc() as u16)
    }

    /// Inverse of [`percent_to_raw`](Self::percent_to_raw), for reporting read-back positions.
    ///
    /// Raw values outside the range give percentages outside `[0, 100]`.
    pub fn raw_to_percent(&self, raw: u16) -> f64 {
        let span = f64::from(self.at_hundred) - f64::from(self.at_zero);
        (f64::from(raw) - f64::from(self.at_zero)) * 100.0 / span
    }

    pub fn check_raw(&self, raw: u16) -> Result<u16, ValidationError> {
        if raw < self.low() || raw > self.high() {
            return Err(ValidationError::RawOutOfRange {
                raw,
                low: self.low(),
                high: self.high(),
            });
        }
        Ok(raw)
    }
}
