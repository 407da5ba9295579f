use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::{Serialize, Serializer};

pub const NANOS_PER_SECOND: u64 = 1_000_000_000;
pub const NANOS_PER_MILLI: u64 = 1_000_000;

pub type UnitType = u64;
pub const UNITS_PER_SECOND: UnitType = NANOS_PER_SECOND as UnitType;
pub const UNITS_PER_MILLI: UnitType = NANOS_PER_MILLI as UnitType;

///! High resolution time on the audio timeline
#[derive(Debug, PartialOrd, Ord, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub struct ClockTime(UnitType);

impl ClockTime {
  pub fn zero() -> ClockTime {
    ClockTime(0)
  }

  pub fn new(units: UnitType) -> ClockTime {
    ClockTime(units)
  }

  /// Negative and NaN inputs map to zero.
  pub fn from_seconds(seconds: f64) -> ClockTime {
    if seconds.is_finite() && seconds > 0.0 {
      ClockTime((seconds * UNITS_PER_SECOND as f64).round() as UnitType)
    } else {
      ClockTime::zero()
    }
  }

  pub fn from_millis(millis: u64) -> ClockTime {
    ClockTime(millis * UNITS_PER_MILLI)
  }

  pub fn units(&self) -> UnitType {
    self.0
  }

  pub fn to_seconds(&self) -> f64 {
    self.0 as f64 / UNITS_PER_SECOND as f64
  }

  /// Largest multiple of `period` that is not after this time.
  pub fn floor_to(&self, period: ClockTime) -> ClockTime {
    if period.0 == 0 {
      *self
    } else {
      ClockTime(self.0 - self.0 % period.0)
    }
  }

  pub fn saturating_sub(&self, rhs: ClockTime) -> ClockTime {
    ClockTime(self.0.saturating_sub(rhs.0))
  }
}

impl Add for ClockTime {
  type Output = ClockTime;

  fn add(self, rhs: ClockTime) -> ClockTime {
    ClockTime(self.0 + rhs.0)
  }
}

impl AddAssign for ClockTime {
  fn add_assign(&mut self, rhs: ClockTime) {
    *self = *self + rhs;
  }
}

impl Sub for ClockTime {
  type Output = ClockTime;

  fn sub(self, rhs: ClockTime) -> ClockTime {
    self.saturating_sub(rhs)
  }
}

impl SubAssign for ClockTime {
  fn sub_assign(&mut self, rhs: ClockTime) {
    *self = *self - rhs;
  }
}

// Clients of the engine think in seconds, as the audio clock does.
impl Serialize for ClockTime {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_f64(self.to_seconds())
  }
}
