use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::ClockTime;

/// Monotonic time authority for "now" on the audio timeline.
///
/// The scheduler reads it to decide which beats are near enough to be queued,
/// and the consumer reads it to decide which beats are due.
pub trait AudioClock: Send + Sync {
  fn now(&self) -> ClockTime;
}

/// Audio clock backed by the system monotonic clock, starting at zero when created.
pub struct SystemAudioClock {
  origin: Instant,
}

impl SystemAudioClock {
  pub fn new() -> SystemAudioClock {
    SystemAudioClock {
      origin: Instant::now(),
    }
  }
}

impl Default for SystemAudioClock {
  fn default() -> SystemAudioClock {
    SystemAudioClock::new()
  }
}

impl AudioClock for SystemAudioClock {
  fn now(&self) -> ClockTime {
    ClockTime::new(self.origin.elapsed().as_nanos() as u64)
  }
}

/// Audio clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
  units: AtomicU64,
}

impl ManualClock {
  pub fn new() -> ManualClock {
    ManualClock {
      units: AtomicU64::new(0),
    }
  }

  /// Moving backwards is ignored, the clock is monotonic.
  pub fn set(&self, time: ClockTime) {
    self.units.fetch_max(time.units(), Ordering::SeqCst);
  }

  pub fn set_seconds(&self, seconds: f64) {
    self.set(ClockTime::from_seconds(seconds));
  }

  pub fn advance(&self, duration: ClockTime) {
    self.units.fetch_add(duration.units(), Ordering::SeqCst);
  }
}

impl AudioClock for ManualClock {
  fn now(&self) -> ClockTime {
    ClockTime::new(self.units.load(Ordering::SeqCst))
  }
}

#[cfg(test)]
mod test {
  use super::{AudioClock, ClockTime, ManualClock, SystemAudioClock};

  #[test]
  pub fn system_clock_is_monotonic() {
    let clock = SystemAudioClock::new();
    let t1 = clock.now();
    let t2 = clock.now();
    assert!(t2 >= t1);
  }

  #[test]
  pub fn manual_clock_moves_forward_only() {
    let clock = ManualClock::new();
    assert_eq!(clock.now(), ClockTime::zero());

    clock.set_seconds(1.5);
    assert_eq!(clock.now(), ClockTime::from_seconds(1.5));

    clock.set_seconds(1.0);
    assert_eq!(clock.now(), ClockTime::from_seconds(1.5));

    clock.advance(ClockTime::from_millis(500));
    assert_eq!(clock.now(), ClockTime::from_seconds(2.0));
  }
}
