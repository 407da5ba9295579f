use crate::time::ClockTime;

///! Spreads the integer remainder of `measure / beats` over the beats of a measure,
///! so that the beat durations of every measure add up to the measure duration.
#[derive(Debug, Clone)]
pub struct BeatDriftCorrection {
  beat_duration: ClockTime,
  beat_count: u64,
  error_per_beat: u64,
  error_accumulated: u64,
}

impl BeatDriftCorrection {
  pub fn new(measure_duration: ClockTime, beat_count: u8) -> BeatDriftCorrection {
    let beat_count = u64::from(beat_count.max(1));
    BeatDriftCorrection {
      beat_duration: ClockTime::new(measure_duration.units() / beat_count),
      beat_count,
      error_per_beat: measure_duration.units() % beat_count,
      error_accumulated: 0,
    }
  }

  pub fn next(&mut self) -> ClockTime {
    let total_error = self.error_accumulated + self.error_per_beat;
    if total_error >= self.beat_count {
      self.error_accumulated = total_error - self.beat_count;
      self.beat_duration + ClockTime::new(1)
    } else {
      self.error_accumulated = total_error;
      self.beat_duration
    }
  }
}

#[cfg(test)]
mod test {

  use super::BeatDriftCorrection;
  use super::ClockTime;

  #[test]
  pub fn beat_drift_correction_new() {
    let correction = BeatDriftCorrection::new(ClockTime::from_seconds(2.0), 3);
    assert_eq!(correction.beat_duration, ClockTime::new(666_666_666));
    assert_eq!(correction.error_per_beat, 2);
    assert_eq!(correction.error_accumulated, 0);
  }

  #[test]
  pub fn beat_drift_correction_exact_division() {
    let mut correction = BeatDriftCorrection::new(ClockTime::from_seconds(2.0), 4);
    assert_eq!(correction.error_per_beat, 0);
    for _ in 0..8 {
      assert_eq!(correction.next(), ClockTime::from_seconds(0.5));
    }
  }

  #[test]
  pub fn beat_drift_correction_next() {
    let mut correction = BeatDriftCorrection::new(ClockTime::from_seconds(2.0), 3);
    assert_eq!(correction.next(), ClockTime::new(666_666_666));
    assert_eq!(correction.next(), ClockTime::new(666_666_667));
    assert_eq!(correction.next(), ClockTime::new(666_666_667));
    assert_eq!(correction.error_accumulated, 0);
    assert_eq!(correction.next(), ClockTime::new(666_666_666));
  }

  #[test]
  pub fn beat_drift_correction_measures_add_up() {
    let measure = ClockTime::new(1_999_999_999);
    for beats in 1..=8 {
      let mut correction = BeatDriftCorrection::new(measure, beats);
      for _ in 0..10 {
        let mut total = ClockTime::zero();
        for _ in 0..beats {
          total += correction.next();
        }
        assert_eq!(total, measure);
      }
    }
  }
}
