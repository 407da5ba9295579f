use serde_derive::Serialize;

use crate::sequence::SequenceError;

pub const MIN_BEAT_COUNT: u8 = 1;
pub const MAX_BEAT_COUNT: u8 = 8;
pub const DEFAULT_BEAT_COUNT: u8 = 4;

/// Number of evenly spaced beats per measure, always within [1, 8].
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize)]
pub struct BeatCount(u8);

impl BeatCount {
  pub fn new(value: u8) -> Result<BeatCount, SequenceError> {
    if (MIN_BEAT_COUNT..=MAX_BEAT_COUNT).contains(&value) {
      Ok(BeatCount(value))
    } else {
      Err(SequenceError::BeatCountOutOfRange { requested: value })
    }
  }

  pub fn get_value(&self) -> u8 {
    self.0
  }
}

impl Default for BeatCount {
  fn default() -> BeatCount {
    BeatCount(DEFAULT_BEAT_COUNT)
  }
}

/// Beat count governing a sequence, with an optional change waiting for the next measure.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Cardinality {
  Stable(BeatCount),
  PendingChange { active: BeatCount, pending: BeatCount },
}

impl Cardinality {
  pub fn new(active: BeatCount) -> Cardinality {
    Cardinality::Stable(active)
  }

  pub fn active(&self) -> BeatCount {
    match self {
      Cardinality::Stable(active) => *active,
      Cardinality::PendingChange { active, .. } => *active,
    }
  }

  pub fn pending(&self) -> Option<BeatCount> {
    match self {
      Cardinality::Stable(_) => None,
      Cardinality::PendingChange { pending, .. } => Some(*pending),
    }
  }

  /// The count the sequence is heading to: the pending one if any, else the active one.
  pub fn requested(&self) -> BeatCount {
    self.pending().unwrap_or_else(|| self.active())
  }

  /// Asking for the active count drops a pending change.
  pub fn request(&mut self, count: BeatCount) {
    let active = self.active();
    *self = if count == active {
      Cardinality::Stable(active)
    } else {
      Cardinality::PendingChange {
        active,
        pending: count,
      }
    };
  }

  /// Applies the pending change, if any, returning the new active count.
  /// Only to be called at the start of a measure.
  pub fn commit(&mut self) -> Option<BeatCount> {
    match *self {
      Cardinality::Stable(_) => None,
      Cardinality::PendingChange { pending, .. } => {
        *self = Cardinality::Stable(pending);
        Some(pending)
      }
    }
  }
}

#[cfg(test)]
mod test {

  use super::{BeatCount, Cardinality};

  fn count(value: u8) -> BeatCount {
    BeatCount::new(value).unwrap()
  }

  #[test]
  pub fn beat_count_bounds() {
    assert!(BeatCount::new(0).is_err());
    assert!(BeatCount::new(9).is_err());
    for value in 1..=8 {
      assert_eq!(BeatCount::new(value).unwrap().get_value(), value);
    }
    assert_eq!(BeatCount::default().get_value(), 4);
  }

  #[test]
  pub fn request_then_commit() {
    let mut cardinality = Cardinality::new(count(4));
    cardinality.request(count(3));
    assert_eq!(cardinality.active(), count(4));
    assert_eq!(cardinality.pending(), Some(count(3)));
    assert_eq!(cardinality.requested(), count(3));

    assert_eq!(cardinality.commit(), Some(count(3)));
    assert_eq!(cardinality, Cardinality::Stable(count(3)));
    assert_eq!(cardinality.commit(), None);
  }

  #[test]
  pub fn request_active_cancels_pending() {
    let mut cardinality = Cardinality::new(count(4));
    cardinality.request(count(6));
    cardinality.request(count(4));
    assert_eq!(cardinality, Cardinality::Stable(count(4)));
  }

  #[test]
  pub fn latest_request_wins() {
    let mut cardinality = Cardinality::new(count(4));
    cardinality.request(count(6));
    cardinality.request(count(2));
    assert_eq!(cardinality.pending(), Some(count(2)));
  }
}
