use std::fmt;

use serde_derive::{Deserialize, Serialize};

use crate::sequence::SequenceId;
use crate::time::ClockTime;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentName {
  Kick,
  Snare,
  Sine,
}

impl InstrumentName {
  pub const ALL: [InstrumentName; 3] = [
    InstrumentName::Kick,
    InstrumentName::Snare,
    InstrumentName::Sine,
  ];

  pub fn get_value(&self) -> &'static str {
    match self {
      InstrumentName::Kick => "kick",
      InstrumentName::Snare => "snare",
      InstrumentName::Sine => "sine",
    }
  }

  pub fn next(self) -> InstrumentName {
    let index = Self::ALL.iter().position(|name| *name == self).unwrap_or(0);
    Self::ALL[(index + 1) % Self::ALL.len()]
  }
}

impl Default for InstrumentName {
  fn default() -> InstrumentName {
    InstrumentName::Kick
  }
}

impl fmt::Display for InstrumentName {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.get_value())
  }
}

/// Sound producing side effect of a beat.
///
/// `play` is called at most once per due beat with non-decreasing timestamps.
/// It must not block: the engine thread calls it while consuming a frame.
pub trait Instrument: Send {
  fn play(&mut self, time: ClockTime);
}

/// Builds the instrument a sequence plays through.
pub trait InstrumentFactory: Send {
  fn create(&self, id: SequenceId, name: InstrumentName) -> Box<dyn Instrument>;
}

#[cfg(test)]
pub(crate) mod recording {
  use std::sync::{Arc, Mutex};

  use super::{Instrument, InstrumentFactory, InstrumentName};
  use crate::sequence::SequenceId;
  use crate::time::ClockTime;

  pub type Plays = Arc<Mutex<Vec<(SequenceId, InstrumentName, ClockTime)>>>;

  pub struct RecordingInstrument {
    id: SequenceId,
    name: InstrumentName,
    plays: Plays,
  }

  impl Instrument for RecordingInstrument {
    fn play(&mut self, time: ClockTime) {
      self.plays.lock().unwrap().push((self.id, self.name, time));
    }
  }

  #[derive(Default)]
  pub struct RecordingFactory {
    pub plays: Plays,
  }

  impl InstrumentFactory for RecordingFactory {
    fn create(&self, id: SequenceId, name: InstrumentName) -> Box<dyn Instrument> {
      Box::new(RecordingInstrument {
        id,
        name,
        plays: self.plays.clone(),
      })
    }
  }
}

#[cfg(test)]
mod test {

  use super::InstrumentName;

  #[test]
  pub fn next_cycles_through_instruments() {
    assert_eq!(InstrumentName::Kick.next(), InstrumentName::Snare);
    assert_eq!(InstrumentName::Snare.next(), InstrumentName::Sine);
    assert_eq!(InstrumentName::Sine.next(), InstrumentName::Kick);
  }

  #[test]
  pub fn default_is_kick() {
    assert_eq!(InstrumentName::default().to_string(), "kick");
  }
}
