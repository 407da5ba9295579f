use std::fmt;

use failure::Fail;
use serde_derive::{Deserialize, Serialize};

use crate::cardinality::{BeatCount, Cardinality, MAX_BEAT_COUNT, MIN_BEAT_COUNT};
use crate::color::RingColor;
use crate::instrument::{Instrument, InstrumentName};
use crate::scheduler::{CurrentBeat, SequenceScheduler};
use crate::time::ClockTime;

#[derive(Debug, Fail, PartialEq, Eq)]
pub enum SequenceError {
  #[fail(display = "Beat count {} is outside of [1, 8]", requested)]
  BeatCountOutOfRange { requested: u8 },
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct SequenceId(u64);

impl SequenceId {
  pub fn new(value: u64) -> SequenceId {
    SequenceId(value)
  }

  pub fn get_value(&self) -> u64 {
    self.0
  }
}

impl fmt::Display for SequenceId {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

///! A ring: one rhythmic cycle with its own beat count, instrument and scheduler.
pub struct Sequence {
  id: SequenceId,
  color: RingColor,
  instrument_name: InstrumentName,
  instrument: Box<dyn Instrument>,

  paused: bool,
  cardinality: Cardinality,

  scheduler: SequenceScheduler,
}

impl Sequence {
  #[allow(clippy::too_many_arguments)]
  pub(crate) fn new(
    id: SequenceId,
    color: RingColor,
    instrument_name: InstrumentName,
    instrument: Box<dyn Instrument>,
    beat_count: BeatCount,
    paused: bool,
    measure_duration: ClockTime,
    lookahead: ClockTime,
    now: ClockTime,
  ) -> Sequence {
    let cardinality = Cardinality::new(beat_count);
    let scheduler = SequenceScheduler::new(measure_duration, lookahead, &cardinality, now);
    Sequence {
      id,
      color,
      instrument_name,
      instrument,
      paused,
      cardinality,
      scheduler,
    }
  }

  pub fn id(&self) -> SequenceId {
    self.id
  }

  pub fn color(&self) -> RingColor {
    self.color
  }

  pub fn set_color(&mut self, color: RingColor) {
    self.color = color;
  }

  pub fn instrument_name(&self) -> InstrumentName {
    self.instrument_name
  }

  pub(crate) fn set_instrument(&mut self, name: InstrumentName, instrument: Box<dyn Instrument>) {
    self.instrument_name = name;
    self.instrument = instrument;
  }

  pub fn is_paused(&self) -> bool {
    self.paused
  }

  pub fn set_paused(&mut self, paused: bool) {
    self.paused = paused;
  }

  pub fn toggle_paused(&mut self) -> bool {
    self.paused = !self.paused;
    self.paused
  }

  pub fn active_beat_count(&self) -> BeatCount {
    self.cardinality.active()
  }

  pub fn pending_beat_count(&self) -> Option<BeatCount> {
    self.cardinality.pending()
  }

  pub fn cardinality(&self) -> &Cardinality {
    &self.cardinality
  }

  /// Asks for a new beat count, applied when the next measure starts.
  /// Out of range requests leave the sequence untouched.
  pub fn request_beat_count(&mut self, value: u8) -> Result<BeatCount, SequenceError> {
    let count = BeatCount::new(value)?;
    self.cardinality.request(count);
    Ok(count)
  }

  pub fn increment_beat_count(&mut self) -> Result<BeatCount, SequenceError> {
    let requested = self.cardinality.requested().get_value();
    if requested >= MAX_BEAT_COUNT {
      return Err(SequenceError::BeatCountOutOfRange {
        requested: requested.saturating_add(1),
      });
    }
    self.request_beat_count(requested + 1)
  }

  pub fn decrement_beat_count(&mut self) -> Result<BeatCount, SequenceError> {
    let requested = self.cardinality.requested().get_value();
    if requested <= MIN_BEAT_COUNT {
      return Err(SequenceError::BeatCountOutOfRange {
        requested: requested.saturating_sub(1),
      });
    }
    self.request_beat_count(requested - 1)
  }

  pub fn scheduler(&self) -> &SequenceScheduler {
    &self.scheduler
  }

  pub(crate) fn schedule_new_beats(&mut self, now: ClockTime) -> usize {
    self
      .scheduler
      .schedule_new_beats(now, self.paused, &mut self.cardinality)
  }

  pub(crate) fn update_current_beat(&mut self, now: ClockTime) -> Option<CurrentBeat> {
    self.scheduler.update_current_beat(now)
  }

  /// Plays the current beat unless it was played already.
  pub(crate) fn play_current_beat(&mut self) -> Option<CurrentBeat> {
    let beat = self.scheduler.mark_played()?;
    self.instrument.play(beat.time);
    Some(beat)
  }
}
