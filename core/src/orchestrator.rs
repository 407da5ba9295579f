use std::sync::Arc;

use failure::Fail;
use log::{debug, info, trace};
use serde_derive::{Deserialize, Serialize};

use crate::cardinality::BeatCount;
use crate::color::RingColor;
use crate::config::Config;
use crate::instrument::{InstrumentFactory, InstrumentName};
use crate::sequence::{Sequence, SequenceError, SequenceId};
use crate::time::{AudioClock, ClockTime};

#[derive(Debug, Fail, PartialEq, Eq)]
pub enum OrchestratorError {
  #[fail(display = "Maximum number of sequences reached: {}", max)]
  AtCapacity { max: usize },

  #[fail(display = "Unknown sequence: {}", id)]
  UnknownSequence { id: SequenceId },

  #[fail(display = "{}", cause)]
  Sequence { cause: SequenceError },
}

impl From<SequenceError> for OrchestratorError {
  fn from(cause: SequenceError) -> OrchestratorError {
    OrchestratorError::Sequence { cause }
  }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  /// Towards the front of the collection
  Up,
  Down,
}

///! Owns the active sequences and fans out every tick to their schedulers.
pub struct Orchestrator {
  measure_duration: ClockTime,
  lookahead: ClockTime,
  max_sequences: usize,
  default_beat_count: BeatCount,
  default_paused: bool,
  default_instrument: InstrumentName,

  clock: Arc<dyn AudioClock>,
  instruments: Box<dyn InstrumentFactory>,

  sequences: Vec<Sequence>,
  next_id: u64,
}

impl Orchestrator {
  pub fn new(
    config: &Config,
    clock: Arc<dyn AudioClock>,
    instruments: Box<dyn InstrumentFactory>,
  ) -> Orchestrator {
    Orchestrator {
      measure_duration: config.engine.measure_duration(),
      lookahead: config.engine.lookahead(),
      max_sequences: config.engine.max_sequences,
      default_beat_count: config.sequences.beat_count(),
      default_paused: config.sequences.paused,
      default_instrument: config.sequences.instrument,
      clock,
      instruments,
      sequences: Vec::new(),
      next_id: 0,
    }
  }

  pub fn now(&self) -> ClockTime {
    self.clock.now()
  }

  pub fn len(&self) -> usize {
    self.sequences.len()
  }

  pub fn is_empty(&self) -> bool {
    self.sequences.is_empty()
  }

  pub fn is_full(&self) -> bool {
    self.sequences.len() >= self.max_sequences
  }

  #[cfg(test)]
  pub(crate) fn ids(&self) -> Vec<SequenceId> {
    self.sequences.iter().map(Sequence::id).collect()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Sequence> {
    self.sequences.iter()
  }

  pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Sequence> {
    self.sequences.iter_mut()
  }

  pub fn sequence(&self, id: SequenceId) -> Option<&Sequence> {
    self.sequences.iter().find(|sequence| sequence.id() == id)
  }

  pub fn position(&self, id: SequenceId) -> Option<usize> {
    self.sequences.iter().position(|sequence| sequence.id() == id)
  }

  fn sequence_mut(&mut self, id: SequenceId) -> OrchestratorResult<&mut Sequence> {
    self
      .sequences
      .iter_mut()
      .find(|sequence| sequence.id() == id)
      .ok_or(OrchestratorError::UnknownSequence { id })
  }

  pub fn add(&mut self, color_hint: Option<RingColor>) -> OrchestratorResult<SequenceId> {
    if self.is_full() {
      return Err(OrchestratorError::AtCapacity {
        max: self.max_sequences,
      });
    }

    let id = SequenceId::new(self.next_id);
    self.next_id += 1;

    let used: Vec<RingColor> = self.sequences.iter().map(Sequence::color).collect();
    let color = RingColor::pick(color_hint, &used);
    let instrument = self.instruments.create(id, self.default_instrument);

    let sequence = Sequence::new(
      id,
      color,
      self.default_instrument,
      instrument,
      self.default_beat_count,
      self.default_paused,
      self.measure_duration,
      self.lookahead,
      self.clock.now(),
    );
    self.sequences.push(sequence);

    debug!("Added sequence {} ({})", id, color);
    Ok(id)
  }

  /// Dropping the sequence drops its scheduler, so nothing it had queued can play anymore.
  pub fn remove(&mut self, id: SequenceId) -> bool {
    match self.position(id) {
      Some(index) => {
        let sequence = self.sequences.remove(index);
        debug!(
          "Removed sequence {} discarding {} queued beats",
          id,
          sequence.scheduler().queued()
        );
        true
      }
      None => false,
    }
  }

  /// Swaps a sequence with its neighbour. Only the display order changes.
  pub fn reorder(&mut self, id: SequenceId, direction: Direction) -> OrchestratorResult<bool> {
    let index = self
      .position(id)
      .ok_or(OrchestratorError::UnknownSequence { id })?;

    let other = match direction {
      Direction::Up if index > 0 => index - 1,
      Direction::Down if index + 1 < self.sequences.len() => index + 1,
      _ => return Ok(false),
    };

    self.sequences.swap(index, other);
    Ok(true)
  }

  pub fn tick(&mut self) {
    let now = self.clock.now();
    let scheduled: usize = self
      .sequences
      .iter_mut()
      .map(|sequence| sequence.schedule_new_beats(now))
      .sum();
    if scheduled > 0 {
      trace!("Scheduled {} beats at {:.3}s", scheduled, now.to_seconds());
    }
  }

  pub fn set_paused(&mut self, id: SequenceId, paused: bool) -> OrchestratorResult<bool> {
    let sequence = self.sequence_mut(id)?;
    sequence.set_paused(paused);
    Ok(paused)
  }

  pub fn toggle_paused(&mut self, id: SequenceId) -> OrchestratorResult<bool> {
    self.sequence_mut(id).map(Sequence::toggle_paused)
  }

  pub fn request_beat_count(&mut self, id: SequenceId, value: u8) -> OrchestratorResult<BeatCount> {
    Ok(self.sequence_mut(id)?.request_beat_count(value)?)
  }

  pub fn increment_beat_count(&mut self, id: SequenceId) -> OrchestratorResult<BeatCount> {
    Ok(self.sequence_mut(id)?.increment_beat_count()?)
  }

  pub fn decrement_beat_count(&mut self, id: SequenceId) -> OrchestratorResult<BeatCount> {
    Ok(self.sequence_mut(id)?.decrement_beat_count()?)
  }

  pub fn set_instrument(
    &mut self,
    id: SequenceId,
    name: InstrumentName,
  ) -> OrchestratorResult<InstrumentName> {
    self.sequence_mut(id)?;
    let instrument = self.instruments.create(id, name);
    self.sequence_mut(id)?.set_instrument(name, instrument);
    info!("Sequence {} now plays {}", id, name);
    Ok(name)
  }

  pub fn next_instrument(&mut self, id: SequenceId) -> OrchestratorResult<InstrumentName> {
    let next = self.sequence_mut(id)?.instrument_name().next();
    self.set_instrument(id, next)
  }

  pub fn next_color(&mut self, id: SequenceId) -> OrchestratorResult<RingColor> {
    let sequence = self.sequence_mut(id)?;
    let color = sequence.color().next();
    sequence.set_color(color);
    Ok(color)
  }
}
