use std::collections::VecDeque;

use log::{debug, trace};
use serde_derive::Serialize;

use crate::cardinality::Cardinality;
use crate::time::{BeatDriftCorrection, ClockTime};

/// A beat decided ahead of time: its position within the measure and when it sounds.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub struct ScheduledBeat {
  pub index: u8,
  pub time: ClockTime,
}

/// Last beat taken out of the queue by the consumer.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub struct CurrentBeat {
  pub index: u8,
  pub time: ClockTime,
  pub played: bool,
}

///! Turns ticks into a queue of upcoming beats, filled `lookahead` ahead of the audio clock.
///!
///! The producer side (`schedule_new_beats`) only appends to the back of the queue,
///! the consumer side (`update_current_beat`) only drains from the front.
pub struct SequenceScheduler {
  measure_duration: ClockTime,
  lookahead: ClockTime,

  beat_queue: VecDeque<ScheduledBeat>,

  next_beat_index: u8,
  next_beat_time: ClockTime,
  drift_correction: BeatDriftCorrection,

  current_beat: Option<CurrentBeat>,
}

impl SequenceScheduler {
  /// The first beat is placed at the start of the measure containing `now`,
  /// so every sequence shares the same measure grid.
  pub fn new(
    measure_duration: ClockTime,
    lookahead: ClockTime,
    cardinality: &Cardinality,
    now: ClockTime,
  ) -> SequenceScheduler {
    let active = cardinality.active().get_value();
    SequenceScheduler {
      measure_duration,
      lookahead,
      beat_queue: VecDeque::new(),
      next_beat_index: 0,
      next_beat_time: now.floor_to(measure_duration),
      drift_correction: BeatDriftCorrection::new(measure_duration, active),
      current_beat: None,
    }
  }

  pub fn next_beat_index(&self) -> u8 {
    self.next_beat_index
  }

  pub fn next_beat_time(&self) -> ClockTime {
    self.next_beat_time
  }

  pub fn lookahead(&self) -> ClockTime {
    self.lookahead
  }

  pub fn current_beat(&self) -> Option<CurrentBeat> {
    self.current_beat
  }

  pub fn queued(&self) -> usize {
    self.beat_queue.len()
  }

  #[cfg(test)]
  pub(crate) fn queue(&self) -> &VecDeque<ScheduledBeat> {
    &self.beat_queue
  }

  /// Fills the queue until the next beat lies beyond `now + lookahead`.
  ///
  /// Phase always advances, but nothing is queued while paused, nor for beats that
  /// are already in the past because ticks stopped arriving for a while.
  /// Returns how many beats were queued.
  pub fn schedule_new_beats(
    &mut self,
    now: ClockTime,
    paused: bool,
    cardinality: &mut Cardinality,
  ) -> usize {
    let horizon = now + self.lookahead;
    let mut scheduled = 0;

    while self.next_beat_time < horizon {
      if !paused {
        if self.next_beat_time >= now {
          self.beat_queue.push_back(ScheduledBeat {
            index: self.next_beat_index,
            time: self.next_beat_time,
          });
          scheduled += 1;
        } else {
          trace!(
            "Skipping late beat {} at {:.3}s (now {:.3}s)",
            self.next_beat_index,
            self.next_beat_time.to_seconds(),
            now.to_seconds()
          );
        }
      }
      self.increment_beat(cardinality);
    }

    scheduled
  }

  fn increment_beat(&mut self, cardinality: &mut Cardinality) {
    // Beat counts only change where a measure starts, otherwise the grid would be torn.
    if self.next_beat_index == 0 {
      if let Some(active) = cardinality.commit() {
        debug!(
          "Beat count changed to {} at {:.3}s",
          active.get_value(),
          self.next_beat_time.to_seconds()
        );
        self.drift_correction = BeatDriftCorrection::new(self.measure_duration, active.get_value());
      }
    }

    self.next_beat_time += self.drift_correction.next();
    self.next_beat_index = (self.next_beat_index + 1) % cardinality.active().get_value();
  }

  /// Drains every beat that is due at `now`, keeping only the latest as current.
  ///
  /// Several due beats collapse into one, so a stalled consumer plays a single beat
  /// when it comes back instead of a burst.
  pub fn update_current_beat(&mut self, now: ClockTime) -> Option<CurrentBeat> {
    let mut latest = None;
    while self
      .beat_queue
      .front()
      .map_or(false, |beat| beat.time <= now)
    {
      latest = self.beat_queue.pop_front();
    }

    if let Some(beat) = latest {
      self.current_beat = Some(CurrentBeat {
        index: beat.index,
        time: beat.time,
        played: false,
      });
    }

    self.current_beat
  }

  /// Marks the current beat as played, returning it only if it was not played before.
  pub fn mark_played(&mut self) -> Option<CurrentBeat> {
    match self.current_beat.as_mut() {
      Some(beat) if !beat.played => {
        beat.played = true;
        Some(*beat)
      }
      _ => None,
    }
  }
}
