use std::collections::HashMap;

use log::trace;
use serde_derive::Serialize;

use crate::color::RingColor;
use crate::config::Config;
use crate::instrument::InstrumentName;
use crate::orchestrator::Orchestrator;
use crate::sequence::SequenceId;
use crate::time::ClockTime;

#[derive(Debug, PartialEq, Clone, Copy, Serialize)]
pub struct BeatFrame {
  pub index: u8,
  pub time: ClockTime,
}

/// What the renderer needs to draw one ring.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct RingFrame {
  pub id: SequenceId,
  pub position: usize,
  pub color: RingColor,
  pub instrument: InstrumentName,
  pub active_beat_count: u8,
  pub pending_beat_count: Option<u8>,
  pub paused: bool,
  pub current_beat: Option<BeatFrame>,
  /// Whether the instrument was triggered while building this frame
  pub played: bool,
  pub flash: bool,
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Frame {
  pub time: ClockTime,
  /// Elapsed fraction of the current measure, in [0, 1)
  pub progress: f64,
  pub rings: Vec<RingFrame>,
}

///! Playback side of the engine, driven once per display frame.
///!
///! Frames may arrive late or not at all; every beat due since the last frame
///! collapses into a single playback.
pub struct Consumer {
  measure_duration: ClockTime,
  catch_up_tolerance: ClockTime,
  rendered: HashMap<SequenceId, BeatFrame>,
}

impl Consumer {
  pub fn new(config: &Config) -> Consumer {
    Consumer {
      measure_duration: config.engine.measure_duration(),
      catch_up_tolerance: config.engine.catch_up_tolerance(),
      rendered: HashMap::new(),
    }
  }

  pub fn frame(&mut self, orchestrator: &mut Orchestrator) -> Frame {
    let now = orchestrator.now();
    let mut rings = Vec::with_capacity(orchestrator.len());

    for (position, sequence) in orchestrator.iter_mut().enumerate() {
      let id = sequence.id();
      let current = sequence.update_current_beat(now);
      let played = sequence.play_current_beat();

      if let Some(beat) = played {
        trace!(
          "Sequence {} played beat {} at {:.3}s (now {:.3}s)",
          id,
          beat.index,
          beat.time.to_seconds(),
          now.to_seconds()
        );
      }

      let current_beat = current.map(|beat| BeatFrame {
        index: beat.index,
        time: beat.time,
      });

      let flash = match current_beat {
        Some(beat) => {
          let changed = self.rendered.insert(id, beat) != Some(beat);
          changed || now.saturating_sub(beat.time) <= self.catch_up_tolerance
        }
        None => false,
      };

      rings.push(RingFrame {
        id,
        position,
        color: sequence.color(),
        instrument: sequence.instrument_name(),
        active_beat_count: sequence.active_beat_count().get_value(),
        pending_beat_count: sequence.pending_beat_count().map(|count| count.get_value()),
        paused: sequence.is_paused(),
        current_beat,
        played: played.is_some(),
        flash,
      });
    }

    self.rendered.retain(|id, _| rings.iter().any(|ring| ring.id == *id));

    Frame {
      time: now,
      progress: self.progress(now),
      rings,
    }
  }

  fn progress(&self, now: ClockTime) -> f64 {
    let measure = self.measure_duration.units();
    if measure == 0 {
      return 0.0;
    }
    (now.units() % measure) as f64 / measure as f64
  }
}

#[cfg(test)]
mod test {

  use std::sync::Arc;

  use super::Consumer;
  use crate::config::Config;
  use crate::instrument::recording::{Plays, RecordingFactory};
  use crate::instrument::InstrumentName;
  use crate::orchestrator::Orchestrator;
  use crate::sequence::SequenceId;
  use crate::time::{ClockTime, ManualClock};

  fn seconds(value: f64) -> ClockTime {
    ClockTime::from_seconds(value)
  }

  fn engine() -> (Orchestrator, Consumer, Arc<ManualClock>, Plays) {
    let config = Config::default();
    let clock = Arc::new(ManualClock::new());
    let factory = RecordingFactory::default();
    let plays = factory.plays.clone();
    let orchestrator = Orchestrator::new(&config, clock.clone(), Box::new(factory));
    (orchestrator, Consumer::new(&config), clock, plays)
  }

  /// Advances the clock in tick sized steps, ticking on every step.
  fn run_ticks(orchestrator: &mut Orchestrator, clock: &ManualClock, until: f64) {
    let step = ClockTime::from_millis(25);
    while clock_seconds(orchestrator) < until {
      clock.advance(step);
      orchestrator.tick();
    }
  }

  fn clock_seconds(orchestrator: &Orchestrator) -> f64 {
    orchestrator.now().to_seconds()
  }

  #[test]
  pub fn plays_due_beat_once() {
    let (mut orchestrator, mut consumer, clock, plays) = engine();
    let id = orchestrator.add(None).unwrap();

    run_ticks(&mut orchestrator, &clock, 0.5);
    let frame = consumer.frame(&mut orchestrator);
    assert_eq!(frame.rings.len(), 1);
    assert!(frame.rings[0].played);
    assert!(frame.rings[0].flash);
    assert_eq!(frame.rings[0].current_beat.map(|b| b.index), Some(1));

    clock.advance(ClockTime::from_millis(16));
    let frame = consumer.frame(&mut orchestrator);
    assert!(!frame.rings[0].played);
    assert!(!frame.rings[0].flash);

    assert_eq!(*plays.lock().unwrap(), vec![(id, InstrumentName::Kick, seconds(0.5))]);
  }

  #[test]
  pub fn stalled_frames_coalesce_into_one_play() {
    let (mut orchestrator, mut consumer, clock, plays) = engine();
    orchestrator.add(None).unwrap();

    // Beats at 0.5, 1.0 and 1.5 are all queued while no frame is rendered
    run_ticks(&mut orchestrator, &clock, 1.6);
    let frame = consumer.frame(&mut orchestrator);
    assert_eq!(frame.rings[0].current_beat.map(|b| b.index), Some(3));
    assert_eq!(frame.rings[0].current_beat.map(|b| b.time), Some(seconds(1.5)));

    let plays = plays.lock().unwrap();
    assert_eq!(plays.len(), 1);
    assert_eq!(plays[0].2, seconds(1.5));
  }

  #[test]
  pub fn paused_sequences_do_not_play() {
    let (mut orchestrator, mut consumer, clock, plays) = engine();
    let id = orchestrator.add(None).unwrap();
    orchestrator.set_paused(id, true).unwrap();

    run_ticks(&mut orchestrator, &clock, 1.0);
    let frame = consumer.frame(&mut orchestrator);
    assert!(frame.rings[0].paused);
    assert!(!frame.rings[0].played);
    assert!(plays.lock().unwrap().is_empty());
  }

  #[test]
  pub fn frame_reports_display_order_and_progress() {
    let (mut orchestrator, mut consumer, clock, _) = engine();
    let first = orchestrator.add(None).unwrap();
    let second = orchestrator.add(None).unwrap();
    orchestrator.request_beat_count(second, 3).unwrap();

    clock.set_seconds(2.5);
    let frame = consumer.frame(&mut orchestrator);
    assert_eq!(frame.time, seconds(2.5));
    assert!((frame.progress - 0.25).abs() < 1e-9);

    let ids: Vec<SequenceId> = frame.rings.iter().map(|ring| ring.id).collect();
    assert_eq!(ids, vec![first, second]);
    assert_eq!(frame.rings[1].position, 1);
    assert_eq!(frame.rings[1].active_beat_count, 4);
    assert_eq!(frame.rings[1].pending_beat_count, Some(3));
  }

  #[test]
  pub fn removed_sequences_disappear_from_frames() {
    let (mut orchestrator, mut consumer, clock, plays) = engine();
    let first = orchestrator.add(None).unwrap();
    let second = orchestrator.add(None).unwrap();

    run_ticks(&mut orchestrator, &clock, 0.45);
    assert!(orchestrator.remove(first));

    clock.set_seconds(0.5);
    let frame = consumer.frame(&mut orchestrator);
    assert_eq!(frame.rings.len(), 1);
    assert_eq!(frame.rings[0].id, second);

    let plays = plays.lock().unwrap();
    assert_eq!(plays.len(), 1);
    assert_eq!(plays[0].0, second);
  }
}
