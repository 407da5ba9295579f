use std::fs::File;
use std::io::Read;
use std::time::Duration;

use failure::{Error, Fail};
use serde_derive::Deserialize;

use crate::cardinality::{BeatCount, DEFAULT_BEAT_COUNT};
use crate::instrument::InstrumentName;
use crate::time::ClockTime;

#[derive(Debug, Fail, PartialEq)]
pub enum ConfigError {
  #[fail(display = "The measure duration must be at least 1 ms, found {}", value)]
  MeasureDuration { value: f64 },

  #[fail(display = "The lookahead must be positive, found {}", value)]
  Lookahead { value: f64 },

  #[fail(
    display = "The tick interval ({} ms) must be positive and shorter than the lookahead",
    value
  )]
  TickInterval { value: u64 },

  #[fail(display = "At least one sequence must be allowed")]
  MaxSequences,

  #[fail(display = "The catch up tolerance can not be negative, found {}", value)]
  CatchUpTolerance { value: f64 },

  #[fail(display = "The default beat count {} is outside of [1, 8]", value)]
  BeatCount { value: u8 },
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Engine {
  /// Seconds per measure, shared by all the sequences
  pub measure_duration: f64,
  pub max_sequences: usize,
  /// Seconds of beats decided ahead of the audio clock
  pub lookahead: f64,
  pub tick_interval_ms: u64,
  /// Seconds within which a beat still counts as happening now
  pub catch_up_tolerance: f64,
}

impl Default for Engine {
  fn default() -> Engine {
    Engine {
      measure_duration: 2.0,
      max_sequences: 5,
      lookahead: 0.1,
      tick_interval_ms: 25,
      catch_up_tolerance: 0.001,
    }
  }
}

impl Engine {
  pub fn measure_duration(&self) -> ClockTime {
    ClockTime::from_seconds(self.measure_duration)
  }

  pub fn lookahead(&self) -> ClockTime {
    ClockTime::from_seconds(self.lookahead)
  }

  pub fn tick_interval(&self) -> Duration {
    Duration::from_millis(self.tick_interval_ms)
  }

  pub fn catch_up_tolerance(&self) -> ClockTime {
    ClockTime::from_seconds(self.catch_up_tolerance)
  }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Sequences {
  pub beat_count: u8,
  pub paused: bool,
  pub instrument: InstrumentName,
}

impl Default for Sequences {
  fn default() -> Sequences {
    Sequences {
      beat_count: DEFAULT_BEAT_COUNT,
      paused: false,
      instrument: InstrumentName::Kick,
    }
  }
}

impl Sequences {
  pub fn beat_count(&self) -> BeatCount {
    BeatCount::new(self.beat_count).unwrap_or_default()
  }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
  pub engine: Engine,
  pub sequences: Sequences,
}

impl Config {
  pub fn from_file<'a, T>(path: T) -> Result<Config, Error>
  where
    T: Into<&'a str>,
  {
    let mut content = String::new();
    let path_str = path.into();
    let mut file = File::open(path_str)?;
    file.read_to_string(&mut content)?;
    Self::from_str(content.as_str())
  }

  pub fn from_str<'a, T>(content: T) -> Result<Config, Error>
  where
    T: Into<&'a str>,
  {
    let config: Config = toml::from_str(content.into())?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let engine = &self.engine;

    if !(engine.measure_duration.is_finite() && engine.measure_duration >= 0.001) {
      return Err(ConfigError::MeasureDuration {
        value: engine.measure_duration,
      });
    }

    if !(engine.lookahead.is_finite() && engine.lookahead > 0.0) {
      return Err(ConfigError::Lookahead {
        value: engine.lookahead,
      });
    }

    // Ticks have to come faster than the window drains, or the queue runs dry
    let tick_interval = engine.tick_interval_ms as f64 / 1000.0;
    if engine.tick_interval_ms == 0 || tick_interval >= engine.lookahead {
      return Err(ConfigError::TickInterval {
        value: engine.tick_interval_ms,
      });
    }

    if engine.max_sequences == 0 {
      return Err(ConfigError::MaxSequences);
    }

    if engine.catch_up_tolerance.is_nan() || engine.catch_up_tolerance < 0.0 {
      return Err(ConfigError::CatchUpTolerance {
        value: engine.catch_up_tolerance,
      });
    }

    BeatCount::new(self.sequences.beat_count).map_err(|_| ConfigError::BeatCount {
      value: self.sequences.beat_count,
    })?;

    Ok(())
  }
}

#[cfg(test)]
mod test {

  use super::{Config, ConfigError};
  use crate::instrument::InstrumentName;
  use crate::time::ClockTime;

  #[test]
  pub fn defaults() {
    let config = Config::default();
    assert_eq!(config.engine.measure_duration(), ClockTime::from_seconds(2.0));
    assert_eq!(config.engine.lookahead(), ClockTime::from_millis(100));
    assert_eq!(config.engine.tick_interval_ms, 25);
    assert_eq!(config.engine.max_sequences, 5);
    assert_eq!(config.sequences.beat_count().get_value(), 4);
    assert_eq!(config.validate(), Ok(()));
  }

  #[test]
  pub fn from_str_with_partial_sections() {
    let config = Config::from_str(
      r#"
      [engine]
      measure_duration = 3.0
      max_sequences = 3

      [sequences]
      beat_count = 3
      paused = true
      instrument = "snare"
      "#,
    )
    .unwrap();

    assert_eq!(config.engine.measure_duration, 3.0);
    assert_eq!(config.engine.max_sequences, 3);
    assert_eq!(config.engine.lookahead, 0.1);
    assert_eq!(config.sequences.beat_count, 3);
    assert!(config.sequences.paused);
    assert_eq!(config.sequences.instrument, InstrumentName::Snare);
  }

  #[test]
  pub fn from_str_ignores_other_sections() {
    let config = Config::from_str("[server]\nport = 4000\n").unwrap();
    assert_eq!(config.engine.max_sequences, 5);
  }

  #[test]
  pub fn tick_interval_must_be_shorter_than_lookahead() {
    let mut config = Config::default();
    config.engine.tick_interval_ms = 100;
    assert_eq!(
      config.validate(),
      Err(ConfigError::TickInterval { value: 100 })
    );
    assert!(Config::from_str("[engine]\ntick_interval_ms = 150\n").is_err());
  }

  #[test]
  pub fn rejects_invalid_values() {
    let mut config = Config::default();
    config.engine.measure_duration = 0.0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.engine.max_sequences = 0;
    assert_eq!(config.validate(), Err(ConfigError::MaxSequences));

    let mut config = Config::default();
    config.sequences.beat_count = 9;
    assert_eq!(config.validate(), Err(ConfigError::BeatCount { value: 9 }));

    let mut config = Config::default();
    config.engine.catch_up_tolerance = -0.5;
    assert!(config.validate().is_err());
  }
}
