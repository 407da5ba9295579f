use std::fs::File;
use std::io::Read;
use std::time::Duration;

use failure::Error;

use serde_derive::Deserialize;

/// Server side settings, read from the same file as the engine ones.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
  pub server: Server,
  pub frames: Frames,
  pub startup: Startup,
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
    Ok(config)
  }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Server {
  pub port: u16,
}

impl Default for Server {
  fn default() -> Server {
    Server { port: 3001 }
  }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Frames {
  pub interval_ms: u64,
}

impl Default for Frames {
  fn default() -> Frames {
    Frames { interval_ms: 16 }
  }
}

impl Frames {
  pub fn interval(&self) -> Duration {
    Duration::from_millis(self.interval_ms.max(1))
  }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Startup {
  /// Rings created as soon as the engine is up
  pub sequences: usize,
  pub start_ticks: bool,
}

impl Default for Startup {
  fn default() -> Startup {
    Startup {
      sequences: 2,
      start_ticks: true,
    }
  }
}

#[cfg(test)]
mod test {

  use std::time::Duration;

  use super::Config;

  #[test]
  pub fn defaults() {
    let config = Config::from_str("").unwrap();
    assert_eq!(config.server.port, 3001);
    assert_eq!(config.frames.interval(), Duration::from_millis(16));
    assert_eq!(config.startup.sequences, 2);
    assert!(config.startup.start_ticks);
  }

  #[test]
  pub fn shares_the_file_with_the_engine() {
    let config = Config::from_str(
      r#"
      [engine]
      measure_duration = 2.0

      [server]
      port = 4242

      [startup]
      sequences = 0
      start_ticks = false
      "#,
    )
    .unwrap();
    assert_eq!(config.server.port, 4242);
    assert_eq!(config.frames.interval_ms, 16);
    assert_eq!(config.startup.sequences, 0);
    assert!(!config.startup.start_ticks);
  }
}
