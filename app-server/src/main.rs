use std::path::Path;

use log::{debug, info, warn};

use failure::{Error, Fail};

use crossbeam_channel::Sender;

use polyrhythm_core::config::Config;

mod config;
use crate::config::{Config as AppConfig, Startup};

mod engine;
use crate::engine::{Engine, Protocol as EngineProtocol};

mod instrument;

mod protocol;
use crate::protocol::{Command, Event, Publisher};

mod render_loop;
use crate::render_loop::RenderLoop;

mod server;
use crate::server::{Message, Server, ALL_PORTS};

const POLYRHYTHM_CONFIG: &str = "POLYRHYTHM_CONFIG";
const DEFAULT_POLYRHYTHM_CONFIG: &str = "polyrhythm.toml";

const POLYRHYTHM_LOG_CONFIG: &str = "POLYRHYTHM_LOG_CONFIG";
const DEFAULT_POLYRHYTHM_LOG_CONFIG: &str = "log4rs.yaml";

#[derive(Debug, Fail)]
enum MainError {
  #[fail(display = "Failed to init logging: {}", cause)]
  LoggingInit { cause: String },

  #[fail(display = "The engine stopped unexpectedly")]
  EngineGone,
}

fn main() -> Result<(), Error> {
  init_logging()?;

  let (config, app_config) = init_config()?;

  let server = init_server(app_config.server.port)?;

  let publisher = Publisher::new(server.sender());

  let (engine_tx, engine_rx) = Engine::new_channel();
  let engine = Engine::new(config, publisher.clone(), engine_tx, engine_rx)?;

  let render_loop = RenderLoop::new(app_config.frames.interval(), engine.sender())?;

  start_up(&engine.sender(), &app_config.startup)?;

  let result = handle_requests(&server, &engine.sender(), &publisher);

  render_loop.stop()?;

  engine.stop()?;

  server.close();

  result
}

fn init_logging() -> Result<(), Error> {
  let log_config_path = std::env::var(POLYRHYTHM_LOG_CONFIG)
    .unwrap_or_else(|_| DEFAULT_POLYRHYTHM_LOG_CONFIG.to_string());

  log4rs::init_file(log_config_path.as_str(), Default::default()).map_err(|err| {
    MainError::LoggingInit {
      cause: err.to_string(),
    }
  })?;

  Ok(())
}

fn init_config() -> Result<(Config, AppConfig), Error> {
  let config_path =
    std::env::var(POLYRHYTHM_CONFIG).unwrap_or_else(|_| DEFAULT_POLYRHYTHM_CONFIG.to_string());

  if !Path::new(config_path.as_str()).exists() {
    warn!("No configuration found at {}, using defaults", config_path);
    return Ok((Config::default(), AppConfig::default()));
  }

  info!("Loading configuration from {} ...", config_path);
  let config = Config::from_file(config_path.as_str())?;
  let app_config = AppConfig::from_file(config_path.as_str())?;
  debug!("{:#?}", config);
  debug!("{:#?}", app_config);

  Ok((config, app_config))
}

fn init_server(port: u16) -> Result<Server, Error> {
  info!("Initialising the websocket server ...");

  Server::new(port)
}

fn start_up(engine_tx: &Sender<EngineProtocol>, startup: &Startup) -> Result<(), Error> {
  info!("Creating {} sequences ...", startup.sequences);

  let add = (0..startup.sequences).map(|_| Command::Add { color: None });
  let ticks = Some(Command::StartTicks).filter(|_| startup.start_ticks);

  for command in add.chain(ticks) {
    engine_tx
      .send(EngineProtocol::Command {
        port: ALL_PORTS,
        command,
      })
      .map_err(|_| MainError::EngineGone)?;
  }

  Ok(())
}

/// Forwards client commands to the engine until one of them asks for a shutdown.
fn handle_requests(
  server: &Server,
  engine_tx: &Sender<EngineProtocol>,
  publisher: &Publisher,
) -> Result<(), Error> {
  for msg in server.receiver().iter() {
    if let Message::Incoming { port, data } = msg {
      match Command::from_json(data.as_str()) {
        Ok(Command::Shutdown) => {
          info!("Shutdown requested by {}", port);
          break;
        }
        Ok(command) => engine_tx
          .send(EngineProtocol::Command { port, command })
          .map_err(|_| MainError::EngineGone)?,
        Err(err) => {
          warn!("Invalid command from {}: {}", port, err);
          publisher.send_to(
            port,
            &Event::Rejected {
              reason: err.to_string(),
            },
          );
        }
      }
    }
  }

  Ok(())
}
