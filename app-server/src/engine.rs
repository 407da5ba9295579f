use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use failure::{Error, Fail};
use log::{debug, info, warn};

use crossbeam_channel::{Receiver, Select, Sender};

use polyrhythm_core::config::Config;
use polyrhythm_core::consumer::Consumer;
use polyrhythm_core::orchestrator::Orchestrator;
use polyrhythm_core::tick::{Tick, TickSource};
use polyrhythm_core::time::{AudioClock, SystemAudioClock};

use crate::instrument::RemoteInstrumentFactory;
use crate::protocol::{Command, Event, Publisher};

#[derive(Debug, Fail)]
pub enum EngineError {
  #[fail(display = "Failed to create the engine thread: {}", cause)]
  Start { cause: String },

  #[fail(display = "Failed to join the engine thread")]
  Stop,
}

pub enum Protocol {
  Stop,

  /// Time to consume due beats and publish a frame
  Frame,

  Command { port: u16, command: Command },
}

struct EngineThread {
  orchestrator: Orchestrator,
  consumer: Consumer,
  ticks: TickSource,
  publisher: Publisher,
}

impl EngineThread {
  fn new(
    config: &Config,
    clock: Arc<dyn AudioClock>,
    publisher: Publisher,
    tick_tx: Sender<Tick>,
  ) -> EngineThread {
    let instruments = Box::new(RemoteInstrumentFactory::new(publisher.clone()));
    let orchestrator = Orchestrator::new(config, clock, instruments);
    let consumer = Consumer::new(config);
    let ticks = TickSource::new(config.engine.tick_interval(), tick_tx);

    EngineThread {
      orchestrator,
      consumer,
      ticks,
      publisher,
    }
  }

  fn handle_messages(&mut self, protocol_rx: Receiver<Protocol>, tick_rx: Receiver<Tick>) {
    let mut sel = Select::new();
    let protocol_index = sel.recv(&protocol_rx);
    let tick_index = sel.recv(&tick_rx);

    loop {
      let oper = sel.select();
      match oper.index() {
        index if index == protocol_index => match oper.recv(&protocol_rx) {
          Ok(Protocol::Frame) => self.render_frame(),
          Ok(Protocol::Command { port, command }) => self.handle_command(port, command),
          Ok(Protocol::Stop) | Err(_) => break,
        },
        index if index == tick_index => {
          if oper.recv(&tick_rx).is_ok() {
            self.orchestrator.tick();
          }
        }
        _ => unreachable!(),
      }
    }

    if let Err(err) = self.ticks.stop() {
      warn!("{}", err);
    }
  }

  fn render_frame(&mut self) {
    let frame = self.consumer.frame(&mut self.orchestrator);
    self.publisher.broadcast(&Event::Frame(frame));
  }

  fn handle_command(&mut self, port: u16, command: Command) {
    debug!("Command from {}: {:?}", port, command);
    match self.execute(command) {
      Ok(Some(event)) => self.publisher.broadcast(&event),
      Ok(None) => {}
      Err(err) => {
        warn!("Rejected command from {}: {}", port, err);
        self.publisher.send_to(
          port,
          &Event::Rejected {
            reason: err.to_string(),
          },
        );
      }
    }
  }

  fn execute(&mut self, command: Command) -> Result<Option<Event>, Error> {
    let orchestrator = &mut self.orchestrator;
    let event = match command {
      Command::Add { color } => Some(Event::Added {
        id: orchestrator.add(color)?,
      }),
      Command::Remove { id } => {
        if orchestrator.remove(id) {
          Some(Event::Removed { id })
        } else {
          debug!("Nothing to remove for {}", id);
          None
        }
      }
      Command::Reorder { id, direction } => orchestrator.reorder(id, direction).map(|_| None)?,
      Command::SetBeatCount { id, beat_count } => orchestrator
        .request_beat_count(id, beat_count)
        .map(|_| None)?,
      Command::IncrementBeatCount { id } => orchestrator.increment_beat_count(id).map(|_| None)?,
      Command::DecrementBeatCount { id } => orchestrator.decrement_beat_count(id).map(|_| None)?,
      Command::SetPaused { id, paused } => orchestrator.set_paused(id, paused).map(|_| None)?,
      Command::TogglePaused { id } => orchestrator.toggle_paused(id).map(|_| None)?,
      Command::NextInstrument { id } => orchestrator.next_instrument(id).map(|_| None)?,
      Command::SetInstrument { id, instrument } => orchestrator
        .set_instrument(id, instrument)
        .map(|_| None)?,
      Command::NextColor { id } => orchestrator.next_color(id).map(|_| None)?,
      Command::StartTicks => self.ticks.start().map(|_| None)?,
      Command::StopTicks => self.ticks.stop().map(|_| None)?,
      // The request loop stops the engine itself
      Command::Shutdown => None,
    };
    Ok(event)
  }
}

///! Single worker thread owning every piece of engine state.
///!
///! Ticks, frame requests and commands are handled one at a time, so the producer
///! and consumer sides of the beat queues never run concurrently.
pub struct Engine {
  handler: JoinHandle<()>,
  protocol_tx: Sender<Protocol>,
}

impl Engine {
  pub const CHANNEL_CAPACITY: usize = 1024;

  pub fn new_channel() -> (Sender<Protocol>, Receiver<Protocol>) {
    crossbeam_channel::bounded::<Protocol>(Self::CHANNEL_CAPACITY)
  }

  pub fn new(
    config: Config,
    publisher: Publisher,
    protocol_tx: Sender<Protocol>,
    protocol_rx: Receiver<Protocol>,
  ) -> Result<Engine, EngineError> {
    info!("Starting the engine ...");

    thread::Builder::new()
      .name("engine".into())
      .spawn(move || {
        let clock = Arc::new(SystemAudioClock::new());
        let (tick_tx, tick_rx) = TickSource::new_channel();
        EngineThread::new(&config, clock, publisher, tick_tx).handle_messages(protocol_rx, tick_rx)
      })
      .map_err(|err| EngineError::Start {
        cause: err.to_string(),
      })
      .map(|handler| Engine {
        handler,
        protocol_tx,
      })
  }

  pub fn sender(&self) -> Sender<Protocol> {
    self.protocol_tx.clone()
  }

  pub fn stop(self) -> Result<(), EngineError> {
    info!("Stopping the engine ...");

    self
      .protocol_tx
      .send(Protocol::Stop)
      .map_err(|_| EngineError::Stop)
      .and_then(|()| self.handler.join().map_err(|_| EngineError::Stop))
  }
}
