use log::warn;

use crossbeam_channel::Sender;

use serde_derive::{Deserialize, Serialize};

use polyrhythm_core::color::RingColor;
use polyrhythm_core::consumer::Frame;
use polyrhythm_core::instrument::InstrumentName;
use polyrhythm_core::orchestrator::Direction;
use polyrhythm_core::sequence::SequenceId;
use polyrhythm_core::time::ClockTime;

use crate::server::{Message, ALL_PORTS};

/// Requests coming from the renderer.
#[derive(Deserialize, Debug, PartialEq, Clone)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
  Add {
    #[serde(default)]
    color: Option<RingColor>,
  },
  Remove {
    id: SequenceId,
  },
  Reorder {
    id: SequenceId,
    direction: Direction,
  },
  SetBeatCount {
    id: SequenceId,
    beat_count: u8,
  },
  IncrementBeatCount {
    id: SequenceId,
  },
  DecrementBeatCount {
    id: SequenceId,
  },
  SetPaused {
    id: SequenceId,
    paused: bool,
  },
  TogglePaused {
    id: SequenceId,
  },
  NextInstrument {
    id: SequenceId,
  },
  SetInstrument {
    id: SequenceId,
    instrument: InstrumentName,
  },
  NextColor {
    id: SequenceId,
  },
  StartTicks,
  StopTicks,
  Shutdown,
}

impl Command {
  pub fn from_json(data: &str) -> Result<Command, serde_json::Error> {
    serde_json::from_str(data)
  }
}

/// Notifications pushed to the renderer. Times are seconds on the audio clock.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
  Frame(Frame),
  Play {
    id: SequenceId,
    instrument: InstrumentName,
    time: ClockTime,
  },
  Added {
    id: SequenceId,
  },
  Removed {
    id: SequenceId,
  },
  Rejected {
    reason: String,
  },
}

/// Serializes events and hands them to the WebSocket router.
#[derive(Clone)]
pub struct Publisher {
  server_tx: Sender<Message>,
}

impl Publisher {
  pub fn new(server_tx: Sender<Message>) -> Publisher {
    Publisher { server_tx }
  }

  pub fn broadcast(&self, event: &Event) {
    self.send_to(ALL_PORTS, event)
  }

  pub fn send_to(&self, port: u16, event: &Event) {
    match serde_json::to_string(event) {
      Ok(data) => drop(self.server_tx.send(Message::Outgoing { port, data })),
      Err(err) => warn!("Couldn't serialize {:?}: {}", event, err),
    }
  }
}
