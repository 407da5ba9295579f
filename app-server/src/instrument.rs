use log::trace;

use polyrhythm_core::instrument::{Instrument, InstrumentFactory, InstrumentName};
use polyrhythm_core::sequence::SequenceId;
use polyrhythm_core::time::ClockTime;

use crate::protocol::{Event, Publisher};

/// Instrument whose sound is produced by the remote renderer: every play becomes a `play` event.
pub struct RemoteInstrument {
  id: SequenceId,
  name: InstrumentName,
  publisher: Publisher,
}

impl Instrument for RemoteInstrument {
  fn play(&mut self, time: ClockTime) {
    trace!("{} plays {} at {:.3}s", self.id, self.name, time.to_seconds());
    self.publisher.broadcast(&Event::Play {
      id: self.id,
      instrument: self.name,
      time,
    });
  }
}

pub struct RemoteInstrumentFactory {
  publisher: Publisher,
}

impl RemoteInstrumentFactory {
  pub fn new(publisher: Publisher) -> RemoteInstrumentFactory {
    RemoteInstrumentFactory { publisher }
  }
}

impl InstrumentFactory for RemoteInstrumentFactory {
  fn create(&self, id: SequenceId, name: InstrumentName) -> Box<dyn Instrument> {
    Box::new(RemoteInstrument {
      id,
      name,
      publisher: self.publisher.clone(),
    })
  }
}

#[cfg(test)]
mod test {

  use polyrhythm_core::instrument::{InstrumentFactory, InstrumentName};
  use polyrhythm_core::sequence::SequenceId;
  use polyrhythm_core::time::ClockTime;

  use super::RemoteInstrumentFactory;
  use crate::protocol::Publisher;
  use crate::server::Message;

  #[test]
  pub fn play_is_broadcast() {
    let (server_tx, server_rx) = crossbeam_channel::unbounded::<Message>();
    let factory = RemoteInstrumentFactory::new(Publisher::new(server_tx));
    let mut instrument = factory.create(SequenceId::new(3), InstrumentName::Sine);

    instrument.play(ClockTime::from_seconds(0.25));

    match server_rx.try_recv().unwrap() {
      Message::Outgoing { data, .. } => {
        assert_eq!(data, r#"{"event":"play","id":3,"instrument":"sine","time":0.25}"#)
      }
      other => panic!("Unexpected message {:?}", other),
    }
  }
}
