use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use failure::Fail;
use log::{debug, info, trace, warn};

use crossbeam_channel::{Receiver, Select, Sender, TrySendError};

use crate::realtime_thread::RealTimePriority;

/// Ticks waiting to be handled before new ones get dropped.
const TICK_CHANNEL_CAPACITY: usize = 4;

#[derive(Debug, Fail)]
pub enum TickSourceError {
  #[fail(display = "Failed to create the tick source thread: {}", cause)]
  Start { cause: String },

  #[fail(display = "Failed to join the tick source thread")]
  Stop,
}

/// Pulse asking the engine to refill the lookahead window.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Tick(pub u64);

struct Running {
  stop_tx: Sender<()>,
  handler: JoinHandle<()>,
}

///! Timer driven pulse on its own thread, independent from the render loop.
pub struct TickSource {
  interval: Duration,
  tick_tx: Sender<Tick>,
  running: Option<Running>,
}

impl TickSource {
  pub fn new_channel() -> (Sender<Tick>, Receiver<Tick>) {
    crossbeam_channel::bounded::<Tick>(TICK_CHANNEL_CAPACITY)
  }

  pub fn new(interval: Duration, tick_tx: Sender<Tick>) -> TickSource {
    TickSource {
      interval,
      tick_tx,
      running: None,
    }
  }

  pub fn is_running(&self) -> bool {
    self.running.is_some()
  }

  pub fn start(&mut self) -> Result<(), TickSourceError> {
    if self.running.is_some() {
      return Ok(());
    }

    info!("Starting ticks every {:?} ...", self.interval);

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    let interval = self.interval;
    let tick_tx = self.tick_tx.clone();

    let handler = thread::Builder::new()
      .name("tick-source".into())
      .spawn(move || TickThread::new(interval, tick_tx).run(stop_rx))
      .map_err(|err| TickSourceError::Start {
        cause: err.to_string(),
      })?;

    self.running = Some(Running { stop_tx, handler });
    Ok(())
  }

  /// Halts the pulse. Beats already scheduled stay queued.
  pub fn stop(&mut self) -> Result<(), TickSourceError> {
    match self.running.take() {
      Some(Running { stop_tx, handler }) => {
        info!("Stopping ticks ...");
        let _ = stop_tx.send(());
        handler.join().map_err(|_| TickSourceError::Stop)
      }
      None => Ok(()),
    }
  }
}

impl Drop for TickSource {
  fn drop(&mut self) {
    drop(self.stop());
  }
}

struct TickThread {
  interval: Duration,
  tick_tx: Sender<Tick>,
  count: u64,
  _rt_priority: Option<RealTimePriority>,
}

impl TickThread {
  fn new(interval: Duration, tick_tx: Sender<Tick>) -> TickThread {
    let _rt_priority = Self::promote_to_real_time(interval);
    TickThread {
      interval,
      tick_tx,
      count: 0,
      _rt_priority,
    }
  }

  fn run(&mut self, stop_rx: Receiver<()>) {
    let ticker = crossbeam_channel::tick(self.interval);

    let mut sel = Select::new();
    let stop_index = sel.recv(&stop_rx);
    let tick_index = sel.recv(&ticker);

    loop {
      let oper = sel.select();
      match oper.index() {
        index if index == stop_index => {
          let _ = oper.recv(&stop_rx);
          break;
        }
        index if index == tick_index => {
          if oper.recv(&ticker).is_ok() && !self.send_tick() {
            break;
          }
        }
        _ => unreachable!(),
      }
    }

    debug!("Tick source sent {} ticks", self.count);
  }

  /// Returns false once nobody listens anymore.
  fn send_tick(&mut self) -> bool {
    match self.tick_tx.try_send(Tick(self.count)) {
      Ok(()) => {
        self.count += 1;
        true
      }
      Err(TrySendError::Full(tick)) => {
        trace!("Dropping tick {}, the engine is busy", tick.0);
        true
      }
      Err(TrySendError::Disconnected(_)) => false,
    }
  }

  fn promote_to_real_time(interval: Duration) -> Option<RealTimePriority> {
    match RealTimePriority::promote(interval) {
      Ok(rt_priority) => {
        debug!("Tick thread has now real-time priority");
        Some(rt_priority)
      }
      Err(err) => {
        warn!("Couldn't promote the tick thread into real time: {}", err);
        None
      }
    }
  }
}

#[cfg(test)]
mod test {

  use std::time::Duration;

  use super::TickSource;

  #[test]
  pub fn started_source_delivers_ticks() {
    let (tick_tx, tick_rx) = TickSource::new_channel();
    let mut source = TickSource::new(Duration::from_millis(5), tick_tx);
    source.start().unwrap();

    let first = tick_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    let second = tick_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(second.0 > first.0);

    source.stop().unwrap();
  }

  #[test]
  pub fn start_and_stop_are_idempotent() {
    let (tick_tx, tick_rx) = TickSource::new_channel();
    let mut source = TickSource::new(Duration::from_millis(5), tick_tx);
    assert!(!source.is_running());
    assert!(source.stop().is_ok());

    source.start().unwrap();
    source.start().unwrap();
    assert!(source.is_running());

    source.stop().unwrap();
    source.stop().unwrap();
    assert!(!source.is_running());

    while tick_rx.try_recv().is_ok() {}
    assert!(tick_rx.try_recv().is_err());
  }

  #[test]
  pub fn restarts_after_stop() {
    let (tick_tx, tick_rx) = TickSource::new_channel();
    let mut source = TickSource::new(Duration::from_millis(5), tick_tx);
    source.start().unwrap();
    source.stop().unwrap();
    while tick_rx.try_recv().is_ok() {}

    source.start().unwrap();
    assert!(tick_rx.recv_timeout(Duration::from_secs(2)).is_ok());
  }
}
