use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use failure::Fail;
use log::{debug, info, trace};

use crossbeam_channel::{Select, Sender, TrySendError};

use crate::engine::Protocol as EngineProtocol;

#[derive(Debug, Fail)]
pub enum RenderLoopError {
  #[fail(display = "Failed to create the render loop thread: {}", cause)]
  Start { cause: String },

  #[fail(display = "Failed to join the render loop thread")]
  Stop,
}

///! Asks the engine for a frame at display rate.
///!
///! A frame request is skipped when the engine is still busy, which is what a
///! throttled display would do too.
pub struct RenderLoop {
  handler: JoinHandle<()>,
  stop_tx: Sender<()>,
}

impl RenderLoop {
  pub fn new(
    interval: Duration,
    engine_tx: Sender<EngineProtocol>,
  ) -> Result<RenderLoop, RenderLoopError> {
    info!("Starting the render loop every {:?} ...", interval);

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

    thread::Builder::new()
      .name("render-loop".into())
      .spawn(move || {
        let ticker = crossbeam_channel::tick(interval);

        let mut sel = Select::new();
        let stop_index = sel.recv(&stop_rx);
        let ticker_index = sel.recv(&ticker);

        let mut skipped = 0u64;
        loop {
          let oper = sel.select();
          match oper.index() {
            index if index == stop_index => {
              let _ = oper.recv(&stop_rx);
              break;
            }
            index if index == ticker_index => {
              if oper.recv(&ticker).is_err() {
                continue;
              }
              match engine_tx.try_send(EngineProtocol::Frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                  skipped += 1;
                  trace!("Skipped a frame, the engine is busy");
                }
                Err(TrySendError::Disconnected(_)) => break,
              }
            }
            _ => unreachable!(),
          }
        }

        debug!("Render loop finished, {} frames skipped", skipped);
      })
      .map_err(|err| RenderLoopError::Start {
        cause: err.to_string(),
      })
      .map(|handler| RenderLoop { handler, stop_tx })
  }

  pub fn stop(self) -> Result<(), RenderLoopError> {
    info!("Stopping the render loop ...");

    let _ = self.stop_tx.send(());
    self.handler.join().map_err(|_| RenderLoopError::Stop)
  }
}
