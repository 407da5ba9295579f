use std::time::Duration;

use failure::Fail;

#[cfg(any(target_os = "macos", target_os = "windows"))]
use audio_thread_priority::{
  demote_current_thread_from_real_time, promote_current_thread_to_real_time, RtPriorityHandle,
};

/// Nominal rate used to express a thread period as an audio buffer size.
#[cfg(any(target_os = "macos", target_os = "windows"))]
const NOMINAL_SAMPLE_RATE: u32 = 48_000;

#[derive(Debug, Fail)]
#[fail(display = "Thread could not be promoted to real time")]
pub struct RealTimePriorityError;

pub type Result<T> = std::result::Result<T, RealTimePriorityError>;

/// Keeps the current thread at real-time priority until dropped.
pub struct RealTimePriority {
  #[cfg(any(target_os = "macos", target_os = "windows"))]
  handle: Option<RtPriorityHandle>,
}

impl RealTimePriority {
  /// Promotes the calling thread for a workload that wakes up every `period`.
  pub fn promote(period: Duration) -> Result<RealTimePriority> {
    Self::promote_rt(period)
  }

  #[cfg(any(target_os = "macos", target_os = "windows"))]
  fn promote_rt(period: Duration) -> Result<RealTimePriority> {
    let frames = (period.as_millis() as u64 * NOMINAL_SAMPLE_RATE as u64 / 1000) as u32;
    promote_current_thread_to_real_time(frames.max(1), NOMINAL_SAMPLE_RATE)
      .map(|handle| RealTimePriority {
        handle: Some(handle),
      })
      .map_err(|_err| RealTimePriorityError)
  }

  #[cfg(any(target_os = "macos", target_os = "windows"))]
  fn demote_rt(&mut self) {
    self.handle.take().into_iter().for_each(|handle| {
      let _ = demote_current_thread_from_real_time(handle);
    });
  }

  #[cfg(not(any(target_os = "macos", target_os = "windows")))]
  fn promote_rt(_period: Duration) -> Result<RealTimePriority> {
    Ok(RealTimePriority {})
  }

  #[cfg(not(any(target_os = "macos", target_os = "windows")))]
  fn demote_rt(&mut self) {}
}

impl Drop for RealTimePriority {
  fn drop(&mut self) {
    self.demote_rt();
  }
}
