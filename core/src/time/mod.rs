pub mod audio_clock;
pub mod clock;
pub mod drift_correction;

pub use self::audio_clock::{AudioClock, ManualClock, SystemAudioClock};
pub use self::clock::ClockTime;
pub use self::drift_correction::BeatDriftCorrection;
