pub mod beats;

pub use self::beats::BeatDriftCorrection;
