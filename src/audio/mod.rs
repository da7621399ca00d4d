//! Audio probing, decoding and WAV output

pub mod decoder;
pub mod wav;

pub use decoder::{decode_stereo, probe_duration};
pub use wav::write_stereo_wav;
