//! WAV output using hound

use crate::error::{Result, SplitError};
use crate::types::StereoBuffer;
use std::path::Path;
use tracing::debug;

/// Write stereo audio to a 16-bit PCM WAV file
pub fn write_stereo_wav(path: &Path, audio: &StereoBuffer) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let output_error = |reason: String| SplitError::OutputError {
        path: path.to_path_buf(),
        reason,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| output_error(format!("Failed to create WAV file: {}", e)))?;

    // Write interleaved stereo samples
    for (l, r) in audio.left.iter().zip(audio.right.iter()) {
        let l_i16 = (*l * 32767.0).clamp(-32768.0, 32767.0) as i16;
        let r_i16 = (*r * 32767.0).clamp(-32768.0, 32767.0) as i16;

        writer
            .write_sample(l_i16)
            .map_err(|e| output_error(format!("Failed to write sample: {}", e)))?;
        writer
            .write_sample(r_i16)
            .map_err(|e| output_error(format!("Failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| output_error(format!("Failed to finalize WAV: {}", e)))?;

    debug!("Wrote {} frames to {}", audio.len(), path.display());
    Ok(())
}
