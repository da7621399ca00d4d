//! Audio decoding using symphonia
//!
//! Two entry points: a cheap duration probe used by input validation, and a
//! full stereo decode used to read back stems produced by the engine.

use crate::error::{Result, SplitError};
use crate::types::StereoBuffer;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

/// An opened audio track ready for packet reading
struct OpenTrack {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    params: CodecParameters,
}

fn open_track(path: &Path) -> Result<OpenTrack> {
    let file = std::fs::File::open(path)
        .map_err(|e| SplitError::decode_error(path, format!("Failed to open file: {}", e)))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Provide a hint based on file extension
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| SplitError::decode_error(path, format!("Failed to probe format: {}", e)))?;

    let format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SplitError::decode_error(path, "No audio tracks found"))?;

    let track_id = track.id;
    let params = track.codec_params.clone();

    let decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| SplitError::decode_error(path, format!("Failed to create decoder: {}", e)))?;

    Ok(OpenTrack {
        format,
        decoder,
        track_id,
        params,
    })
}

/// Walk every packet of the track, handing decoded frames to `sink`.
fn for_each_frame_block(
    path: &Path,
    track: &mut OpenTrack,
    mut sink: impl FnMut(symphonia::core::audio::AudioBufferRef<'_>),
) -> Result<()> {
    loop {
        let packet = match track.format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break; // End of stream
            }
            Err(e) => {
                return Err(SplitError::decode_error(path, format!("Failed to read packet: {}", e)));
            }
        };

        if packet.track_id() != track.track_id {
            continue;
        }

        match track.decoder.decode(&packet) {
            Ok(decoded) => sink(decoded),
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                // Skip corrupted frames
                trace!("Skipping corrupted frame: {}", e);
            }
            Err(e) => {
                return Err(SplitError::decode_error(path, format!("Decode error: {}", e)));
            }
        }
    }
    Ok(())
}

/// Duration of an audio file in seconds.
///
/// Uses the container's frame count when it has one, otherwise decodes the
/// stream and counts frames.
pub fn probe_duration(path: &Path) -> Result<f64> {
    let mut track = open_track(path)?;

    let sample_rate = track
        .params
        .sample_rate
        .filter(|&rate| rate > 0)
        .ok_or_else(|| SplitError::decode_error(path, "Unknown sample rate"))?;

    if let Some(n_frames) = track.params.n_frames {
        let duration = n_frames as f64 / sample_rate as f64;
        debug!("Probed {} from header: {:.2}s", path.display(), duration);
        return Ok(duration);
    }

    let mut frames: u64 = 0;
    for_each_frame_block(path, &mut track, |decoded| {
        frames += decoded.frames() as u64;
    })?;

    let duration = frames as f64 / sample_rate as f64;
    debug!("Probed {} by decoding: {:.2}s", path.display(), duration);
    Ok(duration)
}

/// Decode an audio file to stereo at its native sample rate
pub fn decode_stereo(path: &Path) -> Result<StereoBuffer> {
    let mut track = open_track(path)?;

    let sample_rate = track.params.sample_rate.unwrap_or(44100);
    let mut channels = track.params.channels.map(|c| c.count()).unwrap_or(2);

    debug!(
        "Decoding stereo: {} @ {}Hz, {} channels",
        path.display(),
        sample_rate,
        channels
    );

    let mut all_samples: Vec<f32> = Vec::new();
    for_each_frame_block(path, &mut track, |decoded| {
        let spec = *decoded.spec();
        channels = spec.channels.count();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        all_samples.extend(sample_buf.samples());
    })?;

    let stereo = StereoBuffer::from_interleaved(&all_samples, channels, sample_rate);

    debug!("Decoded stereo {} samples ({:.2}s)", stereo.len(), stereo.duration);

    Ok(stereo)
}
