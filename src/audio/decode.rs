use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use super::artifact::EncodedAudio;
use super::pcm::{PcmBuffer, TARGET_SAMPLE_RATE};
use crate::error::PipelineError;

/// Decode a finalized recording into mono f32 PCM at the model's sample rate.
///
/// The container is probed using the codec tag the device reported. Only the
/// first channel is extracted; multi-channel sources are not mixed. Output is
/// always 16 kHz: resampling happens inside this operation, so callers can
/// never observe a buffer at the source rate.
pub fn decode_to_pcm(audio: &EncodedAudio) -> Result<PcmBuffer, PipelineError> {
    if audio.is_empty() {
        return Err(PipelineError::Decode("empty audio buffer".into()));
    }

    let source = MediaSourceStream::new(
        Box::new(Cursor::new(audio.bytes.clone())),
        Default::default(),
    );

    let mut hint = Hint::new();
    hint.mime_type(audio.codec.essence());
    if let Some(ext) = audio.codec.extension() {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PipelineError::Decode(format!("unrecognized container: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PipelineError::Decode("no decodable audio track".into()))?;

    let track_id = track.id;
    let source_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| PipelineError::Decode("source sample rate unknown".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PipelineError::Decode(format!("unsupported codec: {e}")))?;

    // Decoder and format reader are scoped to this function; both are
    // released on every exit path.
    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break; // end of stream
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(PipelineError::Decode(format!("read failed: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // Recoverable per-packet corruption; skip and continue.
                warn!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(PipelineError::Decode(format!("decode failed: {e}"))),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);

        let buf = sample_buf
            .get_or_insert_with(|| SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
        buf.copy_interleaved_ref(decoded);

        // First channel only; no mixing.
        samples.extend(buf.samples().iter().step_by(channels).copied());
    }

    if samples.is_empty() {
        return Err(PipelineError::Decode("container held no audio samples".into()));
    }

    let samples = resample_linear(samples, source_rate, TARGET_SAMPLE_RATE);
    let pcm = PcmBuffer::new(samples, TARGET_SAMPLE_RATE);

    debug!(
        "Decoded {} ({} bytes) -> {} samples @ {} Hz, peak {:.4}",
        audio.codec,
        audio.len(),
        pcm.len(),
        pcm.sample_rate(),
        pcm.peak_amplitude()
    );

    if pcm.is_silent() {
        warn!("Decoded audio is silent; check the capture input");
    }

    Ok(pcm)
}

/// Resample by linear interpolation. Good enough for speech input; the model
/// cares about the rate being exact, not about stopband attenuation.
fn resample_linear(samples: Vec<f32>, from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples;
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let new_len = ((samples.len() as f64) * ratio).round() as usize;
    let mut output = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_idx = i as f64 / ratio;
        let idx = src_idx.floor() as usize;
        let frac = src_idx.fract() as f32;
        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else if idx < samples.len() {
            samples[idx]
        } else {
            0.0
        };
        output.push(sample);
    }

    output
}
