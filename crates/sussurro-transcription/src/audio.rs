//! WAV decoding and resampling to the 16kHz mono f32 whisper input format.

use std::io::Read;
use std::path::Path;

use crate::types::{ResultExt, TranscriptionError};

/// Sample rate whisper.cpp expects.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Decoded audio ready for inference.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Mono samples at [`WHISPER_SAMPLE_RATE`], normalized to [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Duration of the source audio in seconds.
    pub duration_seconds: f64,
}

/// Decode the WAV file at `path`.
pub fn load_wav(path: &Path) -> Result<AudioBuffer, TranscriptionError> {
    let file = std::fs::File::open(path)?;
    decode_wav(std::io::BufReader::new(file))
}

/// Decode WAV data from any reader.
///
/// Accepts PCM int (8/16/24/32-bit) and 32-bit float formats at arbitrary
/// sample rates and channel counts; multi-channel audio is averaged down to
/// mono and everything is resampled to 16kHz.
pub fn decode_wav(reader: impl Read) -> Result<AudioBuffer, TranscriptionError> {
    let mut wav = hound::WavReader::new(reader).audio_decode("parse WAV header")?;
    let spec = wav.spec();

    if spec.channels == 0 {
        return Err(TranscriptionError::AudioDecode(
            "WAV header declares zero channels".into(),
        ));
    }
    if spec.sample_rate == 0 {
        return Err(TranscriptionError::AudioDecode(
            "WAV header declares zero sample rate".into(),
        ));
    }

    let raw: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => wav
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .audio_decode("read float samples")?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(TranscriptionError::AudioDecode(format!(
                    "unsupported bit depth: {}",
                    spec.bits_per_sample
                )));
            }
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            wav.samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<_, _>>()
                .audio_decode("read int samples")?
        }
    };

    if raw.is_empty() {
        return Err(TranscriptionError::AudioDecode(
            "audio contains no samples".into(),
        ));
    }

    let mono = downmix(&raw, spec.channels);
    let duration_seconds = mono.len() as f64 / f64::from(spec.sample_rate);

    let samples = if spec.sample_rate == WHISPER_SAMPLE_RATE {
        mono
    } else {
        resample(&mono, spec.sample_rate, WHISPER_SAMPLE_RATE)
    };

    Ok(AudioBuffer {
        samples,
        duration_seconds,
    })
}

/// Average interleaved frames down to one channel.
fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let n = usize::from(channels);
    samples
        .chunks_exact(n)
        .map(|frame| frame.iter().sum::<f32>() / n as f32)
        .collect()
}

/// Simple linear interpolation resampling.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = f64::from(from_rate) / f64::from(to_rate);
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            // Rounding can push the final position to samples.len(), so
            // clamp to the last sample.
            let source_idx = (source_pos.floor() as usize).min(samples.len() - 1);
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = f64::from(samples[source_idx]);
                let right = f64::from(samples[source_idx + 1]);
                (left + (right - left) * fraction) as f32
            }
        })
        .collect()
}
