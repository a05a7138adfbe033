use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use hound::SampleFormat;
use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error as SymphoniaError,
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid WAV {path}: {source}")]
    Wav {
        path: PathBuf,
        source: hound::Error,
    },
    #[error("Audio decode failed for {path}: {source}")]
    Symphonia {
        path: PathBuf,
        source: SymphoniaError,
    },
    #[error("No default track in {path}")]
    NoTrack { path: PathBuf },
    #[error("Missing {what} for {path}")]
    MissingParameter { path: PathBuf, what: &'static str },
    #[error("Decoded 0 samples from {path}")]
    Empty { path: PathBuf },
    #[error("Failed to resample {path}: {source}")]
    Resample {
        path: PathBuf,
        source: super::audio::ResampleError,
    },
}

/// Raw decoded audio in interleaved samples.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f64>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }
}

/// Decode a file into interleaved samples; WAV goes through hound, anything else through
/// symphonia.
pub fn decode_audio(path: &Path) -> Result<DecodedAudio, DecodeError> {
    let decoded = if is_wav(path) {
        decode_wav(path)?
    } else {
        decode_with_symphonia(path)?
    };
    if decoded.samples.is_empty() {
        return Err(DecodeError::Empty {
            path: path.to_path_buf(),
        });
    }
    tracing::debug!(
        "Decoded {}: {} frames, {} Hz, {} channel(s)",
        path.display(),
        decoded.frames(),
        decoded.sample_rate,
        decoded.channels
    );
    Ok(decoded)
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}

fn decode_wav(path: &Path) -> Result<DecodedAudio, DecodeError> {
    let wav_error = |source| DecodeError::Wav {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = hound::WavReader::new(BufReader::new(file)).map_err(wav_error)?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|sample| sample.map(f64::from))
            .collect::<Result<Vec<_>, _>>(),
        SampleFormat::Int => {
            let scale = (1i64 << spec.bits_per_sample.saturating_sub(1)).max(1) as f64;
            reader
                .into_samples::<i32>()
                .map(|sample| sample.map(|value| value as f64 / scale))
                .collect::<Result<Vec<_>, _>>()
        }
    }
    .map_err(wav_error)?;
    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate.max(1),
        channels: spec.channels.max(1),
    })
}

fn decode_with_symphonia(path: &Path) -> Result<DecodedAudio, DecodeError> {
    let symphonia_error = |source| DecodeError::Symphonia {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(symphonia_error)?;
    let mut format = probed.format;
    let track = format.default_track().ok_or_else(|| DecodeError::NoTrack {
        path: path.to_path_buf(),
    })?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let missing = |what| DecodeError::MissingParameter {
        path: path.to_path_buf(),
        what,
    };
    let sample_rate = codec_params.sample_rate.ok_or_else(|| missing("sample rate"))?;
    let channels = codec_params
        .channels
        .ok_or_else(|| missing("channel count"))?
        .count() as u16;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(symphonia_error)?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(_)) => break,
            Err(err) => return Err(symphonia_error(err)),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let audio_buf = match decoder.decode(&packet) {
            Ok(audio_buf) => audio_buf,
            Err(SymphoniaError::DecodeError(err)) => {
                tracing::trace!("Skipping corrupt packet in {}: {err}", path.display());
                continue;
            }
            Err(err) => return Err(symphonia_error(err)),
        };
        let spec = *audio_buf.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(audio_buf.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(audio_buf);
        samples.extend(sample_buf.samples().iter().map(|&sample| f64::from(sample)));
    }

    Ok(DecodedAudio {
        samples,
        sample_rate: sample_rate.max(1),
        channels: channels.max(1),
    })
}
