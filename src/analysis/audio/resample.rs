use rubato::{FftFixedInOut, Resampler};
use thiserror::Error;

/// Input frames handed to the resampler per call; rubato rounds this to fit the rate ratio.
const CHUNK_FRAMES: usize = 1024;

#[derive(Debug, Error)]
pub enum ResampleError {
    /// The rate pair could not be turned into a resampler.
    #[error("Cannot resample {input_rate} Hz to {output_rate} Hz: {source}")]
    Construction {
        input_rate: u32,
        output_rate: u32,
        source: rubato::ResamplerConstructionError,
    },
    /// Processing a chunk failed.
    #[error("Resampling failed: {0}")]
    Process(#[from] rubato::ResampleError),
}

/// Band-limited resampler; output length is the input duration at `output_rate`.
///
/// Content above the lower of the two Nyquist frequencies is filtered out before the rate
/// change, so nothing folds back into the analysis band.
pub(crate) fn resample(
    samples: &[f64],
    input_rate: u32,
    output_rate: u32,
) -> Result<Vec<f64>, ResampleError> {
    let input_rate = input_rate.max(1);
    let output_rate = output_rate.max(1);
    if samples.is_empty() || input_rate == output_rate {
        return Ok(samples.to_vec());
    }
    let mut resampler =
        FftFixedInOut::<f64>::new(input_rate as usize, output_rate as usize, CHUNK_FRAMES, 1)
            .map_err(|source| ResampleError::Construction {
                input_rate,
                output_rate,
                source,
            })?;

    let expected = ((samples.len() as f64 * output_rate as f64 / input_rate as f64).round()
        as usize)
        .max(1);
    let delay = resampler.output_delay();
    let chunk = resampler.input_frames_next();
    let mut out = Vec::with_capacity(expected + delay + resampler.output_frames_next());
    let mut input = vec![0.0; chunk];
    let mut pos = 0usize;
    // Zero chunks past the end flush the filter delay.
    while out.len() < expected + delay {
        input.fill(0.0);
        if pos < samples.len() {
            let end = (pos + chunk).min(samples.len());
            input[..end - pos].copy_from_slice(&samples[pos..end]);
        }
        pos += chunk;
        let processed = resampler.process(std::slice::from_ref(&input), None)?;
        if let Some(channel) = processed.into_iter().next() {
            out.extend(channel);
        }
    }
    out.drain(..delay.min(out.len()));
    out.truncate(expected);
    Ok(out)
}
