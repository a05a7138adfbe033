/// Average interleaved channels into one; non-finite samples count as silence.
pub(crate) fn downmix_to_mono_into(out: &mut Vec<f64>, samples: &[f64], channels: u16) {
    let channels = channels.max(1) as usize;
    out.clear();
    if channels == 1 {
        out.extend(samples.iter().copied().map(sanitize_sample));
        return;
    }
    let frames = samples.len() / channels;
    out.reserve(frames);
    for frame in samples.chunks_exact(channels) {
        let sum: f64 = frame.iter().copied().map(sanitize_sample).sum();
        out.push(sum / channels as f64);
    }
}

pub(crate) fn downmix_to_mono(samples: &[f64], channels: u16) -> Vec<f64> {
    let mut out = Vec::new();
    downmix_to_mono_into(&mut out, samples, channels);
    out
}

fn sanitize_sample(sample: f64) -> f64 {
    if sample.is_finite() { sample } else { 0.0 }
}
