//! DSP helpers for the Streaming Engine (§4.E): loudness normalization and
//! linear fade ramps. `estimate_loudness`/`apply_gain` are a documented
//! approximation of EBU R128 (mean-square energy rather than a true
//! K-weighted two-pass loudnorm) — see DESIGN.md's open-question log.

pub const OUTPUT_SAMPLE_RATE: u32 = 44100;
pub const OUTPUT_CHANNELS: usize = 2;

const TARGET_LUFS_MUSIC: f32 = -16.0;
const TARGET_LUFS_SPEECH: f32 = -14.0;
/// Clamp applied gain so a near-silent or clipped-flat asset can't produce
/// an absurd multiplier.
const MAX_GAIN_DB: f32 = 24.0;

/// Mean-square-energy loudness estimate, expressed in LUFS-like dB.
pub fn estimate_loudness(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return -70.0;
    }
    let mean_square: f32 = samples.iter().map(|&s| s * s).sum::<f32>() / samples.len() as f32;
    if mean_square <= 0.0 {
        return -70.0;
    }
    10.0 * mean_square.log10()
}

/// Scale `samples` in place so their estimated loudness hits the target
/// for `is_speech`.
pub fn normalize_loudness(samples: &mut [f32], is_speech: bool) {
    let target = if is_speech { TARGET_LUFS_SPEECH } else { TARGET_LUFS_MUSIC };
    let current = estimate_loudness(samples);
    let gain_db = (target - current).clamp(-MAX_GAIN_DB, MAX_GAIN_DB);
    let gain = 10f32.powf(gain_db / 20.0);
    for s in samples.iter_mut() {
        *s = (*s * gain).clamp(-1.0, 1.0);
    }
}

/// Apply a linear fade-in over the first `fade_secs` seconds of
/// interleaved PCM.
pub fn fade_in(samples: &mut [f32], fade_secs: f32) {
    let fade_samples = (fade_secs * OUTPUT_SAMPLE_RATE as f32) as usize * OUTPUT_CHANNELS;
    let fade_samples = fade_samples.min(samples.len());
    let frames = fade_samples / OUTPUT_CHANNELS;
    for frame in 0..frames {
        let t = frame as f32 / frames.max(1) as f32;
        for ch in 0..OUTPUT_CHANNELS {
            samples[frame * OUTPUT_CHANNELS + ch] *= t;
        }
    }
}

/// Apply a linear fade-out over the last `fade_secs` seconds of
/// interleaved PCM.
pub fn fade_out(samples: &mut [f32], fade_secs: f32) {
    let fade_samples = (fade_secs * OUTPUT_SAMPLE_RATE as f32) as usize * OUTPUT_CHANNELS;
    let fade_samples = fade_samples.min(samples.len());
    let frames = fade_samples / OUTPUT_CHANNELS;
    let total_frames = samples.len() / OUTPUT_CHANNELS;
    for i in 0..frames {
        let frame = total_frames - frames + i;
        let t = 1.0 - (i as f32 / frames.max(1) as f32);
        for ch in 0..OUTPUT_CHANNELS {
            samples[frame * OUTPUT_CHANNELS + ch] *= t;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_in_starts_at_silence() {
        let mut samples = vec![1.0f32; OUTPUT_CHANNELS * OUTPUT_SAMPLE_RATE as usize];
        fade_in(&mut samples, 1.0);
        assert!(samples[0].abs() < 0.001);
        assert!((samples[samples.len() - 1] - 1.0).abs() < 0.01);
    }

    #[test]
    fn fade_out_ends_at_silence() {
        let mut samples = vec![1.0f32; OUTPUT_CHANNELS * OUTPUT_SAMPLE_RATE as usize];
        fade_out(&mut samples, 1.0);
        assert!(samples[samples.len() - 1].abs() < 0.01);
    }

    #[test]
    fn normalize_raises_quiet_signal() {
        let mut samples = vec![0.01f32; 4410];
        let before = estimate_loudness(&samples);
        normalize_loudness(&mut samples, false);
        let after = estimate_loudness(&samples);
        assert!(after > before);
    }
}
