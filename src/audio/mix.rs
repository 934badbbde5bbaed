//! Channel mixing between host devices and the mono stream.
//!
//! The stream itself is mono.  Devices usually are not, so capture averages
//! interleaved channels down ([`downmix_to_mono`]) and playback copies each
//! mono sample to every output channel ([`upmix_into`]).

// ---------------------------------------------------------------------------
// downmix_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging channels.
///
/// The output length is `samples.len() / channels`; a trailing partial
/// frame is ignored.  `channels == 0` yields an empty vector.
///
/// ```rust
/// use live_denoise::audio::downmix_to_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, 0.4]; // L R L R
/// let mono = downmix_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.0).abs() < 1e-6);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// upmix_into
// ---------------------------------------------------------------------------

/// Copy `mono[i]` into every channel of interleaved frame `i` of `out`.
///
/// Writes `min(mono.len(), out.len() / channels)` frames and returns that
/// count; the rest of `out` is left untouched.
pub fn upmix_into(mono: &[f32], out: &mut [f32], channels: u16) -> usize {
    if channels == 0 {
        return 0;
    }
    let mut frames = 0;
    for (frame, &sample) in out.chunks_exact_mut(channels as usize).zip(mono) {
        frame.fill(sample);
        frames += 1;
    }
    frames
}
