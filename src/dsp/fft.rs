//! Radix-2 decimation-in-time FFT.
//!
//! [`Fft`] precomputes a twiddle table for one power-of-two size and then
//! transforms buffers of exactly that size in place:
//!
//! 1. bit-reversal permutation,
//! 2. `log2(n)` butterfly stages using `W_n^k = exp(-i·2πk/n)`.
//!
//! The inverse reuses the forward pass: conjugate, forward, conjugate, divide
//! by `n`.  Buffers of the wrong length are rejected with
//! [`FftError::LengthMismatch`]; that is a caller bug, not something the
//! stream recovers from.

use std::f32::consts::PI;

use num_complex::Complex32;
use thiserror::Error;

// ---------------------------------------------------------------------------
// FftError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FftError {
    /// Transform sizes must be a power of two (and at least 2).
    #[error("FFT size {size} is not a power of two")]
    NotPowerOfTwo { size: usize },

    /// The buffer passed to a transform does not match the planned size.
    #[error("FFT buffer length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

// ---------------------------------------------------------------------------
// Fft
// ---------------------------------------------------------------------------

/// A planned transform of one fixed size.
#[derive(Debug, Clone)]
pub struct Fft {
    size: usize,
    /// `exp(-i·2πk/size)` for `k in 0..size/2`.
    twiddles: Vec<Complex32>,
}

impl Fft {
    /// Plan a transform of `size` points.
    pub fn new(size: usize) -> Result<Self, FftError> {
        if size < 2 || !size.is_power_of_two() {
            return Err(FftError::NotPowerOfTwo { size });
        }
        let twiddles = (0..size / 2)
            .map(|k| Complex32::from_polar(1.0, -2.0 * PI * k as f32 / size as f32))
            .collect();
        Ok(Self { size, twiddles })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// In-place forward transform.
    pub fn forward(&self, buf: &mut [Complex32]) -> Result<(), FftError> {
        self.check_len(buf.len())?;
        self.bit_reverse(buf);

        let n = self.size;
        let mut len = 2;
        while len <= n {
            let half = len / 2;
            let stride = n / len;
            for start in (0..n).step_by(len) {
                for k in 0..half {
                    let w = self.twiddles[k * stride];
                    let a = buf[start + k];
                    let b = buf[start + k + half] * w;
                    buf[start + k] = a + b;
                    buf[start + k + half] = a - b;
                }
            }
            len <<= 1;
        }
        Ok(())
    }

    /// In-place inverse transform, scaled by `1/n`.
    pub fn inverse(&self, buf: &mut [Complex32]) -> Result<(), FftError> {
        self.check_len(buf.len())?;
        for c in buf.iter_mut() {
            *c = c.conj();
        }
        self.forward(buf)?;
        let scale = 1.0 / self.size as f32;
        for c in buf.iter_mut() {
            *c = c.conj() * scale;
        }
        Ok(())
    }

    fn check_len(&self, actual: usize) -> Result<(), FftError> {
        if actual != self.size {
            return Err(FftError::LengthMismatch {
                expected: self.size,
                actual,
            });
        }
        Ok(())
    }

    fn bit_reverse(&self, buf: &mut [Complex32]) {
        let bits = self.size.trailing_zeros();
        for i in 0..self.size {
            let j = i.reverse_bits() >> (usize::BITS - bits);
            if j > i {
                buf.swap(i, j);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn to_complex(x: &[f32]) -> Vec<Complex32> {
        x.iter().map(|&r| Complex32::new(r, 0.0)).collect()
    }

    /// O(n²) reference transform.
    fn naive_dft(x: &[f32]) -> Vec<Complex32> {
        let n = x.len();
        (0..n)
            .map(|k| {
                x.iter()
                    .enumerate()
                    .map(|(t, &v)| {
                        Complex32::from_polar(v, -2.0 * PI * (k * t) as f32 / n as f32)
                    })
                    .sum()
            })
            .collect()
    }

    // ---- Planning ----------------------------------------------------------

    #[test]
    fn rejects_non_power_of_two() {
        assert_eq!(Fft::new(480).unwrap_err(), FftError::NotPowerOfTwo { size: 480 });
        assert!(Fft::new(0).is_err());
        assert!(Fft::new(1).is_err());
        assert!(Fft::new(512).is_ok());
    }

    #[test]
    fn rejects_wrong_buffer_length() {
        let fft = Fft::new(8).unwrap();
        let mut buf = vec![Complex32::new(0.0, 0.0); 6];
        assert_eq!(
            fft.forward(&mut buf),
            Err(FftError::LengthMismatch { expected: 8, actual: 6 })
        );
        assert!(fft.inverse(&mut buf).is_err());
    }

    // ---- Forward -----------------------------------------------------------

    #[test]
    fn impulse_has_flat_spectrum() {
        let fft = Fft::new(16).unwrap();
        let mut x = vec![0.0_f32; 16];
        x[0] = 1.0;
        let mut buf = to_complex(&x);
        fft.forward(&mut buf).unwrap();
        for c in &buf {
            assert!((c.re - 1.0).abs() < 1e-6 && c.im.abs() < 1e-6);
        }
    }

    #[test]
    fn matches_naive_dft() {
        let x: Vec<f32> = (0..32).map(|i| ((i * 7 % 11) as f32 - 5.0) / 5.0).collect();
        let fft = Fft::new(32).unwrap();
        let mut buf = to_complex(&x);
        fft.forward(&mut buf).unwrap();
        for (got, want) in buf.iter().zip(naive_dft(&x)) {
            assert!((got - want).norm() < 1e-3, "got {got}, want {want}");
        }
    }

    #[test]
    fn cosine_lands_in_its_bin() {
        let n = 64;
        let x: Vec<f32> = (0..n)
            .map(|i| (2.0 * PI * 4.0 * i as f32 / n as f32).cos())
            .collect();
        let fft = Fft::new(n).unwrap();
        let mut buf = to_complex(&x);
        fft.forward(&mut buf).unwrap();
        assert!((buf[4].norm() - n as f32 / 2.0).abs() < 1e-3);
        assert!((buf[n - 4].norm() - n as f32 / 2.0).abs() < 1e-3);
        assert!(buf[5].norm() < 1e-3);
    }

    // ---- Round trip --------------------------------------------------------

    #[test]
    fn inverse_restores_real_signal_for_all_sizes() {
        for bits in 1..=11 {
            let n = 1usize << bits;
            let x: Vec<f32> = (0..n)
                .map(|i| (i as f32 * 0.37).sin() * 0.8 + (i % 3) as f32 * 0.1)
                .collect();
            let fft = Fft::new(n).unwrap();
            let mut buf = to_complex(&x);
            fft.forward(&mut buf).unwrap();
            fft.inverse(&mut buf).unwrap();

            let peak = x.iter().fold(0.0_f32, |m, v| m.max(v.abs())).max(1e-6);
            for (orig, back) in x.iter().zip(&buf) {
                assert!((orig - back.re).abs() / peak < 1e-4, "n = {n}");
                assert!(back.im.abs() / peak < 1e-4, "n = {n}");
            }
        }
    }
}
