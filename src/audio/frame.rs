//! Fixed-length mono sample block, the unit every stage hands to the next.
//!
//! An [`AudioFrame`] is created when the frame assembler fills, is owned by
//! exactly one stage at a time (assembler → exchange → output queue), and is
//! dropped once playback has consumed every sample.  The samples are boxed
//! so moving a frame between stages never copies audio.

/// An owned, immutable block of `f32` samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    samples: Box<[f32]>,
}

impl AudioFrame {
    /// Wrap already-owned samples without copying.
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples: samples.into_boxed_slice(),
        }
    }

    /// A frame of `len` zero samples.  Substituted for any frame the
    /// denoising engine could not deliver.
    pub fn silent(len: usize) -> Self {
        Self::new(vec![0.0; len])
    }

    /// Copy `samples` into a new frame.
    pub fn from_slice(samples: &[f32]) -> Self {
        Self::new(samples.to_vec())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    /// Give the samples back to the caller (e.g. to mutate them in a DSP stage).
    pub fn into_vec(self) -> Vec<f32> {
        self.samples.into_vec()
    }

    /// Returns `true` when every sample is exactly zero.
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0.0)
    }
}

impl From<Vec<f32>> for AudioFrame {
    fn from(samples: Vec<f32>) -> Self {
        Self::new(samples)
    }
}

impl AsRef<[f32]> for AudioFrame {
    fn as_ref(&self) -> &[f32] {
        &self.samples
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
