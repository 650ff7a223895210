//! Per-epoch batching over the extracted sample pools.
use candle_core::{Device, Tensor};
use ndarray::{Array5, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::augment::augment;
use super::{pool_to_tensor, BatchSource};

/// Holds the extracted `(N, Z, Y, X, 1)` sample pools and serves augmented
/// batches through a per-epoch index permutation.
///
/// The permutation is frozen for the duration of an epoch: `batch` reads the
/// same index slice every time it is called with the same argument, and only
/// [`EpochData::on_epoch_end`] reshuffles.
pub struct EpochData {
    x: Array5<f32>,
    y: Array5<f32>,
    batch_size: usize,
    perm: Vec<usize>,
    rng: StdRng,
}

impl EpochData {
    /// Create a provider over paired sample pools.
    ///
    /// The generator drives the initial permutation, every reshuffle and the
    /// per-batch augmentation, so a fixed seed reproduces the whole epoch
    /// stream.
    pub fn new(
        x: Array5<f32>,
        y: Array5<f32>,
        batch_size: usize,
        mut rng: StdRng,
    ) -> crate::Result<Self> {
        if x.dim() != y.dim() {
            return Err(crate::CryoError::ShapeMismatch(format!(
                "source pool {:?} and target pool {:?} differ",
                x.dim(),
                y.dim()
            )));
        }

        if batch_size == 0 {
            return Err(crate::CryoError::Config(
                "batch_size must be > 0".to_string(),
            ));
        }

        let num_samples = x.dim().0;
        if num_samples == 0 {
            return Err(crate::CryoError::Config(
                "training pool must not be empty".to_string(),
            ));
        }

        let mut perm: Vec<usize> = (0..num_samples).collect();
        perm.shuffle(&mut rng);

        Ok(Self {
            x,
            y,
            batch_size,
            perm,
            rng,
        })
    }

    /// Number of samples in the pool
    pub fn num_samples(&self) -> usize {
        self.perm.len()
    }

    /// Number of batches per epoch (the final batch may be shorter)
    pub fn num_batches(&self) -> usize {
        (self.perm.len() + self.batch_size - 1) / self.batch_size
    }

    /// Produce batch `index` of the current epoch, augmented and converted to
    /// `(source, target)` tensors on `device`.
    pub fn batch(&mut self, index: usize, device: &Device) -> crate::Result<(Tensor, Tensor)> {
        if index >= self.num_batches() {
            return Err(crate::CryoError::Config(format!(
                "batch index {} out of range ({} batches per epoch)",
                index,
                self.num_batches()
            )));
        }

        let lo = index * self.batch_size;
        let hi = (lo + self.batch_size).min(self.perm.len());
        let indices = &self.perm[lo..hi];

        let batch_x = self.x.select(Axis(0), indices);
        let batch_y = self.y.select(Axis(0), indices);
        let (batch_x, batch_y) = augment(&batch_x, &batch_y, &mut self.rng)?;

        Ok((
            pool_to_tensor(&batch_x, device)?,
            pool_to_tensor(&batch_y, device)?,
        ))
    }

    /// Regenerate the sample permutation for the next epoch
    pub fn on_epoch_end(&mut self) {
        self.perm.shuffle(&mut self.rng);
    }
}

impl BatchSource for EpochData {
    fn batch(&mut self, index: usize, device: &Device) -> crate::Result<(Tensor, Tensor)> {
        EpochData::batch(self, index, device)
    }

    fn num_batches(&self) -> usize {
        EpochData::num_batches(self)
    }

    fn on_epoch_end(&mut self) {
        EpochData::on_epoch_end(self)
    }
}
