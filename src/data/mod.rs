//! Volumetric training-data pipeline: normalization, coordinate sampling,
//! sub-volume extraction, augmentation and per-epoch batching.
pub mod augment;
pub mod extract;
pub mod normalize;
pub mod provider;
pub mod sampling;

pub use augment::augment;
pub use extract::extract_volumes;
pub use normalize::{compute_mean_std, denormalize, normalize};
pub use provider::EpochData;
pub use sampling::{sample_coordinates, Coord, DrawPolicy};

use candle_core::{Device, Tensor};
use ndarray::Array5;

/// Source of augmented training batches, indexable within a frozen epoch
/// permutation. Only `on_epoch_end` reshuffles.
pub trait BatchSource {
    /// Get batch `index` of the current epoch as `(source, target)` tensors
    fn batch(&mut self, index: usize, device: &Device) -> crate::Result<(Tensor, Tensor)>;

    /// Number of batches per epoch
    fn num_batches(&self) -> usize;

    /// Signal the end of an epoch, regenerating the sample permutation
    fn on_epoch_end(&mut self);
}

/// Convert an `(N, Z, Y, X, C)` pool into a candle tensor on `device`.
pub fn pool_to_tensor(pool: &Array5<f32>, device: &Device) -> crate::Result<Tensor> {
    let (n, z, y, x, c) = pool.dim();
    let flat: Vec<f32> = pool.iter().copied().collect();
    let tensor = Tensor::from_vec(flat, (n, z, y, x, c), device)?;
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array5;

    #[test]
    fn test_pool_to_tensor_shape() {
        let pool = Array5::<f32>::zeros((3, 4, 4, 4, 1));
        let tensor = pool_to_tensor(&pool, &Device::Cpu).unwrap();
        assert_eq!(tensor.dims(), &[3, 4, 4, 4, 1]);
    }

    #[test]
    fn test_pool_to_tensor_preserves_order() {
        let mut pool = Array5::<f32>::zeros((1, 2, 1, 2, 1));
        pool[[0, 0, 0, 0, 0]] = 1.0;
        pool[[0, 0, 0, 1, 0]] = 2.0;
        pool[[0, 1, 0, 0, 0]] = 3.0;
        pool[[0, 1, 0, 1, 0]] = 4.0;

        let tensor = pool_to_tensor(&pool, &Device::Cpu).unwrap();
        let flat = tensor.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(flat, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
