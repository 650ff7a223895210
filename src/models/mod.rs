//! Seam to the external denoising network.
//!
//! The network architecture, its loss and its optimizer live outside this
//! crate; the training controller only needs the contract below.
use candle_core::Tensor;
use std::path::Path;

/// Spatial axis labels in tensor order, used in diagnostics
pub const SPATIAL_AXES: [char; 3] = ['Z', 'Y', 'X'];

/// Contract of the external learnable denoising function.
///
/// Batches arrive as `(N, Z, Y, X, 1)` `f32` tensors. `prepare` is called
/// exactly once before the first training step; `on_epoch_end` is called
/// after every epoch with the validation pair, so implementations can score
/// it for their checkpoint selection.
pub trait LearnableModel {
    /// One-time initialization before training starts
    fn prepare(&mut self) -> crate::Result<()>;

    /// Run one gradient step on a `(source, target)` batch, returning the loss
    fn train_step(&mut self, source: &Tensor, target: &Tensor) -> crate::Result<f32>;

    /// Epoch-end hook; `validation` is the held-out `(source, target)` pair
    fn on_epoch_end(&mut self, validation: Option<(&Tensor, &Tensor)>) -> crate::Result<()>;

    /// Persist current weights to `path`
    fn save_weights(&self, path: &Path) -> crate::Result<()>;

    /// Restore weights from `path`
    fn load_weights(&mut self, path: &Path) -> crate::Result<()>;

    /// Required divisor of each spatial extent (Z, Y, X), imposed by the
    /// network's downsampling factor
    fn axis_div_by(&self) -> [usize; 3];
}
