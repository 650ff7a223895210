//! Training controller: orchestrates epochs over the extracted pools and
//! delegates per-batch learning to the external model.
use candle_core::Device;
use ndarray::Array5;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

use super::checkpoint::{self, CheckpointPolicy, RunMetadata};
use crate::data::{pool_to_tensor, BatchSource, EpochData};
use crate::models::{LearnableModel, SPATIAL_AXES};

/// Validation fraction below which a warning is emitted
const VAL_FRACTION_WARN: f64 = 0.05;

/// Training configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,
    /// Batches per epoch
    pub steps_per_epoch: usize,
    /// Batch size
    pub batch_size: usize,
    /// Seed for shuffling and augmentation
    pub seed: u64,
    /// Directory for weights and run metadata
    pub checkpoint_dir: PathBuf,
    /// Checkpoint selection strategy; `None` keeps the last weights
    pub checkpoint: Option<CheckpointPolicy>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            steps_per_epoch: 400,
            batch_size: 16,
            seed: 42,
            checkpoint_dir: PathBuf::from("checkpoints"),
            checkpoint: Some(CheckpointPolicy::BestValidationLoss),
        }
    }
}

impl TrainingConfig {
    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.epochs == 0 {
            return Err(crate::CryoError::Config("epochs must be > 0".to_string()));
        }

        if self.steps_per_epoch == 0 {
            return Err(crate::CryoError::Config(
                "steps_per_epoch must be > 0".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(crate::CryoError::Config(
                "batch_size must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Drives the external learnable model over the extracted sample pools
pub struct Trainer<M: LearnableModel> {
    model: M,
    config: TrainingConfig,
    device: Device,
    prepared: bool,
}

impl<M: LearnableModel> Trainer<M> {
    /// Create a new trainer
    pub fn new(model: M, config: TrainingConfig, device: Device) -> crate::Result<Self> {
        config.validate()?;

        Ok(Self {
            model,
            config,
            device,
            prepared: false,
        })
    }

    /// Train the model with the given data.
    ///
    /// `x`/`y` are the training pools, `validation_data` the held-out
    /// `(source, target)` pair. `epochs` and `steps_per_epoch` override the
    /// configured values when given. Returns the mean training loss per
    /// epoch.
    pub fn train(
        &mut self,
        x: Array5<f32>,
        y: Array5<f32>,
        validation_data: (Array5<f32>, Array5<f32>),
        epochs: Option<usize>,
        steps_per_epoch: Option<usize>,
    ) -> crate::Result<Vec<f32>> {
        if x.dim() != y.dim() {
            return Err(crate::CryoError::ShapeMismatch(format!(
                "training pools differ: source {:?}, target {:?}",
                x.dim(),
                y.dim()
            )));
        }

        let (x_val, y_val) = validation_data;
        if x_val.dim() != y_val.dim() {
            return Err(crate::CryoError::ShapeMismatch(format!(
                "validation pools differ: source {:?}, target {:?}",
                x_val.dim(),
                y_val.dim()
            )));
        }

        let (n_train, n_val) = (x.dim().0, x_val.dim().0);
        let frac_val = n_val as f64 / (n_train + n_val) as f64;
        if frac_val < VAL_FRACTION_WARN {
            log::warn!(
                "small number of validation volumes (only {:.1}% of all volumes)",
                100.0 * frac_val
            );
        }

        self.check_divisibility(&x)?;

        let epochs = epochs.unwrap_or(self.config.epochs);
        let steps_per_epoch = steps_per_epoch.unwrap_or(self.config.steps_per_epoch);
        if epochs == 0 || steps_per_epoch == 0 {
            return Err(crate::CryoError::Config(format!(
                "epochs and steps_per_epoch must be > 0, got {} and {}",
                epochs, steps_per_epoch
            )));
        }

        if !self.prepared {
            self.model.prepare()?;
            self.prepared = true;
        }

        let rng = StdRng::seed_from_u64(self.config.seed);
        let mut provider = EpochData::new(x, y, self.config.batch_size, rng)?;

        let val_x = pool_to_tensor(&x_val, &self.device)?;
        let val_y = pool_to_tensor(&y_val, &self.device)?;

        log::info!(
            "Training for {} epochs of {} steps ({} batches per epoch pass)",
            epochs,
            steps_per_epoch,
            provider.num_batches()
        );

        let mut history = Vec::with_capacity(epochs);
        for epoch in 0..epochs {
            let avg_loss = self.train_epoch(&mut provider, steps_per_epoch)?;

            self.model.on_epoch_end(Some((&val_x, &val_y)))?;
            provider.on_epoch_end();

            log::info!("Epoch {}/{}: loss={:.4}", epoch + 1, epochs, avg_loss);
            history.push(avg_loss);
        }

        checkpoint::finalize(
            &mut self.model,
            &self.config.checkpoint_dir,
            self.config.checkpoint,
        )?;
        checkpoint::write_metadata(
            &self.config.checkpoint_dir,
            &RunMetadata {
                epochs,
                steps_per_epoch,
                final_loss: history.last().copied(),
                checkpoint: self.config.checkpoint,
            },
        )?;

        Ok(history)
    }

    /// Run one epoch of `steps` batches, returning the mean training loss.
    ///
    /// Steps wrap around within the provider's frozen permutation when
    /// `steps` exceeds the batches of one pool pass.
    fn train_epoch(
        &mut self,
        provider: &mut impl BatchSource,
        steps: usize,
    ) -> crate::Result<f32> {
        let mut total_loss = 0.0f32;
        for step in 0..steps {
            let index = step % provider.num_batches();
            let (batch_x, batch_y) = provider.batch(index, &self.device)?;
            let loss = self.model.train_step(&batch_x, &batch_y)?;
            total_loss += loss;

            log::debug!("Step {}/{}: loss={:.4}", step + 1, steps, loss);
        }

        Ok(total_loss / steps as f32)
    }

    /// Check that every spatial extent of the training pool is evenly
    /// divisible by the model's declared per-axis divisor.
    fn check_divisibility(&self, x: &Array5<f32>) -> crate::Result<()> {
        let divisors = self.model.axis_div_by();
        let dims = x.dim();
        let spatial = [dims.1, dims.2, dims.3];

        for ((axis, div_by), size) in SPATIAL_AXES.iter().zip(divisors).zip(spatial) {
            if div_by == 0 {
                return Err(crate::CryoError::Config(format!(
                    "model declares zero divisor for axis {}",
                    axis
                )));
            }

            if size % div_by != 0 {
                return Err(crate::CryoError::Config(format!(
                    "training volumes must be evenly divisible by {} along \
                     axis {} (which has incompatible size {})",
                    div_by, axis, size
                )));
            }
        }

        Ok(())
    }

    /// Access the wrapped model
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Consume the trainer, returning the trained model
    pub fn into_model(self) -> M {
        self.model
    }
}
