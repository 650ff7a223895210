//! Training infrastructure: controller, checkpoint handling
pub mod checkpoint;
pub mod trainer;

pub use checkpoint::{CheckpointPolicy, RunMetadata};
pub use trainer::{Trainer, TrainingConfig};
