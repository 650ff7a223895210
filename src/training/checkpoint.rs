//! Weight-file naming and end-of-training checkpoint handling.
//!
//! The external model owns the weight format; this module only decides which
//! files exist and when they are written, reloaded or removed.
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::models::LearnableModel;

/// Final weights written unconditionally after the last epoch
pub const WEIGHTS_LAST: &str = "weights_last.safetensors";

/// Rolling weights some models write during training; removed on finalize
pub const WEIGHTS_NOW: &str = "weights_now.safetensors";

/// Metadata file written next to the weights
pub const RUN_METADATA: &str = "training_run.json";

/// Checkpoint selection strategy, consumed opaquely: the controller only
/// derives the weight file to reload after training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CheckpointPolicy {
    /// Reload the weights with the best validation loss
    BestValidationLoss,
}

impl CheckpointPolicy {
    /// File the selected checkpoint is expected under
    pub fn weights_file(&self) -> &'static str {
        match self {
            CheckpointPolicy::BestValidationLoss => "weights_best.safetensors",
        }
    }
}

/// Summary of a finished training run
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunMetadata {
    /// Number of epochs run
    pub epochs: usize,
    /// Batches per epoch
    pub steps_per_epoch: usize,
    /// Mean training loss of the final epoch
    pub final_loss: Option<f32>,
    /// Checkpoint policy in effect, if any
    pub checkpoint: Option<CheckpointPolicy>,
}

/// Finish a training run: persist final weights, reload the selected
/// checkpoint if a policy is configured, and clean up the rolling weights
/// file. A missing rolling file means the cleanup already happened and is
/// not an error.
pub fn finalize<M: LearnableModel>(
    model: &mut M,
    dir: &Path,
    policy: Option<CheckpointPolicy>,
) -> crate::Result<()> {
    fs::create_dir_all(dir)?;

    let last = dir.join(WEIGHTS_LAST);
    log::info!("Saving final weights to {:?}", last);
    model.save_weights(&last)?;

    if let Some(policy) = policy {
        let best = dir.join(policy.weights_file());
        log::info!("Reloading checkpoint {:?}", best);
        model.load_weights(&best)?;

        match fs::remove_file(dir.join(WEIGHTS_NOW)) {
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            other => other?,
        }
    }

    Ok(())
}

/// Write the run summary next to the weights
pub fn write_metadata(dir: &Path, metadata: &RunMetadata) -> crate::Result<PathBuf> {
    let path = dir.join(RUN_METADATA);
    let json = serde_json::to_string_pretty(metadata)?;
    fs::write(&path, json)?;
    Ok(path)
}
