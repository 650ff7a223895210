//! cryo-denoise - paired-volume denoising data pipeline
//!
//! Prepares training data for a noise2noise-style denoising model from two
//! independently reconstructed versions of the same 3-D volume (an "even" and
//! an "odd" half-set), and drives the training loop that consumes them.
//!
//! # Pipeline
//!
//! - **Sampling**: carve disjoint training and validation sub-volume
//!   coordinates out of a foreground mask
//! - **Extraction**: materialize normalized `(N, Z, Y, X, 1)` tensors at the
//!   sampled coordinates
//! - **Training**: shuffle, augment and batch the extracted pools through an
//!   external learnable model
//!
//! # Example
//!
//! ```ignore
//! use cryo_denoise::{SamplingConfig, data};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let cfg = SamplingConfig::default();
//! let mut rng = StdRng::seed_from_u64(cfg.seed);
//! let (train, val) = data::sample_coordinates(
//!     &mut mask, cfg.num_train, cfg.num_val, cfg.vol_dims(), &mut rng)?;
//! ```

pub mod config;
pub mod data;
pub mod imod;
pub mod models;
pub mod training;

// Re-export commonly used items
pub use config::SamplingConfig;
pub use data::{Coord, EpochData};
pub use models::LearnableModel;
pub use training::{Trainer, TrainingConfig};

/// Library error types
#[derive(Debug, thiserror::Error)]
pub enum CryoError {
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sampling error: {0}")]
    Sampling(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Degenerate normalization: standard deviation is zero")]
    DegenerateNormalization,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CryoError>;
