//! Affine normalization of volumes with dataset-wide statistics.
//!
//! Statistics are computed once over a reference volume and reused for every
//! extracted sub-volume, so train and validation data share one scale.
use ndarray::{Array, Dimension};
use num_traits::{Float, FromPrimitive};

/// Compute the arithmetic mean and population standard deviation over all
/// samples of `volume`.
///
/// NaN/Inf values are not treated specially; they propagate into the result.
pub fn compute_mean_std<F, D>(volume: &Array<F, D>) -> (F, F)
where
    F: Float + FromPrimitive,
    D: Dimension,
{
    let n = F::from_usize(volume.len()).unwrap_or_else(F::one);
    let mean = volume.iter().fold(F::zero(), |acc, &v| acc + v) / n;
    let var = volume
        .iter()
        .fold(F::zero(), |acc, &v| acc + (v - mean) * (v - mean))
        / n;

    (mean, var.sqrt())
}

/// Normalize `volume` elementwise to `(v - mean) / std`.
///
/// Fails when `std` is zero (a constant volume carries no signal to scale).
pub fn normalize<F, D>(volume: &Array<F, D>, mean: F, std: F) -> crate::Result<Array<F, D>>
where
    F: Float,
    D: Dimension,
{
    if std == F::zero() {
        return Err(crate::CryoError::DegenerateNormalization);
    }

    Ok(volume.mapv(|v| (v - mean) / std))
}

/// Invert [`normalize`]: elementwise `(v * std) + mean`.
pub fn denormalize<F, D>(volume: &Array<F, D>, mean: F, std: F) -> Array<F, D>
where
    F: Float,
    D: Dimension,
{
    volume.mapv(|v| (v * std) + mean)
}
