//! Materialization of sampled coordinates into training tensors.
use ndarray::{s, Array3, Array5};

use super::normalize::normalize;
use super::sampling::Coord;

/// Extract normalized train and validation sub-volumes from the paired
/// source/target volumes at the sampled coordinates.
///
/// Both volumes are normalized once with the given statistics, then each
/// coordinate's window is copied into its slot, preserving input order. All
/// four outputs carry a trailing singleton channel axis: `(N, Z, Y, X, 1)`.
///
/// # Arguments
/// * `source` - Source volume (the "even" reconstruction)
/// * `target` - Target volume (the "odd" reconstruction), same shape
/// * `train_coords` - Training cube coordinates, all of `vol_dims` size
/// * `val_coords` - Validation cube coordinates, all of `vol_dims` size
/// * `vol_dims` - Required window size, validated against every coordinate
/// * `mean`, `std` - Normalization statistics
pub fn extract_volumes(
    source: &Array3<f32>,
    target: &Array3<f32>,
    train_coords: &[Coord],
    val_coords: &[Coord],
    vol_dims: (usize, usize, usize),
    mean: f32,
    std: f32,
) -> crate::Result<(Array5<f32>, Array5<f32>, Array5<f32>, Array5<f32>)> {
    if source.dim() != target.dim() {
        return Err(crate::CryoError::ShapeMismatch(format!(
            "source volume {:?} and target volume {:?} differ",
            source.dim(),
            target.dim()
        )));
    }

    if train_coords.is_empty() || val_coords.is_empty() {
        return Err(crate::CryoError::Config(format!(
            "coordinate lists must be non-empty, got {} train and {} val",
            train_coords.len(),
            val_coords.len()
        )));
    }

    let shape = source.dim();
    for coord in train_coords.iter().chain(val_coords.iter()) {
        if coord.dims() != vol_dims {
            return Err(crate::CryoError::ShapeMismatch(format!(
                "coordinate {:?} has window size {:?}, expected {:?}",
                coord,
                coord.dims(),
                vol_dims
            )));
        }

        if !coord.fits_within(shape) {
            return Err(crate::CryoError::Sampling(format!(
                "coordinate {:?} exceeds volume bounds {:?}",
                coord, shape
            )));
        }
    }

    let img_x = normalize(source, mean, std)?;
    let img_y = normalize(target, mean, std)?;

    let x = gather(&img_x, train_coords, vol_dims);
    let y = gather(&img_y, train_coords, vol_dims);
    let x_val = gather(&img_x, val_coords, vol_dims);
    let y_val = gather(&img_y, val_coords, vol_dims);

    Ok((x, y, x_val, y_val))
}

/// Copy each coordinate's window of `volume` into a fresh `(N, Z, Y, X, 1)`
/// pool, in coordinate order.
fn gather(
    volume: &Array3<f32>,
    coords: &[Coord],
    vol_dims: (usize, usize, usize),
) -> Array5<f32> {
    let mut pool =
        Array5::<f32>::zeros((coords.len(), vol_dims.0, vol_dims.1, vol_dims.2, 1));

    for (i, coord) in coords.iter().enumerate() {
        let window = volume.slice(s![
            coord.z.clone(),
            coord.y.clone(),
            coord.x.clone()
        ]);
        pool.slice_mut(s![i, .., .., .., 0]).assign(&window);
    }

    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sampling::sample_coordinates;
    use ndarray::Array3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ramp_volume(shape: (usize, usize, usize), offset: f32) -> Array3<f32> {
        Array3::from_shape_fn(shape, |(z, y, x)| {
            (z * shape.1 * shape.2 + y * shape.2 + x) as f32 + offset
        })
    }

    #[test]
    fn test_extracted_windows_match_raw_data() {
        let shape = (64, 128, 128);
        let source = ramp_volume(shape, 0.0);
        let target = ramp_volume(shape, 0.5);

        let mut mask = Array3::<u8>::zeros(shape);
        mask.slice_mut(s![10..54, 14..114, 14..114]).fill(1);
        let mut rng = StdRng::seed_from_u64(0);
        let (train, val) =
            sample_coordinates(&mut mask, 5, 2, (12, 12, 12), &mut rng).unwrap();

        // mean 0, std 1 leaves the data untouched
        let (x, y, x_val, y_val) =
            extract_volumes(&source, &target, &train, &val, (12, 12, 12), 0.0, 1.0)
                .unwrap();

        assert_eq!(x.dim(), (5, 12, 12, 12, 1));
        assert_eq!(y.dim(), (5, 12, 12, 12, 1));
        assert_eq!(x_val.dim(), (2, 12, 12, 12, 1));
        assert_eq!(y_val.dim(), (2, 12, 12, 12, 1));

        for (i, coord) in train.iter().enumerate() {
            let window = source.slice(s![
                coord.z.clone(),
                coord.y.clone(),
                coord.x.clone()
            ]);
            let slot = x.slice(s![i, .., .., .., 0]);
            assert_eq!(window, slot);

            let window = target.slice(s![
                coord.z.clone(),
                coord.y.clone(),
                coord.x.clone()
            ]);
            let slot = y.slice(s![i, .., .., .., 0]);
            assert_eq!(window, slot);
        }
    }

    #[test]
    fn test_normalization_is_applied() {
        let shape = (16, 16, 16);
        let source = Array3::<f32>::from_elem(shape, 10.0);
        let target = Array3::<f32>::from_elem(shape, 6.0);

        let coord = Coord { z: 4..12, y: 4..12, x: 4..12 };
        let (x, y, _, _) = extract_volumes(
            &source,
            &target,
            &[coord.clone()],
            &[coord],
            (8, 8, 8),
            2.0,
            4.0,
        )
        .unwrap();

        assert!(x.iter().all(|&v| (v - 2.0).abs() < 1e-6));
        assert!(y.iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_mismatched_volumes_rejected() {
        let source = Array3::<f32>::zeros((16, 16, 16));
        let target = Array3::<f32>::zeros((16, 16, 8));
        let coord = Coord { z: 0..8, y: 0..8, x: 0..8 };

        let result = extract_volumes(
            &source,
            &target,
            &[coord.clone()],
            &[coord],
            (8, 8, 8),
            0.0,
            1.0,
        );
        assert!(matches!(result, Err(crate::CryoError::ShapeMismatch(_))));
    }

    #[test]
    fn test_wrong_window_size_rejected() {
        let source = Array3::<f32>::zeros((16, 16, 16));
        let target = Array3::<f32>::zeros((16, 16, 16));
        let good = Coord { z: 0..8, y: 0..8, x: 0..8 };
        let bad = Coord { z: 0..4, y: 0..8, x: 0..8 };

        let result = extract_volumes(
            &source,
            &target,
            &[good.clone()],
            &[bad],
            (8, 8, 8),
            0.0,
            1.0,
        );
        assert!(matches!(result, Err(crate::CryoError::ShapeMismatch(_))));
    }

    #[test]
    fn test_out_of_bounds_coordinate_rejected() {
        let source = Array3::<f32>::zeros((16, 16, 16));
        let target = Array3::<f32>::zeros((16, 16, 16));
        let good = Coord { z: 0..8, y: 0..8, x: 0..8 };
        let oob = Coord { z: 10..18, y: 0..8, x: 0..8 };

        let result = extract_volumes(
            &source,
            &target,
            &[oob],
            &[good],
            (8, 8, 8),
            0.0,
            1.0,
        );
        assert!(matches!(result, Err(crate::CryoError::Sampling(_))));
    }

    #[test]
    fn test_empty_coordinates_rejected() {
        let source = Array3::<f32>::zeros((16, 16, 16));
        let target = Array3::<f32>::zeros((16, 16, 16));

        let result = extract_volumes(&source, &target, &[], &[], (8, 8, 8), 0.0, 1.0);
        assert!(matches!(result, Err(crate::CryoError::Config(_))));
    }
}
