//! Symmetry-based batch augmentation.
//!
//! Source and target are two independent noisy observations of the same
//! signal, so swapping their roles is as valid a training pair as the
//! original orientation. Each sample gets a random quarter-turn rotation in
//! the Z-X plane and, with probability one half, a source/target swap.
use ndarray::{s, Array5, ArrayView4, Axis};
use rand::Rng;

/// Augment a batch of paired `(N, Z, Y, X, C)` cubes.
///
/// Per sample, a rotation count `k` in `0..4` is drawn uniformly; with
/// probability 0.5 the pair is rotated as-is, otherwise source and target
/// are swapped before rotating. Rotation happens in the plane of the first
/// and third spatial axes, so Z and X extents must be equal.
pub fn augment<R: Rng>(
    x: &Array5<f32>,
    y: &Array5<f32>,
    rng: &mut R,
) -> crate::Result<(Array5<f32>, Array5<f32>)> {
    if x.dim() != y.dim() {
        return Err(crate::CryoError::ShapeMismatch(format!(
            "source batch {:?} and target batch {:?} differ",
            x.dim(),
            y.dim()
        )));
    }

    let (n, z, _, xdim, _) = x.dim();
    if z != xdim {
        return Err(crate::CryoError::ShapeMismatch(format!(
            "rotation in the Z-X plane requires equal Z and X extents, \
             got Z={} and X={}",
            z, xdim
        )));
    }

    let rot_k: Vec<usize> = (0..n).map(|_| rng.gen_range(0..4)).collect();

    let mut x_out = Array5::<f32>::zeros(x.raw_dim());
    let mut y_out = Array5::<f32>::zeros(y.raw_dim());

    for i in 0..n {
        let (src, dst) = if rng.gen::<f64>() < 0.5 {
            (x.index_axis(Axis(0), i), y.index_axis(Axis(0), i))
        } else {
            (y.index_axis(Axis(0), i), x.index_axis(Axis(0), i))
        };

        x_out
            .slice_mut(s![i, .., .., .., ..])
            .assign(&rot90_zx(src, rot_k[i]));
        y_out
            .slice_mut(s![i, .., .., .., ..])
            .assign(&rot90_zx(dst, rot_k[i]));
    }

    Ok((x_out, y_out))
}

/// Rotate a `(Z, Y, X, C)` cube by `k` quarter turns in the Z-X plane,
/// leaving Y fixed. Pure view transformation, no copy.
fn rot90_zx(vol: ArrayView4<'_, f32>, k: usize) -> ArrayView4<'_, f32> {
    match k % 4 {
        0 => vol,
        1 => {
            let mut v = vol;
            v.invert_axis(Axis(2));
            v.permuted_axes([2, 1, 0, 3])
        }
        2 => {
            let mut v = vol;
            v.invert_axis(Axis(0));
            v.invert_axis(Axis(2));
            v
        }
        _ => {
            let mut v = vol.permuted_axes([2, 1, 0, 3]);
            v.invert_axis(Axis(2));
            v
        }
    }
}
