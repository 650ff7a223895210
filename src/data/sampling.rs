//! Coordinate sampling for train/validation sub-volumes.
//!
//! Training and validation cubes are drawn from the foreground of a binary
//! mask. The mask doubles as the claimed-region tracker: every stage zeroes
//! out the territory it has consumed, so later stages cannot sample it again.
//! Validation cubes cluster inside two small neighborhoods around randomly
//! picked anchors, and a buffer of half a cube around those neighborhoods is
//! removed from the training pool.
use ndarray::{s, Array3};
use rand::Rng;
use std::ops::Range;

/// Number of anchor points seeding the validation neighborhoods
const VAL_ANCHORS: usize = 2;

/// Fraction of the volume extent used for the validation border band and the
/// anchor neighborhood half-extent
const NEIGHBORHOOD_FRACTION: f64 = 0.1;

/// One cubic sub-volume region, as half-open intervals per axis (Z, Y, X)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coord {
    pub z: Range<usize>,
    pub y: Range<usize>,
    pub x: Range<usize>,
}

impl Coord {
    /// Cube of `vol_dims` centered on `center` (centers are kept at least
    /// `floor(vol_dims / 2)` away from every border before this is called)
    fn centered(center: (usize, usize, usize), vol_dims: (usize, usize, usize)) -> Self {
        let cent = half_dims(vol_dims);
        Self {
            z: center.0 - cent.0..center.0 - cent.0 + vol_dims.0,
            y: center.1 - cent.1..center.1 - cent.1 + vol_dims.1,
            x: center.2 - cent.2..center.2 - cent.2 + vol_dims.2,
        }
    }

    /// Window size as (Z, Y, X)
    pub fn dims(&self) -> (usize, usize, usize) {
        (
            self.z.end - self.z.start,
            self.y.end - self.y.start,
            self.x.end - self.x.start,
        )
    }

    /// Whether two cubes share at least one voxel
    pub fn intersects(&self, other: &Coord) -> bool {
        fn overlap(a: &Range<usize>, b: &Range<usize>) -> bool {
            a.start < b.end && b.start < a.end
        }

        overlap(&self.z, &other.z) && overlap(&self.y, &other.y) && overlap(&self.x, &other.x)
    }

    /// Whether the cube lies entirely inside a volume of `shape`
    pub fn fits_within(&self, shape: (usize, usize, usize)) -> bool {
        self.z.end <= shape.0 && self.y.end <= shape.1 && self.x.end <= shape.2
    }
}

/// Replacement behavior of a center draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPolicy {
    WithReplacement,
    WithoutReplacement,
}

impl DrawPolicy {
    /// Policy for drawing `requested` centers out of `eligible` positions:
    /// with replacement as soon as the request meets or exceeds the pool.
    pub fn for_request(requested: usize, eligible: usize) -> Self {
        if requested >= eligible {
            DrawPolicy::WithReplacement
        } else {
            DrawPolicy::WithoutReplacement
        }
    }
}

/// Sample non-overlapping train and validation cube coordinates from the
/// foreground of `mask`.
///
/// The mask is consumed destructively: border margins, the validation
/// neighborhoods and their exclusion buffers are zeroed in place as they are
/// claimed.
///
/// # Arguments
/// * `mask` - Binary foreground mask, same shape as the paired volumes
/// * `num_train` - Number of training cube coordinates
/// * `num_val` - Number of validation cube coordinates
/// * `vol_dims` - Cube edge lengths in (Z, Y, X) order
/// * `rng` - Seedable random generator driving every draw
///
/// # Errors
/// Fails with a sampling error when any stage runs out of eligible foreground
/// positions, when the window does not fit into the mask, or when a
/// validation neighborhood would extend outside the volume.
pub fn sample_coordinates<R: Rng>(
    mask: &mut Array3<u8>,
    num_train: usize,
    num_val: usize,
    vol_dims: (usize, usize, usize),
    rng: &mut R,
) -> crate::Result<(Vec<Coord>, Vec<Coord>)> {
    if num_train == 0 || num_val == 0 {
        return Err(crate::CryoError::Config(format!(
            "volume counts must be positive, got num_train={}, num_val={}",
            num_train, num_val
        )));
    }

    if vol_dims.0 == 0 || vol_dims.1 == 0 || vol_dims.2 == 0 {
        return Err(crate::CryoError::Config(format!(
            "vol_dims must be positive on every axis, got {:?}",
            vol_dims
        )));
    }

    let (mz, my, mx) = mask.dim();
    if vol_dims.0 > mz || vol_dims.1 > my || vol_dims.2 > mx {
        return Err(crate::CryoError::Sampling(format!(
            "sampling window {:?} exceeds mask bounds ({}, {}, {})",
            vol_dims, mz, my, mx
        )));
    }

    let cent = half_dims(vol_dims);
    let tv_span = (
        (vol_dims.0 as f64 / 2.0).round() as usize,
        (vol_dims.1 as f64 / 2.0).round() as usize,
        (vol_dims.2 as f64 / 2.0).round() as usize,
    );

    // Keep every center at least half a window away from each face, so all
    // cubes fit inside the volume.
    let (z_hi, y_hi, x_hi) = (mz - cent.0, my - cent.1, mx - cent.2);
    mask.slice_mut(s![..cent.0, .., ..]).fill(0);
    mask.slice_mut(s![z_hi.., .., ..]).fill(0);
    mask.slice_mut(s![.., ..cent.1, ..]).fill(0);
    mask.slice_mut(s![.., y_hi.., ..]).fill(0);
    mask.slice_mut(s![.., .., ..cent.2]).fill(0);
    mask.slice_mut(s![.., .., x_hi..]).fill(0);

    let span = (
        (mz as f64 * NEIGHBORHOOD_FRACTION / 2.0).round() as usize,
        (my as f64 * NEIGHBORHOOD_FRACTION / 2.0).round() as usize,
        (mx as f64 * NEIGHBORHOOD_FRACTION / 2.0).round() as usize,
    );

    // Anchors are additionally kept out of a border band along Y and X.
    let mut anchor_mask = mask.clone();
    anchor_mask.slice_mut(s![.., ..span.1, ..]).fill(0);
    anchor_mask.slice_mut(s![.., my - span.1.., ..]).fill(0);
    anchor_mask.slice_mut(s![.., .., ..span.2]).fill(0);
    anchor_mask.slice_mut(s![.., .., mx - span.2..]).fill(0);

    let anchor_pool = nonzero_positions(&anchor_mask);
    if anchor_pool.len() < VAL_ANCHORS {
        return Err(crate::CryoError::Sampling(format!(
            "no eligible sampling region for validation anchors \
             ({} foreground positions, need {})",
            anchor_pool.len(),
            VAL_ANCHORS
        )));
    }

    let anchors: Vec<(usize, usize, usize)> =
        rand::seq::index::sample(rng, anchor_pool.len(), VAL_ANCHORS)
            .iter()
            .map(|i| anchor_pool[i])
            .collect();

    // Carve a small neighborhood of the surviving foreground around each
    // anchor into the validation mask, and claim a buffered cuboid around it
    // in the training mask.
    let mut val_mask = Array3::<u8>::zeros(mask.raw_dim());
    for &(z, y, x) in &anchors {
        if z < span.0
            || z + span.0 > mz
            || y < span.1
            || y + span.1 > my
            || x < span.2
            || x + span.2 > mx
        {
            return Err(crate::CryoError::Sampling(format!(
                "validation neighborhood around ({}, {}, {}) extends outside \
                 the volume ({}, {}, {})",
                z, y, x, mz, my, mx
            )));
        }

        let (zr, yr, xr) = (
            z - span.0..z + span.0,
            y - span.1..y + span.1,
            x - span.2..x + span.2,
        );
        let window = mask.slice(s![zr.clone(), yr.clone(), xr.clone()]).to_owned();
        val_mask.slice_mut(s![zr, yr, xr]).assign(&window);

        let z0 = z.saturating_sub(span.0 + tv_span.0);
        let z1 = (z + span.0 + tv_span.0).min(mz);
        let y0 = y.saturating_sub(span.1 + tv_span.1);
        let y1 = (y + span.1 + tv_span.1).min(my);
        let x0 = x.saturating_sub(span.2 + tv_span.2);
        let x1 = (x + span.2 + tv_span.2).min(mx);
        mask.slice_mut(s![z0..z1, y0..y1, x0..x1]).fill(0);
    }

    let val_pool = nonzero_positions(&val_mask);
    let policy = DrawPolicy::for_request(num_val, val_pool.len());
    let val_centers = draw_centers(&val_pool, num_val, policy, rng, "validation volumes")?;
    let val_coords: Vec<Coord> = val_centers
        .into_iter()
        .map(|c| Coord::centered(c, vol_dims))
        .collect();

    // A training cube could still graze a validation cube along the carve
    // boundary; drop such centers from the pool.
    let train_pool: Vec<(usize, usize, usize)> = nonzero_positions(mask)
        .into_iter()
        .filter(|&c| {
            let cube = Coord::centered(c, vol_dims);
            !val_coords.iter().any(|v| v.intersects(&cube))
        })
        .collect();
    let policy = DrawPolicy::for_request(num_train, train_pool.len());
    let train_centers = draw_centers(&train_pool, num_train, policy, rng, "training volumes")?;
    let train_coords = train_centers
        .into_iter()
        .map(|c| Coord::centered(c, vol_dims))
        .collect();

    Ok((train_coords, val_coords))
}

fn half_dims(vol_dims: (usize, usize, usize)) -> (usize, usize, usize) {
    (vol_dims.0 / 2, vol_dims.1 / 2, vol_dims.2 / 2)
}

fn nonzero_positions(mask: &Array3<u8>) -> Vec<(usize, usize, usize)> {
    mask.indexed_iter()
        .filter(|&(_, &v)| v != 0)
        .map(|(idx, _)| idx)
        .collect()
}

fn draw_centers<R: Rng>(
    positions: &[(usize, usize, usize)],
    count: usize,
    policy: DrawPolicy,
    rng: &mut R,
    stage: &str,
) -> crate::Result<Vec<(usize, usize, usize)>> {
    if positions.is_empty() {
        return Err(crate::CryoError::Sampling(format!(
            "no eligible sampling region for {}",
            stage
        )));
    }

    match policy {
        DrawPolicy::WithReplacement => Ok((0..count)
            .map(|_| positions[rng.gen_range(0..positions.len())])
            .collect()),
        DrawPolicy::WithoutReplacement => {
            if count > positions.len() {
                return Err(crate::CryoError::Sampling(format!(
                    "cannot draw {} centers without replacement from {} \
                     positions for {}",
                    count,
                    positions.len(),
                    stage
                )));
            }

            Ok(rand::seq::index::sample(rng, positions.len(), count)
                .iter()
                .map(|i| positions[i])
                .collect())
        }
    }
}
