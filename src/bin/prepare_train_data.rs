//! Generate normalized train/validation sub-volumes from a pair of
//! independently reconstructed tomograms and a foreground mask.
use anyhow::{bail, Context};
use cryo_denoise::config::SamplingConfig;
use cryo_denoise::data::{compute_mean_std, extract_volumes, sample_coordinates};
use ndarray::Array3;
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 5 {
        bail!(
            "usage: prepare-train-data <even.npy> <odd.npy> <mask.npy> <out_dir> [config.json]"
        );
    }

    let even_path = PathBuf::from(&args[1]);
    let odd_path = PathBuf::from(&args[2]);
    let mask_path = PathBuf::from(&args[3]);
    let out_dir = PathBuf::from(&args[4]);

    let config = match args.get(5) {
        Some(path) => SamplingConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => SamplingConfig::default(),
    };

    log::info!("Sampling configuration: {:?}", config);

    let even = Array3::<f32>::read_npy(
        File::open(&even_path).with_context(|| format!("cannot open {:?}", even_path))?,
    )
    .with_context(|| format!("failed to read {:?}", even_path))?;
    let odd = Array3::<f32>::read_npy(
        File::open(&odd_path).with_context(|| format!("cannot open {:?}", odd_path))?,
    )
    .with_context(|| format!("failed to read {:?}", odd_path))?;
    let mut mask = Array3::<u8>::read_npy(
        File::open(&mask_path).with_context(|| format!("cannot open {:?}", mask_path))?,
    )
    .with_context(|| format!("failed to read {:?}", mask_path))?;

    log::info!("Loaded volumes: shape {:?}", even.dim());

    if even.dim() != odd.dim() || even.dim() != mask.dim() {
        bail!(
            "volume shapes differ: even {:?}, odd {:?}, mask {:?}",
            even.dim(),
            odd.dim(),
            mask.dim()
        );
    }

    let (mean, std) = compute_mean_std(&even);
    log::info!("Normalization statistics: mean={:.4}, std={:.4}", mean, std);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let (train_coords, val_coords) = sample_coordinates(
        &mut mask,
        config.num_train,
        config.num_val,
        config.vol_dims(),
        &mut rng,
    )?;
    log::info!(
        "Sampled {} train and {} validation coordinates",
        train_coords.len(),
        val_coords.len()
    );

    let (x, y, x_val, y_val) = extract_volumes(
        &even,
        &odd,
        &train_coords,
        &val_coords,
        config.vol_dims(),
        mean,
        std,
    )?;

    std::fs::create_dir_all(&out_dir)?;
    x.write_npy(File::create(out_dir.join("train_x.npy"))?)?;
    y.write_npy(File::create(out_dir.join("train_y.npy"))?)?;
    x_val.write_npy(File::create(out_dir.join("val_x.npy"))?)?;
    y_val.write_npy(File::create(out_dir.join("val_y.npy"))?)?;

    // predictions need the same statistics to denormalize
    let stats = serde_json::json!({ "mean": mean, "std": std });
    std::fs::write(
        out_dir.join("normalization.json"),
        serde_json::to_string_pretty(&stats)?,
    )?;

    log::info!(
        "Wrote train {:?} and validation {:?} tensors to {:?}",
        x.dim(),
        x_val.dim(),
        out_dir
    );

    Ok(())
}
