//! Configuration for train-data preparation
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Sub-volume sampling configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SamplingConfig {
    /// Number of training sub-volumes to sample
    pub num_train: usize,

    /// Number of validation sub-volumes to sample
    pub num_val: usize,

    /// Edge lengths of the extracted sub-volumes, in (Z, Y, X) order
    pub vol_dims: [usize; 3],

    /// Seed for the sampling random generator
    pub seed: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            num_train: 1200,
            num_val: 120,
            vol_dims: [96, 96, 96],
            seed: 42,
        }
    }
}

impl SamplingConfig {
    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.num_train == 0 {
            return Err(crate::CryoError::Config(
                "num_train must be > 0".to_string(),
            ));
        }

        if self.num_val == 0 {
            return Err(crate::CryoError::Config("num_val must be > 0".to_string()));
        }

        if self.vol_dims.iter().any(|&d| d == 0) {
            return Err(crate::CryoError::Config(format!(
                "vol_dims must be positive on every axis, got {:?}",
                self.vol_dims
            )));
        }

        Ok(())
    }

    /// Window size as a (Z, Y, X) tuple
    pub fn vol_dims(&self) -> (usize, usize, usize) {
        (self.vol_dims[0], self.vol_dims[1], self.vol_dims[2])
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
