use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::core::dataset::DatasetSplit;
use crate::error::{GuidanceError, GuidanceResult};

/// Target ratios for the camera-level train/val/test partition.
///
/// All three keys are required when read from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    pub train: f64, // e.g., 0.70 for 70%
    pub val: f64,   // e.g., 0.20 for 20%
    pub test: f64,  // e.g., 0.10 for 10%
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.70,
            val: 0.20,
            test: 0.10,
        }
    }
}

impl SplitRatios {
    /// Get the target ratio for a specific split
    pub fn get(&self, split: DatasetSplit) -> f64 {
        match split {
            DatasetSplit::Train => self.train,
            DatasetSplit::Val => self.val,
            DatasetSplit::Test => self.test,
        }
    }

    /// Reject ratios outside [0, 1]. The sum is only checked loosely.
    pub fn validate(&self) -> GuidanceResult<()> {
        for split in DatasetSplit::all() {
            let ratio = self.get(split);
            if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
                return Err(GuidanceError::Config(format!(
                    "{} ratio {} is outside [0, 1]",
                    split.as_str(),
                    ratio
                )));
            }
        }

        let sum = self.train + self.val + self.test;
        if (sum - 1.0).abs() > 1e-6 {
            warn!(
                "Split ratios sum to {:.4} instead of 1.0 (train={}, val={}, test={})",
                sum, self.train, self.val, self.test
            );
        }
        Ok(())
    }
}

fn default_seed() -> u64 {
    42
}

fn default_resting_label() -> String {
    "Resting".to_string()
}

/// Run configuration for split guidance generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidanceConfig {
    /// Camera partition ratios
    pub split_ratio: SplitRatios,

    /// Seed for the run's random generator
    #[serde(default = "default_seed")]
    pub random_seed: u64,

    /// Label that marks "no notable behavior"
    #[serde(default = "default_resting_label")]
    pub resting_label: String,

    /// Also sample and write a lookup table for the test cameras
    #[serde(default)]
    pub emit_test_split: bool,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            split_ratio: SplitRatios::default(),
            random_seed: default_seed(),
            resting_label: default_resting_label(),
            emit_test_split: false,
        }
    }
}

impl GuidanceConfig {
    /// Load and validate a config file.
    ///
    /// Unlike interactive settings, a broken config is fatal: the run must not
    /// start sampling with ratios it could not read.
    pub fn load(path: &Path) -> GuidanceResult<Self> {
        info!("Loading guidance config from: {:?}", path);

        let contents = fs::read_to_string(path).map_err(|e| GuidanceError::io(path, e))?;
        let config: GuidanceConfig = serde_json::from_str(&contents)
            .map_err(|e| GuidanceError::Config(format!("{:?}: {}", path, e)))?;
        config.validate()?;

        info!(
            "Loaded config: train={}, val={}, test={}, seed={}",
            config.split_ratio.train,
            config.split_ratio.val,
            config.split_ratio.test,
            config.random_seed
        );
        Ok(config)
    }

    pub fn validate(&self) -> GuidanceResult<()> {
        self.split_ratio.validate()?;
        if self.resting_label.trim().is_empty() {
            return Err(GuidanceError::Config(
                "resting_label must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Splits whose lookup tables are materialized, in processing order
    pub fn emitted_splits(&self) -> Vec<DatasetSplit> {
        if self.emit_test_split {
            DatasetSplit::all().to_vec()
        } else {
            vec![DatasetSplit::Train, DatasetSplit::Val]
        }
    }
}
