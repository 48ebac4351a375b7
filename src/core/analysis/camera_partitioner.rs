//! Camera-level train/val/test partitioning.
//!
//! Cameras, not videos or frames, are the unit of assignment so that footage
//! from one physical camera never lands in two splits.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use crate::config::SplitRatios;
use crate::core::dataset::{DatasetSplit, Video};

/// Cameras assigned to each split
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraPartition {
    pub train: Vec<String>,
    pub val: Vec<String>,
    pub test: Vec<String>,
}

impl CameraPartition {
    /// Get the cameras of a specific split
    pub fn get(&self, split: DatasetSplit) -> &[String] {
        match split {
            DatasetSplit::Train => &self.train,
            DatasetSplit::Val => &self.val,
            DatasetSplit::Test => &self.test,
        }
    }

    /// Total number of partitioned cameras
    pub fn total_cameras(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    /// Camera id -> split mapping
    pub fn assignment(&self) -> BTreeMap<&str, DatasetSplit> {
        DatasetSplit::all()
            .into_iter()
            .flat_map(|split| self.get(split).iter().map(move |c| (c.as_str(), split)))
            .collect()
    }
}

/// Distinct camera ids of all videos, sorted
pub fn distinct_cameras(videos: &[Video]) -> Vec<String> {
    videos
        .iter()
        .map(|v| v.camera_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Number of cameras a ratio asks for, ties rounded to even
fn target_count(ratio: f64, n_cameras: usize) -> usize {
    (ratio * n_cameras as f64).round_ties_even().max(0.0) as usize
}

/// Partition cameras by a seeded random permutation.
///
/// The first `round(train * n)` permuted cameras go to train, the next
/// `round(val * n)` to val, the remainder to test. Counts are clamped so the
/// three groups never exceed the camera set.
pub fn partition_cameras<R: Rng + ?Sized>(
    cameras: &[String],
    ratios: &SplitRatios,
    rng: &mut R,
) -> CameraPartition {
    let n_cameras = cameras.len();
    let mut indices: Vec<usize> = (0..n_cameras).collect();
    indices.shuffle(rng);

    let n_train = target_count(ratios.train, n_cameras).min(n_cameras);
    let n_val = target_count(ratios.val, n_cameras).min(n_cameras - n_train);

    let pick = |range: &[usize]| -> Vec<String> {
        range.iter().map(|&idx| cameras[idx].clone()).collect()
    };

    let partition = CameraPartition {
        train: pick(&indices[..n_train]),
        val: pick(&indices[n_train..n_train + n_val]),
        test: pick(&indices[n_train + n_val..]),
    };

    info!(
        "Partitioned {} cameras: train={}, val={}, test={}",
        n_cameras,
        partition.train.len(),
        partition.val.len(),
        partition.test.len()
    );

    partition
}
