mod camera_partitioner;
mod interval_expander;
mod resting_sampler;
mod split_guidance;

pub use camera_partitioner::{distinct_cameras, partition_cameras, CameraPartition};
pub use interval_expander::{expand_intervals, expand_track, LabelCounts, VideoFrames};
pub use resting_sampler::{backfill_quota, complement_frames, sample_resting_frames, BackfillQuota};
pub use split_guidance::{
    build_split, build_split_guidance, run_split_guidance, write_split_guidance, SplitGuidance,
    SplitStats,
};
