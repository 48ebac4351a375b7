//! Per-split guidance tables: camera partition, interval expansion, resting
//! backfill and fps join.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, info_span, warn};

use super::camera_partitioner::{distinct_cameras, partition_cameras, CameraPartition};
use super::interval_expander::expand_intervals;
use super::resting_sampler::sample_resting_frames;
use crate::config::GuidanceConfig;
use crate::core::dataset::{read_ndjson, write_ndjson, DatasetSplit, GuidanceRow, Track, Video};
use crate::error::GuidanceResult;

/// Counters for one split
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitStats {
    pub cameras: usize,
    pub videos: usize,
    pub excluded_videos: usize,
    pub interval_frames: usize,
    pub backfill_frames: usize,
}

impl SplitStats {
    pub fn total_frames(&self) -> usize {
        self.interval_frames + self.backfill_frames
    }
}

/// Guidance table of one split
#[derive(Debug, Clone, PartialEq)]
pub struct SplitGuidance {
    pub split: DatasetSplit,
    pub rows: Vec<GuidanceRow>,
    pub stats: SplitStats,
}

/// Build the guidance rows of one split.
///
/// Videos are processed in ascending `video_id` order so that the shared
/// generator is consumed in a reproducible order. Videos without non-resting
/// tracks yield an empty target frame list; videos without a usable frame
/// count or duration are logged and left out.
pub fn build_split<R: Rng + ?Sized>(
    split: DatasetSplit,
    cameras: &[String],
    videos: &[Video],
    tracks: &[Track],
    resting_label: &str,
    rng: &mut R,
) -> SplitGuidance {
    let _span = info_span!("split", split = split.as_str()).entered();

    let camera_set: HashSet<&str> = cameras.iter().map(String::as_str).collect();
    // video_id -> (video, fps)
    let mut split_videos: BTreeMap<&str, (&Video, f64)> = BTreeMap::new();
    let mut stats = SplitStats {
        cameras: cameras.len(),
        ..SplitStats::default()
    };

    for video in videos
        .iter()
        .filter(|v| camera_set.contains(v.camera_id.as_str()))
    {
        let Some(fps) = video.fps() else {
            warn!(
                "Excluding video {}: frame_count={}, duration={}",
                video.video_id, video.frame_count, video.duration
            );
            stats.excluded_videos += 1;
            continue;
        };
        if split_videos
            .insert(video.video_id.as_str(), (video, fps))
            .is_some()
        {
            warn!("Duplicate video id {}, keeping the last row", video.video_id);
        }
    }

    let frame_counts: HashMap<&str, i64> = split_videos
        .iter()
        .map(|(&id, (video, _))| (id, video.frame_count))
        .collect();
    let split_tracks = tracks
        .iter()
        .filter(|t| frame_counts.contains_key(t.video_id.as_str()));
    let mut expanded = expand_intervals(split_tracks, &frame_counts, resting_label);

    let mut rows = Vec::with_capacity(split_videos.len());
    for (video_id, (video, fps)) in split_videos {
        let target_frames = match expanded.remove(video_id) {
            Some(frames) => {
                stats.interval_frames += frames.target_frames.len();
                let target_frames = sample_resting_frames(&frames, video.frame_count, rng);
                stats.backfill_frames += target_frames.len() - frames.target_frames.len();
                target_frames
            }
            None => {
                warn!("Video {} has no non-resting tracks", video_id);
                Vec::new()
            }
        };

        rows.push(GuidanceRow {
            video_id: video_id.to_string(),
            target_frames,
            video_path: video.video_path.clone(),
            fps,
        });
    }
    stats.videos = rows.len();

    info!(
        "Split {}: {} cameras, {} videos ({} excluded), {} interval frames, {} backfill frames",
        split,
        stats.cameras,
        stats.videos,
        stats.excluded_videos,
        stats.interval_frames,
        stats.backfill_frames
    );

    SplitGuidance { split, rows, stats }
}

/// Run the whole engine on in-memory tables.
///
/// One generator is seeded from the config and shared by the camera partition
/// and, split after split, by the resting backfill.
pub fn build_split_guidance(
    videos: &[Video],
    tracks: &[Track],
    config: &GuidanceConfig,
) -> GuidanceResult<(CameraPartition, Vec<SplitGuidance>)> {
    config.validate()?;

    let mut rng = ChaCha8Rng::seed_from_u64(config.random_seed);

    let cameras = distinct_cameras(videos);
    if cameras.is_empty() {
        warn!("No cameras found, every split will be empty");
    }
    let partition = partition_cameras(&cameras, &config.split_ratio, &mut rng);

    let guidance = config
        .emitted_splits()
        .into_iter()
        .map(|split| {
            build_split(
                split,
                partition.get(split),
                videos,
                tracks,
                &config.resting_label,
                &mut rng,
            )
        })
        .collect();

    Ok((partition, guidance))
}

/// Write each split's table to `<output_dir>/<split>_lookup.ndjson`
pub fn write_split_guidance(
    output_dir: &Path,
    guidance: &[SplitGuidance],
) -> GuidanceResult<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(guidance.len());
    for split_guidance in guidance {
        let path = output_dir.join(split_guidance.split.lookup_file_name());
        write_ndjson(&path, &split_guidance.rows)?;
        info!(
            "Wrote {} rows ({} target frames) to {:?}",
            split_guidance.rows.len(),
            split_guidance.stats.total_frames(),
            path
        );
        written.push(path);
    }
    Ok(written)
}

/// Read the video and track tables, build and write the guidance tables
pub fn run_split_guidance(
    video_data_path: &Path,
    track_data_path: &Path,
    output_dir: &Path,
    config: &GuidanceConfig,
) -> GuidanceResult<Vec<PathBuf>> {
    let videos: Vec<Video> = read_ndjson(video_data_path)?;
    let tracks: Vec<Track> = read_ndjson(track_data_path)?;

    let (_, guidance) = build_split_guidance(&videos, &tracks, config)?;
    write_split_guidance(output_dir, &guidance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SplitRatios;
    use crate::error::GuidanceError;
    use std::fs;

    fn video(id: &str, camera: &str, frame_count: i64, duration: f64) -> Video {
        Video {
            video_id: id.to_string(),
            camera_id: camera.to_string(),
            frame_count,
            duration,
            video_path: format!("{}.mp4", id),
        }
    }

    fn track(video_id: &str, track_id: &str, label: &str, begin: i64, end: i64) -> Track {
        Track {
            video_id: video_id.to_string(),
            track_id: track_id.to_string(),
            label: label.to_string(),
            frame_begin: begin,
            frame_end: end,
        }
    }

    fn half_half_config(seed: u64) -> GuidanceConfig {
        GuidanceConfig {
            split_ratio: SplitRatios {
                train: 0.5,
                val: 0.5,
                test: 0.0,
            },
            random_seed: seed,
            ..GuidanceConfig::default()
        }
    }

    #[test]
    fn test_build_split_scenario() {
        let videos = vec![video("v1", "c1", 10, 1.0)];
        let tracks = vec![track("v1", "t1", "A", 1, 3), track("v1", "t2", "Resting", 4, 5)];
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let guidance = build_split(
            DatasetSplit::Train,
            &["c1".to_string()],
            &videos,
            &tracks,
            "Resting",
            &mut rng,
        );

        assert_eq!(guidance.rows.len(), 1);
        let row = &guidance.rows[0];
        assert_eq!(row.video_id, "v1");
        assert_eq!(row.fps, 10.0);
        assert_eq!(row.video_path, "v1.mp4");
        assert_eq!(row.target_frames.len(), 4);
        assert_eq!(&row.target_frames[..2], &[1, 2]);
        assert!(row.target_frames[2..].iter().all(|f| (3..=10).contains(f)));
        assert_eq!(guidance.stats.interval_frames, 2);
        assert_eq!(guidance.stats.backfill_frames, 2);
    }

    #[test]
    fn test_build_split_carries_video_without_tracks() {
        let videos = vec![video("v1", "c1", 10, 1.0), video("v2", "c1", 5, 0.5)];
        let tracks = vec![track("v1", "t1", "A", 1, 3)];
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let guidance = build_split(
            DatasetSplit::Val,
            &["c1".to_string()],
            &videos,
            &tracks,
            "Resting",
            &mut rng,
        );
        assert_eq!(guidance.rows.len(), 2);
        assert_eq!(guidance.rows[1].video_id, "v2");
        assert!(guidance.rows[1].target_frames.is_empty());
    }

    #[test]
    fn test_build_split_excludes_unusable_videos() {
        let videos = vec![
            video("v1", "c1", 10, 0.0),
            video("v2", "c1", 0, 1.0),
            video("v3", "c1", 40, 2.0),
        ];
        let tracks = vec![track("v1", "t1", "A", 1, 3), track("v3", "t3", "A", 1, 3)];
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let guidance = build_split(
            DatasetSplit::Train,
            &["c1".to_string()],
            &videos,
            &tracks,
            "Resting",
            &mut rng,
        );
        assert_eq!(guidance.stats.excluded_videos, 2);
        assert_eq!(guidance.rows.len(), 1);
        assert_eq!(guidance.rows[0].video_id, "v3");
        assert!((guidance.rows[0].fps - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_build_split_guidance_keeps_cameras_apart() {
        let videos: Vec<Video> = (0..12)
            .map(|i| video(&format!("v{:02}", i), &format!("c{}", i % 4), 30, 3.0))
            .collect();
        let tracks: Vec<Track> = videos
            .iter()
            .map(|v| track(&v.video_id, &format!("t-{}", v.video_id), "A", 2, 6))
            .collect();

        let (partition, guidance) =
            build_split_guidance(&videos, &tracks, &half_half_config(0)).unwrap();
        assert_eq!(guidance.len(), 2);
        assert_eq!(partition.train.len(), 2);
        assert_eq!(partition.val.len(), 2);

        let assignment = partition.assignment();
        for split_guidance in &guidance {
            assert_eq!(split_guidance.rows.len(), 6);
            for row in &split_guidance.rows {
                let camera = &videos.iter().find(|v| v.video_id == row.video_id).unwrap().camera_id;
                assert_eq!(assignment[camera.as_str()], split_guidance.split);

                let unique: HashSet<_> = row.target_frames.iter().collect();
                assert_eq!(unique.len(), row.target_frames.len());
                assert_eq!(row.target_frames.len(), 8);
            }
        }
    }

    #[test]
    fn test_build_split_guidance_test_split_optional() {
        let videos = vec![video("v1", "c1", 10, 1.0)];
        let mut config = GuidanceConfig::default();
        config.emit_test_split = true;

        let (_, guidance) = build_split_guidance(&videos, &[], &config).unwrap();
        let splits: Vec<DatasetSplit> = guidance.iter().map(|g| g.split).collect();
        assert_eq!(
            splits,
            vec![DatasetSplit::Train, DatasetSplit::Val, DatasetSplit::Test]
        );
    }

    #[test]
    fn test_build_split_guidance_rejects_bad_ratios() {
        let mut config = GuidanceConfig::default();
        config.split_ratio.val = 2.0;
        let err = build_split_guidance(&[], &[], &config).unwrap_err();
        assert!(matches!(err, GuidanceError::Config(_)));
    }

    #[test]
    fn test_build_split_guidance_empty_input() {
        let (partition, guidance) =
            build_split_guidance(&[], &[], &GuidanceConfig::default()).unwrap();
        assert_eq!(partition.total_cameras(), 0);
        assert!(guidance.iter().all(|g| g.rows.is_empty()));
    }

    fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
        let video_path = dir.join("video_data.ndjson");
        let track_path = dir.join("track_data.ndjson");
        fs::write(
            &video_path,
            concat!(
                "{\"video_id\":\"v1\",\"camera_id\":\"c1\",\"framesCount\":10,\"duration\":1.0,\"video_path\":\"path1.mp4\"}\n",
                "{\"video_id\":\"v2\",\"camera_id\":\"c2\",\"framesCount\":12,\"duration\":1.2,\"video_path\":\"path2.mp4\"}\n",
            ),
        )
        .unwrap();
        fs::write(
            &track_path,
            concat!(
                "{\"video_id\":\"v1\",\"track_id\":\"t1\",\"label\":\"A\",\"frame_begin\":1,\"frame_end\":3}\n",
                "{\"video_id\":\"v1\",\"track_id\":\"t2\",\"label\":\"Resting\",\"frame_begin\":4,\"frame_end\":5}\n",
                "{\"video_id\":\"v2\",\"track_id\":\"t3\",\"label\":\"B\",\"frame_begin\":1,\"frame_end\":5}\n",
            ),
        )
        .unwrap();
        (video_path, track_path)
    }

    #[test]
    fn test_run_split_guidance_writes_tables() {
        let dir = tempfile::tempdir().unwrap();
        let (video_path, track_path) = write_inputs(dir.path());
        let output = dir.path().join("guidance");

        let written =
            run_split_guidance(&video_path, &track_path, &output, &half_half_config(0)).unwrap();
        assert_eq!(
            written,
            vec![
                output.join("train_lookup.ndjson"),
                output.join("val_lookup.ndjson")
            ]
        );

        let train: Vec<GuidanceRow> = read_ndjson(&written[0]).unwrap();
        let val: Vec<GuidanceRow> = read_ndjson(&written[1]).unwrap();
        assert_eq!(train.len(), 1);
        assert_eq!(val.len(), 1);
        for row in train.iter().chain(&val) {
            assert!((row.fps - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_run_split_guidance_rejects_bad_ratios() {
        let dir = tempfile::tempdir().unwrap();
        let (video_path, track_path) = write_inputs(dir.path());
        let output = dir.path().join("guidance");
        let mut config = half_half_config(0);
        config.split_ratio.val = -0.5;

        let err = run_split_guidance(&video_path, &track_path, &output, &config).unwrap_err();
        assert!(matches!(err, GuidanceError::Config(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_run_split_guidance_is_byte_identical_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let (video_path, track_path) = write_inputs(dir.path());
        let first = dir.path().join("first");
        let second = dir.path().join("second");

        run_split_guidance(&video_path, &track_path, &first, &half_half_config(7)).unwrap();
        run_split_guidance(&video_path, &track_path, &second, &half_half_config(7)).unwrap();

        for name in ["train_lookup.ndjson", "val_lookup.ndjson"] {
            let a = fs::read(first.join(name)).unwrap();
            let b = fs::read(second.join(name)).unwrap();
            assert_eq!(a, b);
        }
    }
}
