//! Expansion of annotated track intervals into per-video frame sets.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Range;
use tracing::debug;

use crate::core::dataset::Track;

/// Frame occurrences per non-resting label within one video
pub type LabelCounts = BTreeMap<String, usize>;

/// Interval-derived frames and label counts of one video
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoFrames {
    /// Sorted, duplicate-free union of all expanded track frames
    pub target_frames: Vec<i64>,
    /// Counted on the per-track expansion, before deduplication across tracks
    pub label_counts: LabelCounts,
}

impl VideoFrames {
    /// Largest label count, 0 without labels
    pub fn max_count(&self) -> usize {
        self.label_counts.values().copied().max().unwrap_or(0)
    }

    /// Sum of all label counts. Overlapping tracks are counted once per track.
    pub fn already_used(&self) -> usize {
        self.label_counts.values().sum()
    }
}

/// Frame range covered by a track.
///
/// A point annotation (`frame_begin == frame_end`) extends to the end of the
/// video: `[frame_begin, frame_count)`.
pub fn expand_track(track: &Track, frame_count: i64) -> Range<i64> {
    if track.frame_begin == track.frame_end {
        track.frame_begin..frame_count
    } else {
        track.frame_begin..track.frame_end
    }
}

/// Expand all non-resting tracks into per-video frame sets and label counts.
///
/// `frame_counts` maps the videos of the current split to their frame count;
/// tracks of other videos are ignored. Frames outside `[1, frame_count]` are
/// dropped. Videos without any non-resting frame are absent from the result.
pub fn expand_intervals<'a, I>(
    tracks: I,
    frame_counts: &HashMap<&str, i64>,
    resting_label: &str,
) -> BTreeMap<String, VideoFrames>
where
    I: IntoIterator<Item = &'a Track>,
{
    let mut frame_sets: BTreeMap<String, BTreeSet<i64>> = BTreeMap::new();
    let mut counts: BTreeMap<String, LabelCounts> = BTreeMap::new();

    for track in tracks {
        if track.label == resting_label {
            continue;
        }
        let Some(&frame_count) = frame_counts.get(track.video_id.as_str()) else {
            continue;
        };

        let range = expand_track(track, frame_count);
        let mut occurrences = 0;
        let mut dropped = 0;
        let frames = frame_sets.entry(track.video_id.clone()).or_default();
        for frame in range {
            if frame < 1 || frame > frame_count {
                dropped += 1;
                continue;
            }
            frames.insert(frame);
            occurrences += 1;
        }

        if dropped > 0 {
            debug!(
                "Track {} of video {} has {} frames outside [1, {}]",
                track.track_id, track.video_id, dropped, frame_count
            );
        }

        if occurrences > 0 {
            *counts
                .entry(track.video_id.clone())
                .or_default()
                .entry(track.label.clone())
                .or_insert(0) += occurrences;
        }
    }

    frame_sets
        .into_iter()
        .filter(|(_, frames)| !frames.is_empty())
        .map(|(video_id, frames)| {
            let label_counts = counts.remove(&video_id).unwrap_or_default();
            let video_frames = VideoFrames {
                target_frames: frames.into_iter().collect(),
                label_counts,
            };
            (video_id, video_frames)
        })
        .collect()
}
