//! Backfill of unlabeled ("resting") frames up to the dominant label count.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::interval_expander::VideoFrames;

/// Quota decision for one video
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillQuota {
    pub max_count: usize,
    pub already_used: usize,
    /// Frames requested before capping to the complement size
    pub quota: usize,
}

/// Decide how many resting frames a video should receive.
///
/// The target is the dominant label count; when the frames left over after
/// annotation (`frame_count - already_used`) cannot cover it, all of them are
/// requested instead. A saturated video gets 0.
pub fn backfill_quota(frames: &VideoFrames, frame_count: i64) -> BackfillQuota {
    let max_count = frames.max_count();
    let already_used = frames.already_used();
    let available = frame_count.saturating_sub(already_used as i64);

    let quota = if max_count as i64 > available {
        available
    } else {
        max_count as i64
    };

    BackfillQuota {
        max_count,
        already_used,
        quota: quota.max(0) as usize,
    }
}

/// Frames of `1..=frame_count` not yet selected. `selected` must be sorted.
pub fn complement_frames(selected: &[i64], frame_count: i64) -> Vec<i64> {
    (1..=frame_count)
        .filter(|frame| selected.binary_search(frame).is_err())
        .collect()
}

/// Append sampled resting frames to a video's target frames.
///
/// Samples without replacement from the complement, never more frames than
/// the complement holds. The sampled frames are appended in ascending order
/// after the interval-derived frames.
pub fn sample_resting_frames<R: Rng + ?Sized>(
    frames: &VideoFrames,
    frame_count: i64,
    rng: &mut R,
) -> Vec<i64> {
    let decision = backfill_quota(frames, frame_count);
    let mut target_frames = frames.target_frames.clone();

    if decision.quota == 0 {
        debug!(
            "No backfill: max_count={}, already_used={}, frame_count={}",
            decision.max_count, decision.already_used, frame_count
        );
        return target_frames;
    }

    let complement = complement_frames(&frames.target_frames, frame_count);
    let amount = decision.quota.min(complement.len());
    if amount < decision.quota {
        debug!(
            "Complement holds {} frames, capping quota {}",
            complement.len(),
            decision.quota
        );
    }

    let mut sampled: Vec<i64> = complement.choose_multiple(rng, amount).copied().collect();
    sampled.sort_unstable();

    debug!(
        "Backfilled {} resting frames (max_count={}, already_used={})",
        sampled.len(),
        decision.max_count,
        decision.already_used
    );

    target_frames.extend(sampled);
    target_frames
}
