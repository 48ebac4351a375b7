//! YOLO label materialization for guidance target frames.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::dataset::{read_ndjson, BoxRow, DatasetSplit, GuidanceRow};
use crate::error::{GuidanceError, GuidanceResult};

/// Every box is exported as the single "bird" class
pub const BIRD_CLASS_ID: u32 = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct YoloDetection {
    pub class_id: u32,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl YoloDetection {
    /// Convert a top-left box given in percent of the frame to normalized
    /// center coordinates.
    pub fn from_percent_box(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            class_id: BIRD_CLASS_ID,
            x_center: (x + width / 2.0) / 100.0,
            y_center: (y + height / 2.0) / 100.0,
            width: width / 100.0,
            height: height / 100.0,
        }
    }

    /// Format: class_id x_center y_center width height
    pub fn to_line(&self) -> String {
        format!(
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, self.x_center, self.y_center, self.width, self.height
        )
    }
}

/// Parse a YOLO format label file.
///
/// # Returns
/// * `Some(detections)` if the file exists and can be read; malformed lines are skipped
/// * `None` if the file doesn't exist or cannot be read
pub fn parse_label_file(label_path: &Path) -> Option<Vec<YoloDetection>> {
    let content = fs::read_to_string(label_path).ok()?;

    let mut detections = Vec::new();
    for line in content.lines() {
        let values: Vec<&str> = line.split_whitespace().collect();
        if values.len() != 5 {
            continue;
        }
        if let (Ok(class_id), Ok(x), Ok(y), Ok(w), Ok(h)) = (
            values[0].parse::<u32>(),
            values[1].parse::<f64>(),
            values[2].parse::<f64>(),
            values[3].parse::<f64>(),
            values[4].parse::<f64>(),
        ) {
            detections.push(YoloDetection {
                class_id,
                x_center: x,
                y_center: y,
                width: w,
                height: h,
            });
        }
    }

    Some(detections)
}

/// Ratio native/guidance fps, `None` when either rate is unusable
fn fps_scale(guidance_fps: f64, native_fps: f64) -> Option<f64> {
    let usable = |fps: f64| fps.is_finite() && fps > 0.0;
    if usable(guidance_fps) && usable(native_fps) {
        Some(native_fps / guidance_fps)
    } else {
        None
    }
}

fn remap_frame(frame: i64, scale: Option<f64>) -> i64 {
    match scale {
        Some(scale) => (frame as f64 * scale).round() as i64,
        None => frame,
    }
}

/// Map guidance frames (annotation fps) onto native video frames.
///
/// Rounded to the nearest frame, deduplicated and sorted. Without a usable
/// fps pair the frames are only sorted and deduplicated.
pub fn remap_target_frames(frames: &[i64], guidance_fps: f64, native_fps: f64) -> Vec<i64> {
    let scale = fps_scale(guidance_fps, native_fps);
    frames
        .iter()
        .map(|&frame| remap_frame(frame, scale))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Deterministic image/label file stem for one frame of a video
pub fn frame_file_stem(video_id: &str, frame: i64) -> String {
    let safe_id: String = video_id
        .chars()
        .map(|c| if c == '/' || c == '\\' { '.' } else { c })
        .collect();
    format!("{}_frame_{:04}", safe_id, frame)
}

/// Label file content: one newline-terminated line per detection
pub fn label_file_content(detections: &[YoloDetection]) -> String {
    detections
        .iter()
        .map(|d| format!("{}\n", d.to_line()))
        .collect()
}

/// Write `labels/<split>/<stem>.txt` for every target frame of every row.
///
/// Boxes are looked up by (video, guidance frame) and written under the
/// remapped native frame number. `native_fps` overrides the guidance fps; a
/// frame without boxes gets an empty label file.
pub fn write_split_labels(
    rows: &[GuidanceRow],
    boxes: &[BoxRow],
    output_dir: &Path,
    split: DatasetSplit,
    native_fps: Option<f64>,
) -> GuidanceResult<Vec<PathBuf>> {
    let labels_dir = output_dir.join("labels").join(split.as_str());
    fs::create_dir_all(&labels_dir).map_err(|e| GuidanceError::io(&labels_dir, e))?;

    let mut boxes_by_frame: HashMap<(&str, i64), Vec<YoloDetection>> = HashMap::new();
    for b in boxes {
        boxes_by_frame
            .entry((b.video_id.as_str(), b.frame))
            .or_default()
            .push(YoloDetection::from_percent_box(b.x, b.y, b.width, b.height));
    }

    let mut written = Vec::new();
    for row in rows {
        let scale = fps_scale(row.fps, native_fps.unwrap_or(row.fps));

        // native frame -> detections, merged when two guidance frames collapse
        let mut frames: BTreeMap<i64, Vec<YoloDetection>> = BTreeMap::new();
        for &frame in &row.target_frames {
            let entry = frames.entry(remap_frame(frame, scale)).or_default();
            if let Some(detections) = boxes_by_frame.get(&(row.video_id.as_str(), frame)) {
                entry.extend(detections.iter().cloned());
            }
        }

        if frames.len() < row.target_frames.len() {
            debug!(
                "Video {}: {} target frames collapse to {} native frames (scale {:.3})",
                row.video_id,
                row.target_frames.len(),
                frames.len(),
                scale.unwrap_or(1.0)
            );
        }

        for (frame, detections) in frames {
            let label_path = labels_dir.join(format!("{}.txt", frame_file_stem(&row.video_id, frame)));
            fs::write(&label_path, label_file_content(&detections))
                .map_err(|e| GuidanceError::io(&label_path, e))?;
            written.push(label_path);
        }
    }

    info!(
        "Wrote {} label files for {} videos to {:?}",
        written.len(),
        rows.len(),
        labels_dir
    );
    Ok(written)
}

/// Write label files for every split lookup table found in `guidance_dir`
pub fn run_label_export(
    guidance_dir: &Path,
    box_data_path: &Path,
    output_dir: &Path,
    native_fps: Option<f64>,
) -> GuidanceResult<usize> {
    let boxes: Vec<BoxRow> = read_ndjson(box_data_path)?;

    let mut total = 0;
    for split in DatasetSplit::all() {
        let lookup_path = guidance_dir.join(split.lookup_file_name());
        if !lookup_path.exists() {
            debug!("No lookup table for {} at {:?}", split, lookup_path);
            continue;
        }
        let rows: Vec<GuidanceRow> = read_ndjson(&lookup_path)?;
        total += write_split_labels(&rows, &boxes, output_dir, split, native_fps)?.len();
    }

    info!("Label export complete: {} label files", total);
    Ok(total)
}
