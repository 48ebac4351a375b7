//! Flattening of a Label Studio video export into video, track and box tables.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::tables::{write_ndjson, BoxRow, Track, Video};
use crate::error::{GuidanceError, GuidanceResult};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TaskId {
    Number(i64),
    Text(String),
}

impl TaskId {
    fn into_string(self) -> String {
        match self {
            TaskId::Number(n) => n.to_string(),
            TaskId::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExportTask {
    inner_id: TaskId,
    #[serde(default)]
    total_annotations: u32,
    data: TaskData,
    #[serde(default)]
    annotations: Vec<ExportAnnotation>,
}

#[derive(Debug, Deserialize)]
struct TaskData {
    video: String,
    #[serde(rename = "framesCount")]
    frames_count: i64,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct ExportAnnotation {
    #[serde(default)]
    result: Vec<ExportResult>,
}

#[derive(Debug, Deserialize)]
struct ExportResult {
    id: String,
    value: ResultValue,
}

#[derive(Debug, Default, Deserialize)]
struct ResultValue {
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    sequence: Vec<SequenceItem>,
}

#[derive(Debug, Deserialize)]
struct SequenceItem {
    frame: Option<i64>,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
}

/// Tables produced from one export
#[derive(Debug, Clone, Default)]
pub struct LabelStudioTables {
    pub videos: Vec<Video>,
    pub tracks: Vec<Track>,
    pub boxes: Vec<BoxRow>,
}

impl LabelStudioTables {
    /// Write `video_data.ndjson`, `track_data.ndjson` and `box_data.ndjson`
    pub fn write(&self, output_dir: &Path) -> GuidanceResult<Vec<PathBuf>> {
        fs::create_dir_all(output_dir).map_err(|e| GuidanceError::io(output_dir, e))?;

        let video_path = output_dir.join("video_data.ndjson");
        let track_path = output_dir.join("track_data.ndjson");
        let box_path = output_dir.join("box_data.ndjson");

        write_ndjson(&video_path, &self.videos)?;
        write_ndjson(&track_path, &self.tracks)?;
        write_ndjson(&box_path, &self.boxes)?;

        info!(
            "Wrote {} videos, {} tracks, {} boxes to {:?}",
            self.videos.len(),
            self.tracks.len(),
            self.boxes.len(),
            output_dir
        );
        Ok(vec![video_path, track_path, box_path])
    }
}

/// Camera = the directory that directly holds the video file
fn camera_from_path(video_path: &str) -> Option<String> {
    Path::new(video_path)
        .parent()
        .and_then(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().to_string())
}

fn decode_video_path(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            warn!("Could not URL-decode video path {:?}: {}", raw, e);
            raw.to_string()
        }
    }
}

/// Parse a Label Studio JSON export and flatten it into tables.
///
/// Tasks without annotations are skipped. Every keyframe becomes a box; only
/// labelled results become tracks. A track spans from the first to the
/// last keyframe of its sequence; a single keyframe yields `frame_begin ==
/// frame_end`, which interval expansion widens later.
pub fn import_label_studio_export(export_path: &Path) -> GuidanceResult<LabelStudioTables> {
    info!("Importing Label Studio export from {:?}", export_path);

    let contents =
        fs::read_to_string(export_path).map_err(|e| GuidanceError::io(export_path, e))?;
    let tasks: Vec<ExportTask> =
        serde_json::from_str(&contents).map_err(|e| GuidanceError::Parse {
            path: export_path.to_path_buf(),
            line: e.line(),
            message: e.to_string(),
        })?;

    let mut tables = LabelStudioTables::default();
    let mut skipped = 0;

    for task in tasks {
        if task.total_annotations == 0 {
            skipped += 1;
            continue;
        }

        let video_id = task.inner_id.into_string();
        let video_path = decode_video_path(&task.data.video);
        let camera_id = camera_from_path(&video_path).unwrap_or_else(|| {
            warn!("Video {} has no parent directory in {:?}", video_id, video_path);
            "unknown".to_string()
        });

        tables.videos.push(Video {
            video_id: video_id.clone(),
            camera_id,
            frame_count: task.data.frames_count,
            duration: task.data.duration,
            video_path,
        });

        // track_id -> (label, first frame, last frame)
        let mut spans: BTreeMap<String, (String, i64, i64)> = BTreeMap::new();

        for result in task.annotations.into_iter().flat_map(|a| a.result) {
            let label = result.value.labels.first().cloned();
            if label.is_none() {
                debug!("Result {} of video {} has no label, keeping boxes only", result.id, video_id);
            }

            for item in &result.value.sequence {
                let Some(frame) = item.frame else {
                    continue;
                };

                tables.boxes.push(BoxRow {
                    video_id: video_id.clone(),
                    track_id: result.id.clone(),
                    frame,
                    x: item.x,
                    y: item.y,
                    width: item.width,
                    height: item.height,
                });

                if let Some(label) = &label {
                    spans
                        .entry(result.id.clone())
                        .and_modify(|span| span.2 = frame)
                        .or_insert_with(|| (label.clone(), frame, frame));
                }
            }
        }

        for (track_id, (label, frame_begin, frame_end)) in spans {
            tables.tracks.push(Track {
                video_id: video_id.clone(),
                track_id,
                label,
                frame_begin,
                frame_end,
            });
        }
    }

    info!(
        "Imported {} videos and {} tracks ({} tasks without annotations skipped)",
        tables.videos.len(),
        tables.tracks.len(),
        skipped
    );
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"
    [
      {
        "inner_id": 1,
        "total_annotations": 1,
        "data": {
          "video": "/data/bunting_clips/H7%2CI22/08.mp4",
          "framesCount": 100,
          "duration": 3.2
        },
        "annotations": [
          {
            "id": 10,
            "result": [
              {
                "id": "r1",
                "value": {
                  "labels": ["Flying"],
                  "sequence": [
                    {"frame": 4, "x": 10, "y": 20, "width": 30, "height": 40},
                    {"frame": 9, "x": 12, "y": 22, "width": 30, "height": 40}
                  ]
                }
              },
              {
                "id": "r2",
                "value": {
                  "labels": ["Resting"],
                  "sequence": [
                    {"frame": 1, "x": 50, "y": 50, "width": 10, "height": 10},
                    {"frame": null, "x": 0, "y": 0, "width": 0, "height": 0}
                  ]
                }
              }
            ]
          }
        ]
      },
      {
        "inner_id": 2,
        "total_annotations": 0,
        "data": {"video": "/data/bunting_clips/A1/01.mp4", "framesCount": 10, "duration": 1.0},
        "annotations": []
      }
    ]
    "#;

    fn write_export(dir: &Path) -> PathBuf {
        let path = dir.join("export.json");
        fs::write(&path, EXPORT).unwrap();
        path
    }

    #[test]
    fn test_import_flattens_export() {
        let dir = tempfile::tempdir().unwrap();
        let tables = import_label_studio_export(&write_export(dir.path())).unwrap();

        assert_eq!(tables.videos.len(), 1);
        let video = &tables.videos[0];
        assert_eq!(video.video_id, "1");
        assert_eq!(video.video_path, "/data/bunting_clips/H7,I22/08.mp4");
        assert_eq!(video.camera_id, "H7,I22");
        assert_eq!(video.frame_count, 100);
        assert_eq!(video.duration, 3.2);

        assert_eq!(tables.tracks.len(), 2);
        let flying = tables.tracks.iter().find(|t| t.track_id == "r1").unwrap();
        assert_eq!(flying.label, "Flying");
        assert_eq!((flying.frame_begin, flying.frame_end), (4, 9));

        // Single keyframe is kept as a point annotation
        let resting = tables.tracks.iter().find(|t| t.track_id == "r2").unwrap();
        assert_eq!((resting.frame_begin, resting.frame_end), (1, 1));

        assert_eq!(tables.boxes.len(), 3);
    }

    #[test]
    fn test_import_writes_tables() {
        let dir = tempfile::tempdir().unwrap();
        let tables = import_label_studio_export(&write_export(dir.path())).unwrap();
        let out = dir.path().join("tables");
        let written = tables.write(&out).unwrap();

        assert_eq!(written.len(), 3);
        for path in &written {
            assert!(path.exists());
        }
        let videos: Vec<Video> = super::super::read_ndjson(&out.join("video_data.ndjson")).unwrap();
        assert_eq!(videos, tables.videos);
    }

    #[test]
    fn test_import_keeps_boxes_of_unlabeled_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        let export = r#"[{
            "inner_id": 5,
            "total_annotations": 1,
            "data": {"video": "/data/A1/05.mp4", "framesCount": 20, "duration": 2.0},
            "annotations": [{"result": [
                {"id": "r1", "value": {"sequence": [
                    {"frame": 3, "x": 10, "y": 10, "width": 20, "height": 20}
                ]}}
            ]}]
        }]"#;
        fs::write(&path, export).unwrap();

        let tables = import_label_studio_export(&path).unwrap();
        assert_eq!(tables.boxes.len(), 1);
        assert_eq!(tables.boxes[0].track_id, "r1");
        assert_eq!(tables.boxes[0].frame, 3);
        assert!(tables.tracks.is_empty());
    }

    #[test]
    fn test_import_rejects_malformed_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        fs::write(&path, "[{\"inner_id\": 1}]").unwrap();
        assert!(matches!(
            import_label_studio_export(&path),
            Err(GuidanceError::Parse { .. })
        ));
    }
}
