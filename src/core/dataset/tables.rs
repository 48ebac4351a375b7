//! Row types and newline-delimited JSON I/O for the pipeline's tables.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{GuidanceError, GuidanceResult};

/// Identifiers arrive either as strings or as integer ids (Label Studio `inner_id`)
#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Number(i64),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Text(text) => text,
        IdRepr::Number(number) => number.to_string(),
    })
}

/// One recorded video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    #[serde(deserialize_with = "deserialize_id")]
    pub video_id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub camera_id: String,
    #[serde(alias = "framesCount")]
    pub frame_count: i64,
    pub duration: f64,
    pub video_path: String,
}

impl Video {
    /// Playback frame rate, `None` when the row cannot yield one
    pub fn fps(&self) -> Option<f64> {
        if self.frame_count < 1 || !self.duration.is_finite() || self.duration <= 0.0 {
            return None;
        }
        Some(self.frame_count as f64 / self.duration)
    }
}

/// One annotated behavior interval of a single video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(deserialize_with = "deserialize_id")]
    pub video_id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub track_id: String,
    pub label: String,
    pub frame_begin: i64,
    pub frame_end: i64,
}

/// One bounding box keyframe, coordinates in percent of the frame size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxRow {
    #[serde(deserialize_with = "deserialize_id")]
    pub video_id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub track_id: String,
    pub frame: i64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Output row consumed by frame extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidanceRow {
    pub video_id: String,
    pub target_frames: Vec<i64>,
    pub video_path: String,
    pub fps: f64,
}

/// Read a newline-delimited JSON table. Blank lines are skipped.
pub fn read_ndjson<T: DeserializeOwned>(path: &Path) -> GuidanceResult<Vec<T>> {
    let file = fs::File::open(path).map_err(|e| GuidanceError::io(path, e))?;
    let reader = BufReader::new(file);

    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| GuidanceError::io(path, e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row = serde_json::from_str(line).map_err(|e| GuidanceError::Parse {
            path: path.to_path_buf(),
            line: idx + 1,
            message: e.to_string(),
        })?;
        rows.push(row);
    }

    info!("Read {} rows from {:?}", rows.len(), path);
    Ok(rows)
}

/// Write rows as newline-delimited JSON, replacing `path` only once the
/// whole table has been written.
pub fn write_ndjson<T: Serialize>(path: &Path, rows: &[T]) -> GuidanceResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| GuidanceError::io(parent, e))?;
    }

    let tmp_path = path.with_extension("ndjson.tmp");
    {
        let file = fs::File::create(&tmp_path).map_err(|e| GuidanceError::io(&tmp_path, e))?;
        let mut writer = BufWriter::new(file);
        for row in rows {
            serde_json::to_writer(&mut writer, row)?;
            writer
                .write_all(b"\n")
                .map_err(|e| GuidanceError::io(&tmp_path, e))?;
        }
        writer.flush().map_err(|e| GuidanceError::io(&tmp_path, e))?;
    }
    fs::rename(&tmp_path, path).map_err(|e| GuidanceError::io(path, e))?;

    debug!("Wrote {} rows to {:?}", rows.len(), path);
    Ok(())
}
