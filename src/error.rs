use std::path::PathBuf;

/// Result type for guidance operations
pub type GuidanceResult<T> = Result<T, GuidanceError>;

/// Error types for the frame guidance pipeline
#[derive(Debug)]
pub enum GuidanceError {
    /// Malformed or out-of-range configuration
    Config(String),
    /// File system failure on a specific path
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A row of an input table could not be decoded
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    /// Serialization failure not tied to a file position
    Json(serde_json::Error),
}

impl GuidanceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GuidanceError::Io {
            path: path.into(),
            source,
        }
    }
}

impl std::fmt::Display for GuidanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuidanceError::Config(msg) => write!(f, "Configuration error: {}", msg),
            GuidanceError::Io { path, source } => write!(f, "I/O error on {:?}: {}", path, source),
            GuidanceError::Parse {
                path,
                line,
                message,
            } => write!(f, "Parse error in {:?} at line {}: {}", path, line, message),
            GuidanceError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for GuidanceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GuidanceError::Io { source, .. } => Some(source),
            GuidanceError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GuidanceError {
    fn from(error: serde_json::Error) -> Self {
        GuidanceError::Json(error)
    }
}
