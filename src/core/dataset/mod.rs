mod label_studio;
mod split;
mod tables;

pub use label_studio::{import_label_studio_export, LabelStudioTables};
pub use split::DatasetSplit;
pub use tables::{read_ndjson, write_ndjson, BoxRow, GuidanceRow, Track, Video};
