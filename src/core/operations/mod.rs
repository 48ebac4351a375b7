mod yolo_labels;

pub use yolo_labels::{
    frame_file_stem, label_file_content, parse_label_file, remap_target_frames, run_label_export,
    write_split_labels, YoloDetection, BIRD_CLASS_ID,
};
