//! Balanced frame sampling and camera-level split assignment for building
//! frame-level object-detection training sets from sparse video annotations.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;

pub use config::{GuidanceConfig, SplitRatios};
pub use error::{GuidanceError, GuidanceResult};
