mod guidance_config;

pub use guidance_config::{GuidanceConfig, SplitRatios};
