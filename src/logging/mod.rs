//! Logging module for the frame guidance pipeline
//!
//! This module provides:
//! - Custom log formatting with bracketed output
//! - Dual logging (file + stdout)
//! - Log file management with timestamps

mod formatter;
mod setup;

// Re-export the public API
pub use formatter::BracketedFormatter;
pub use setup::setup_logging;
