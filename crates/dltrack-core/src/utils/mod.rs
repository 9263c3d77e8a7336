//! Shared utilities.

pub mod file_info;

pub use file_info::{FileInfo, file_info, mime_from_path};
