//! Version command handler.

use anyhow::Result;

use dltrack_download::DownloadTrackerImpl;

/// Execute the version command.
pub fn execute() -> Result<()> {
    println!("dltrack {}", DownloadTrackerImpl::version());
    Ok(())
}
