//! File info command handler.

use anyhow::Result;

use dltrack_core::ports::DownloadTrackerPort;

use crate::bootstrap::CliContext;

/// Execute the file-info command.
///
/// Prints `{ "size": .., "mimeType": .. }` for a local path or `file://` URI.
pub async fn execute(ctx: &CliContext, path: &str) -> Result<()> {
    let info = ctx
        .tracker
        .get_file_info(path)
        .await
        .map_err(crate::error::CliError::from)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
