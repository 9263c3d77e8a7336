//! Command handlers.
//!
//! Handlers follow one pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - Thin wrappers that parse CLI-specific input, call the tracker and
//!   format output for the terminal.

pub mod file_info;
pub mod simulate;
pub mod version;
