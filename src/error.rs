use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

/// Failures at the tool boundary. `Display` is the text handed back to the user.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("[Error] The file '{}' does not exist.", .0.display())]
    NotFound(PathBuf),

    #[error("[Error] Invalid format. Use: {usage}")]
    Format { usage: &'static str },

    #[error("[Error] Analysis failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("[Error] Could not read the Excel file: {0}")]
    Unreadable(String),

    #[error("[Error] '{0}' must be a plain file name inside the data directory.")]
    OutsideDataDir(String),
}

/// Error raised by an analysis backend.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("no analysis backend is configured")]
    Unconfigured,

    #[error("could not load '{}': {reason}", .path.display())]
    Load { path: PathBuf, reason: String },

    #[error("{0}")]
    Backend(String),

    #[error("could not write '{}': {source}", .path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
