use chrono::{DateTime, Local};
use std::fs::Metadata;
use std::time::SystemTime;

pub const EXCEL_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// Snapshot of one Excel file taken at scan time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadataRecord {
    pub name: String,
    pub size_bytes: u64,
    pub modified_at: DateTime<Local>,
}

impl FileMetadataRecord {
    /// Builds the record from a single stat result so size and mtime agree.
    #[must_use]
    pub fn from_metadata(name: String, metadata: &Metadata) -> Self {
        // UNIX_EPOCH when the platform cannot report mtime
        let modified_at: DateTime<Local> =
            metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH).into();

        FileMetadataRecord {
            name,
            size_bytes: metadata.len(),
            modified_at,
        }
    }
}

#[must_use]
pub fn is_excel_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    EXCEL_EXTENSIONS
        .iter()
        .any(|ext| lower.strip_suffix(ext).is_some_and(|rest| rest.ends_with('.')))
}
