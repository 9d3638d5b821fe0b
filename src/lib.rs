pub mod cache;
pub mod command;
pub mod config;
pub mod error;
pub mod report;
pub mod scanner;
pub mod tools;
pub mod types;

pub use cache::{Clock, ManualClock, MemoryBank, SystemClock};
pub use command::{AnalyzeCommand, SaveCommand, parse_analyze, parse_save};
pub use error::{ToolError, UpstreamError};
pub use scanner::{ExcelScanner, ScanCache};
pub use tools::{Analysis, Analyst, Table, ToolArgs, Toolbox};
pub use types::FileMetadataRecord;
