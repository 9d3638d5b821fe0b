use crate::cache::{Clock, SystemClock};
use crate::command::{AnalyzeCommand, SaveCommand, parse_analyze, parse_save};
use crate::error::{Result, ToolError, UpstreamError};
use crate::scanner::ExcelScanner;
use comfy_table::{Table as TextTable, presets};
use log::{info, warn};
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

pub const LIST_TOOL: &str = "listar_archivos_excel";
pub const METADATA_TOOL: &str = "metadata_archivos_excel";
pub const ANALYZE_TOOL: &str = "analizar_excel";
pub const SAVE_TOOL: &str = "analizar_y_guardar_excel";

const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
}

/// Tool names and descriptions to register with the agent.
pub const TOOLS: [ToolSpec; 4] = [
    ToolSpec {
        name: LIST_TOOL,
        description: "Lists every Excel file available in the data directory.",
    },
    ToolSpec {
        name: METADATA_TOOL,
        description: "Returns name, size and last modification time of the Excel files in the data directory.",
    },
    ToolSpec {
        name: ANALYZE_TOOL,
        description: "Answers a natural-language question about one Excel file. Usage: '<file.xlsx>: <instruction>'.",
    },
    ToolSpec {
        name: SAVE_TOOL,
        description: "Analyzes an Excel file and saves the resulting table to a new Excel file. \
            Usage: '<input.xlsx>: <instruction>; guardar como <output.xlsx>'. \
            If no output name is given, ask the user for one.",
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    #[must_use]
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Plain column-aligned text, no borders.
    #[must_use]
    pub fn render(&self) -> String {
        let mut table = TextTable::new();
        table.load_preset(presets::NOTHING);
        table.set_header(self.columns.clone());
        for row in &self.rows {
            table.add_row(row.clone());
        }
        table.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Analysis {
    Table(Table),
    Text(String),
}

/// The dataframe engine the analysis tools delegate to.
pub trait Analyst: Send + Sync {
    fn analyze(&self, source: &Path, instruction: &str) -> std::result::Result<Analysis, UpstreamError>;

    fn export(&self, table: &Table, destination: &Path) -> std::result::Result<(), UpstreamError>;
}

/// Arguments as the agent passes them to `dispatch`.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    pub filename: Option<String>,
    pub query: Option<String>,
    pub output_filename: Option<String>,
}

/// Agent-facing tools. Every entry point returns the text shown to the user;
/// failures are folded into `[Error] ...` messages instead of escaping.
pub struct Toolbox<C: Clock = SystemClock> {
    scanner: ExcelScanner<C>,
    data_dir: PathBuf,
    analyst: Option<Arc<dyn Analyst>>,
}

impl<C: Clock> Toolbox<C> {
    pub fn new(scanner: ExcelScanner<C>, data_dir: impl Into<PathBuf>) -> Self {
        Toolbox {
            scanner,
            data_dir: data_dir.into(),
            analyst: None,
        }
    }

    #[must_use]
    pub fn with_analyst(mut self, analyst: Arc<dyn Analyst>) -> Self {
        self.analyst = Some(analyst);
        self
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn list_files(&self) -> String {
        let files = self.scanner.list_excel_files(&self.data_dir);
        if files.is_empty() {
            return format!("No Excel files found in {}.", self.data_dir.display());
        }
        format!("Available Excel files: {}", files.join(", "))
    }

    #[must_use]
    pub fn files_metadata(&self) -> String {
        let records = self.scanner.get_excel_files_metadata(&self.data_dir);
        if records.is_empty() {
            return format!(
                "No Excel file metadata found in {}.",
                self.data_dir.display()
            );
        }

        let mut msg = String::from("Excel file metadata:\n");
        for r in &records {
            let _ = writeln!(
                msg,
                "- {} | {} bytes | Last modified: {}",
                r.name,
                r.size_bytes,
                r.modified_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
        msg
    }

    #[must_use]
    pub fn analyze(&self, command: &str) -> String {
        self.try_analyze(command).unwrap_or_else(|e| e.to_string())
    }

    #[must_use]
    pub fn analyze_and_save(&self, command: &str) -> String {
        self.try_analyze_and_save(command)
            .unwrap_or_else(|e| e.to_string())
    }

    /// Routes a tool call by its agent-facing name.
    #[must_use]
    pub fn dispatch(&self, tool: &str, args: &ToolArgs) -> String {
        match tool {
            LIST_TOOL => self.list_files(),
            METADATA_TOOL => self.files_metadata(),
            ANALYZE_TOOL => match (&args.filename, &args.query) {
                (Some(file), Some(query)) => {
                    self.analyze(&AnalyzeCommand::new(file.as_str(), query.as_str()).to_string())
                }
                _ => "Error: a file name and a query are required.".to_string(),
            },
            SAVE_TOOL => match (&args.filename, &args.query) {
                (Some(file), Some(query)) => {
                    let cmd = SaveCommand::new(
                        file.as_str(),
                        query.as_str(),
                        args.output_filename.clone(),
                    );
                    self.analyze_and_save(&cmd.to_string())
                }
                _ => "Error: a file name and a query are required.".to_string(),
            },
            other => {
                let known: Vec<_> = TOOLS.iter().map(|t| t.name).collect();
                format!("Error: unknown tool '{other}'. Available: {}.", known.join(", "))
            }
        }
    }

    fn try_analyze(&self, command: &str) -> Result<String> {
        let cmd = parse_analyze(command)?;
        let source = self.existing_input(&cmd.file_name)?;
        let analyst = self.analyst()?;

        match analyst
            .analyze(&source, &cmd.instruction)
            .map_err(upstream)?
        {
            Analysis::Table(table) => Ok(table.render()),
            Analysis::Text(text) => Ok(text),
        }
    }

    fn try_analyze_and_save(&self, command: &str) -> Result<String> {
        let cmd = parse_save(command)?;
        let source = self.existing_input(&cmd.file_name)?;

        let Some(output) = cmd.output else {
            return Ok("What name should the result file be saved under? \
                Please reply with the desired name (for example: result.xlsx)"
                .to_string());
        };

        let analyst = self.analyst()?;
        match analyst
            .analyze(&source, &cmd.instruction)
            .map_err(upstream)?
        {
            Analysis::Table(table) => {
                let destination = self.data_path(&output)?;
                analyst.export(&table, &destination).map_err(upstream)?;
                info!("saved analysis of {} to {}", cmd.file_name, destination.display());

                Ok(format!(
                    "Result saved to {}.\nPreview of the first rows:\n{}",
                    destination.display(),
                    table.head(PREVIEW_ROWS).render()
                ))
            }
            Analysis::Text(text) => Ok(format!(
                "The analysis result is not a table, so it cannot be saved to Excel. \
                 Result obtained: {text}"
            )),
        }
    }

    /// Joins `name` to the data directory, refusing anything but plain names.
    fn data_path(&self, name: &str) -> Result<PathBuf> {
        let path = Path::new(name);
        let plain = path.components().next().is_some()
            && path.components().all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(ToolError::OutsideDataDir(name.to_string()));
        }
        Ok(self.data_dir.join(path))
    }

    fn existing_input(&self, file_name: &str) -> Result<PathBuf> {
        let path = self.data_path(file_name)?;
        if path.exists() {
            Ok(path)
        } else {
            Err(ToolError::NotFound(path))
        }
    }

    fn analyst(&self) -> Result<&dyn Analyst> {
        self.analyst
            .as_deref()
            .ok_or(ToolError::Upstream(UpstreamError::Unconfigured))
    }
}

fn upstream(e: UpstreamError) -> ToolError {
    warn!("analysis backend failed: {e}");
    match e {
        UpstreamError::Load { reason, .. } => ToolError::Unreadable(reason),
        other => ToolError::Upstream(other),
    }
}
