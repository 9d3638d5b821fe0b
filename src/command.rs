use crate::error::{Result, ToolError};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

pub const ANALYZE_USAGE: &str = "<file.xlsx>: <instruction>";
pub const SAVE_USAGE: &str = "<input.xlsx>: <instruction>; guardar como <output.xlsx> \
     (or give the output name when asked)";

static ANALYZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?\.xlsx?)\s*:\s*(.+)").expect("Invalid regex")
});

static SAVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?\.xlsx?)\s*:\s*(.+?)(?:;\s*guardar como\s*(.+\.xlsx?))?$")
        .expect("Invalid regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeCommand {
    pub file_name: String,
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveCommand {
    pub file_name: String,
    pub instruction: String,
    /// `None` means the user still has to be asked for a name.
    pub output: Option<String>,
}

impl AnalyzeCommand {
    pub fn new(file_name: impl Into<String>, instruction: impl Into<String>) -> Self {
        AnalyzeCommand {
            file_name: file_name.into(),
            instruction: instruction.into(),
        }
    }
}

impl SaveCommand {
    pub fn new(
        file_name: impl Into<String>,
        instruction: impl Into<String>,
        output: Option<String>,
    ) -> Self {
        SaveCommand {
            file_name: file_name.into(),
            instruction: instruction.into(),
            output,
        }
    }
}

impl fmt::Display for AnalyzeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file_name, self.instruction)
    }
}

impl fmt::Display for SaveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file_name, self.instruction)?;
        if let Some(output) = &self.output {
            write!(f, "; guardar como {output}")?;
        }
        Ok(())
    }
}

/// Splits `<file.xlsx>: <instruction>` at the first `.xlsx:`/`.xls:`.
pub fn parse_analyze(input: &str) -> Result<AnalyzeCommand> {
    let caps = ANALYZE_RE
        .captures(input.trim())
        .ok_or(ToolError::Format {
            usage: ANALYZE_USAGE,
        })?;

    Ok(AnalyzeCommand::new(caps[1].trim(), caps[2].trim()))
}

/// Like `parse_analyze`, with an optional `; guardar como <out.xlsx>` suffix
/// naming the file the resulting table is written to.
pub fn parse_save(input: &str) -> Result<SaveCommand> {
    let caps = SAVE_RE
        .captures(input.trim())
        .ok_or(ToolError::Format { usage: SAVE_USAGE })?;

    let output = caps.get(3).map(|m| m.as_str().trim().to_string());
    Ok(SaveCommand::new(caps[1].trim(), caps[2].trim(), output))
}
