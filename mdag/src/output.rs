//! Output formatting for CLI commands.
//!
//! Every command result goes through [`OutputWriter`], which prints either
//! human-readable text or a pretty JSON document.

use anyhow::Result;
use mdag_core::{BuildStats, Digest, ObjectKind};
use serde::Serialize;
use std::io::{self, Write};

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writer for command output with format abstraction.
pub struct OutputWriter {
    format: OutputFormat,
    stdout: io::Stdout,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            stdout: io::stdout(),
        }
    }

    /// Write output using the configured format.
    ///
    /// `data` must carry `success` and `result_code` fields. `text_fn` is
    /// only called in text mode.
    pub fn write<T: Serialize>(&self, data: &T, text_fn: impl FnOnce() -> String) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                writeln!(&self.stdout, "{}", json)?;
            }
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(&self.stdout, "{}", text)?;
                }
            }
        }
        Ok(())
    }

    /// Write an error to stderr, as a JSON object with `success: false` in
    /// JSON mode.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        match self.format {
            OutputFormat::Json => {
                let error_output = ErrorOutput {
                    success: false,
                    result_code,
                    error: format!("{:#}", error),
                };
                if let Ok(json) = serde_json::to_string_pretty(&error_output) {
                    let _ = writeln!(io::stderr(), "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(io::stderr(), "Error: {:#}", error);
            }
        }
    }
}

// ============================================================================
// Data Transfer Objects (DTOs) for JSON output
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// Output for `init` command.
#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub result_code: u8,
    pub root: String,
    pub algorithm: String,
    pub block_size: usize,
    pub fanout: usize,
}

/// One root produced by `add`.
#[derive(Debug, Clone, Serialize)]
pub struct AddedRoot {
    pub hash: Digest,
    pub path: String,
    pub kind: ObjectKind,
    pub size: u64,
}

/// Output for `add` command.
#[derive(Debug, Serialize)]
pub struct AddOutput {
    pub success: bool,
    pub result_code: u8,
    pub dry_run: bool,
    pub roots: Vec<AddedRoot>,
    pub stats: BuildStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_follows_flag() {
        assert_eq!(OutputWriter::new(true).format, OutputFormat::Json);
        assert_eq!(OutputWriter::new(false).format, OutputFormat::Text);
    }

    #[test]
    fn test_add_output_json_shape() {
        let output = AddOutput {
            success: true,
            result_code: 0,
            dry_run: true,
            roots: vec![AddedRoot {
                hash: Digest::from_bytes(vec![0xab; 4]),
                path: "data".to_string(),
                kind: ObjectKind::Tree,
                size: 12,
            }],
            stats: BuildStats::default(),
        };

        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["dry_run"], true);
        assert_eq!(value["roots"][0]["hash"], "abababab");
        assert_eq!(value["roots"][0]["kind"], "tree");
        assert_eq!(value["stats"]["objects_written"], 0);
    }

    #[test]
    fn test_error_output_json_shape() {
        let output = ErrorOutput {
            success: false,
            result_code: 1,
            error: "boom".to_string(),
        };
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["result_code"], 1);
        assert_eq!(value["error"], "boom");
    }
}
