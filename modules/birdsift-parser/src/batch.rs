// Batch conversion of saved search-result files into parsed tweet files.
// One output file per input file; a bad input file becomes an error object
// on disk rather than stopping the run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::Value;
use tracing::{info, warn};

use crate::normalize::{parse_tweet_entry, ParsedRecord};

/// Accounting for one input file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub file_name: String,
    pub output_file: PathBuf,
    /// Records written, including per-record error markers. Zero when the
    /// whole file failed to parse.
    pub records: usize,
}

/// Accounting for a whole directory run. Same input bytes, same counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub files_processed: usize,
    pub total_records: usize,
    pub files: Vec<FileReport>,
}

/// Convert every `*.json` file in `input_dir` into `parsed_<name>` in
/// `output_dir`, in file-name order. Creates `output_dir` if needed. Only
/// output-side I/O aborts the run; input failures degrade per file.
pub fn process_directory(input_dir: &Path, output_dir: &Path) -> Result<BatchSummary> {
    fs::create_dir_all(output_dir)?;

    let mut file_names: Vec<String> = fs::read_dir(input_dir)?
        .filter_map(|entry| {
            let entry = entry.ok()?;
            if !entry.path().is_file() {
                return None;
            }
            let name = entry.file_name().to_str()?.to_string();
            name.ends_with(".json").then_some(name)
        })
        .collect();
    file_names.sort();

    let mut summary = BatchSummary::default();
    for name in file_names {
        let input_path = input_dir.join(&name);
        let output_path = output_dir.join(format!("parsed_{name}"));

        let (body, records) = match parse_results_file(&input_path) {
            Ok(parsed) => {
                let count = parsed.len();
                (serde_json::to_string_pretty(&parsed)?, count)
            }
            Err(message) => {
                warn!(file = %name, error = %message, "failed to parse results file");
                let marker =
                    serde_json::json!({ "error": format!("Failed to parse file: {message}") });
                (serde_json::to_string_pretty(&marker)?, 0)
            }
        };

        fs::write(&output_path, body)?;
        info!(file = %name, records, "parsed results file");

        summary.files_processed += 1;
        summary.total_records += records;
        summary.files.push(FileReport {
            file_name: name,
            output_file: output_path,
            records,
        });
    }

    Ok(summary)
}

/// Read and normalize one results file. The error string feeds the on-disk
/// error object, so it stays human-readable.
fn parse_results_file(path: &Path) -> std::result::Result<Vec<ParsedRecord>, String> {
    let raw = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let data: Value = serde_json::from_str(&raw).map_err(|e| e.to_string())?;
    let entries = data
        .as_array()
        .ok_or_else(|| "expected a JSON array of results".to_string())?;
    Ok(entries.iter().map(parse_tweet_entry).collect())
}
