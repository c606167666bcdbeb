//! Output writer
//!
//! Persists a pipeline result as the crew's single output file and prints
//! the result with a confirmation line.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::crew::{OutputFormat, OutputSpec};
use crate::error::{Error, Result};
use crate::pipeline::PipelineResult;

/// CSV header row
pub const CSV_HEADER: [&str; 4] = ["agent", "task_description", "expected_output", "output"];

/// Writes results into an output directory
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where `target` will be written
    pub fn path_for(&self, target: &OutputSpec) -> PathBuf {
        if self.dir.as_os_str().is_empty() || self.dir == Path::new(".") {
            PathBuf::from(&target.file)
        } else {
            self.dir.join(&target.file)
        }
    }

    /// Write `result` in the format `target` asks for, replacing any existing file
    pub fn write(&self, result: &PipelineResult, target: &OutputSpec) -> Result<PathBuf> {
        let path = self.path_for(target);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        match target.format {
            OutputFormat::Markdown => write_markdown(&path, &result.final_text)?,
            OutputFormat::Csv => write_csv(&path, result)?,
        }

        info!(
            crew = %result.crew,
            path = %path.display(),
            format = %target.format,
            "Output written"
        );
        Ok(path)
    }

    /// Print the result text followed by the export confirmation
    pub fn announce(&self, result: &PipelineResult, path: &Path, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{}", result.final_text)?;
        writeln!(out, "\n\nThese results have been exported to {}", path.display())?;
        out.flush()
    }
}

fn write_markdown(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).map_err(|e| Error::IoWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

/// One row per non-export task, in execution order
fn write_csv(path: &Path, result: &PipelineResult) -> Result<()> {
    let csv_err = |source: csv::Error| Error::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(CSV_HEADER).map_err(csv_err)?;
    for output in result.data_outputs() {
        writer
            .write_record([
                output.role.as_str(),
                output.description.as_str(),
                output.expected_output.as_str(),
                output.raw.as_str(),
            ])
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|e| Error::IoWrite {
        path: path.to_path_buf(),
        source: e,
    })
}
