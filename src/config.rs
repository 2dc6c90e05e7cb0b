//! Output naming

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_DIR: &str = "inputMasstree";
pub const DEFAULT_FILE_PREFIX: &str = "inMT_";

/// Where converted traces are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Directory that replaces the trace's own directory
    pub output_dir: PathBuf,
    /// Prepended to the trace file name
    pub file_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }
}

impl OutputConfig {
    pub fn new(output_dir: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            file_prefix: file_prefix.into(),
        }
    }

    /// Output path for a trace file, e.g. `indexFiles/foo` -> `inputMasstree/inMT_foo`
    pub fn output_path(&self, input: &Path) -> Result<PathBuf> {
        Ok(self.output_dir.join(self.prefixed_name(input)?))
    }

    /// Output path for a trace found under `root`, keeping its subdirectories,
    /// e.g. `indexFiles/a/PK` under `indexFiles` -> `inputMasstree/a/inMT_PK`
    pub fn output_path_under(&self, root: &Path, input: &Path) -> Result<PathBuf> {
        let relative = input
            .strip_prefix(root)
            .map_err(|_| anyhow!("{} is not under {}", input.display(), root.display()))?;

        let dir = match relative.parent() {
            Some(parent) => self.output_dir.join(parent),
            None => self.output_dir.clone(),
        };
        Ok(dir.join(self.prefixed_name(relative)?))
    }

    fn prefixed_name(&self, input: &Path) -> Result<String> {
        let name = input
            .file_name()
            .ok_or_else(|| anyhow!("Invalid trace file name: {}", input.display()))?;

        let mut file_name = self.file_prefix.clone();
        file_name.push_str(&name.to_string_lossy());
        Ok(file_name)
    }
}
