//! Writing property sets back to disk

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::properties::Properties;

/// Where and how to write a property set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Output file
    pub output: PathBuf,
    /// Write entries ordered by key
    pub sort: bool,
}

impl WriteOptions {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            sort: false,
        }
    }

    /// Order entries by key
    pub fn with_sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }
}

/// Ensure `path` can be written as a file, creating missing parent directories
pub fn validate_output(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Err(Error::invalid_output(
            path.display().to_string(),
            "outputFile must be a file and not a directory",
        ));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::io(parent.display().to_string(), &e))?;
    }

    Ok(())
}

/// Write `properties` to the configured output without a timestamp header
pub fn write_properties(properties: &Properties, options: &WriteOptions) -> Result<()> {
    validate_output(&options.output)?;

    let text = properties.to_properties_string(options.sort);
    std::fs::write(&options.output, text).map_err(|e| {
        log::error!("Error writing properties: {}", options.output.display());
        Error::io(options.output.display().to_string(), &e)
    })
}
