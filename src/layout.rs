//! Paths of run logs and report artifacts below the log root

use std::path::{Path, PathBuf};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::parser::LogEncoding;
use crate::rollup::AggregateMode;

/// Log tree: `<root>/<size>/<file>-<variant>-<rep>.log[.gz]` plus reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLayout {
    root: PathBuf,
    encoding: LogEncoding,
}

impl LogLayout {
    /// Create a layout rooted at `root`
    pub fn new(root: impl Into<PathBuf>, encoding: LogEncoding) -> Self {
        Self {
            root: root.into(),
            encoding,
        }
    }

    /// Log root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Encoding of run logs
    pub fn encoding(&self) -> LogEncoding {
        self.encoding
    }

    /// Directory holding one size class's logs
    pub fn size_dir(&self, size_dir: &str) -> PathBuf {
        self.root.join(size_dir)
    }

    /// Log artifact of one repetition
    pub fn run_log(&self, size_dir: &str, file_name: &str, variant: &str, repetition: usize) -> PathBuf {
        self.size_dir(size_dir).join(format!(
            "{file_name}-{variant}-{repetition}.{}",
            self.encoding.extension()
        ))
    }

    /// Report stem (no extension) for one instance of one variant
    pub fn instance_report(
        &self,
        size_dir: &str,
        file_name: &str,
        variant: &str,
        mode: AggregateMode,
    ) -> PathBuf {
        self.size_dir(size_dir)
            .join(format!("{file_name}-{variant}{}", mode.suffix()))
    }

    /// Report stem (no extension) for one size class
    pub fn size_report(&self, size_dir: &str, mode: AggregateMode) -> PathBuf {
        self.root.join(format!("{size_dir}{}", mode.suffix()))
    }

    /// Report stem (no extension) for the overall table
    pub fn overall_report(&self, mode: AggregateMode) -> PathBuf {
        self.root.join(format!("summary{}", mode.suffix()))
    }

    /// Create the root and one directory per size class
    pub fn prepare(&self, catalog: &Catalog) -> Result<()> {
        for class in catalog.classes() {
            let dir = self.size_dir(&class.dir_name);
            std::fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        }
        std::fs::create_dir_all(&self.root).map_err(|e| Error::io(&self.root, e))
    }
}
