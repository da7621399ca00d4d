//! Append-only log of full separation error texts

use crate::error::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Name of the error log inside the base directory
pub const ERROR_LOG_NAME: &str = "separation_errors.log";

#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped record
    pub fn append(&self, detail: &str) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let stamp = chrono::Local::now().format("%a %b %e %H:%M:%S %Y");
        writeln!(file, "[{}] Error: {}\n", stamp, detail)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_appends_records() {
        let dir = TempDir::new().unwrap();
        let log = ErrorLog::new(dir.path().join(ERROR_LOG_NAME));
        log.append("first\nwith detail").unwrap();
        log.append("second").unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.matches("] Error: ").count(), 2);
        assert!(text.contains("first\nwith detail"));
        assert!(text.ends_with("second\n\n"));
    }
}
