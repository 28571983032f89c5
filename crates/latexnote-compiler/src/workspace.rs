use log::{debug, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Source file written into every workspace.
pub const SOURCE_FILE: &str = "document.tex";
/// PDF the engines are expected to leave next to the source.
pub const OUTPUT_FILE: &str = "document.pdf";

const WORKSPACE_PREFIX: &str = "latexnote-";

/// An exclusively owned, uniquely named scratch directory for one request.
///
/// The directory tree is removed when the guard is dropped, which covers
/// the happy path, early returns, panics and cancellation of the owning
/// future alike. Removal failures are logged and swallowed.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Creates the directory (under `root`, or the system temp dir) and
    /// writes `source` into [`SOURCE_FILE`] as UTF-8.
    pub fn create(root: Option<&Path>, source: &str) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let path = dir.path().to_path_buf();

        // `dir` is dropped (and removed) if the write fails.
        fs::write(path.join(SOURCE_FILE), source.as_bytes())?;
        debug!("Created workspace {}", path.display());

        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source_path(&self) -> PathBuf {
        self.path.join(SOURCE_FILE)
    }

    pub fn output_path(&self) -> PathBuf {
        self.path.join(OUTPUT_FILE)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => debug!("Removed workspace {}", self.path.display()),
                Err(e) => warn!("Failed to remove workspace {}: {}", self.path.display(), e),
            }
        }
    }
}
