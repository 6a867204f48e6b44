use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use netsim_core::Application;

pub mod scenario_runner;

/// An [`Application`] that streams everything it receives straight to a
/// file on disk, under `directory` with `prefix` and a numeric suffix so
/// several concurrent flows land in distinct files. I/O errors are
/// reported to the driver, not swallowed into the simulation core.
pub struct FileAppHandler {
    path: PathBuf,
    file: File,
}

impl FileAppHandler {
    pub fn create(directory: &Path, prefix: &str, index: usize) -> Result<Self> {
        std::fs::create_dir_all(directory)
            .with_context(|| format!("creating received-files directory {}", directory.display()))?;
        let path = directory.join(format!("{prefix}.{index}"));
        let file = File::create(&path)
            .with_context(|| format!("creating received file {}", path.display()))?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Application for FileAppHandler {
    fn receive_data(&mut self, data: &[u8]) {
        // A full reliable-delivery core guarantees in-order bytes; a
        // write failure here is a disk/environment problem, not a
        // network event, so it is only logged, matching the core's
        // error-handling split between data-plane and I/O failures.
        if let Err(err) = self.file.write_all(data) {
            tracing::error!(path = %self.path.display(), error = %err, "failed to write received data");
        }
    }
}
