//! Filesystem collaborators: reading a label-partitioned dataset directory and
//! writing normalized images back into one.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use log::debug;

use crate::error::{PipelineError, Result};
use crate::pipeline::{Persistor, RawSample};

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PipelineError + '_ {
    move |source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .map_err(io_error(dir))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(io_error(dir))?;
    entries.sort();
    Ok(entries)
}

/// Reads every file below the immediate subdirectories of `root`, labelling
/// each with its subdirectory's name.
///
/// Samples come back in sorted path order and carry `<label>/<file name>` as
/// their identifier. Files are not decoded here, so a corrupt image surfaces as
/// a decode error inside the pipeline. Loose files directly under `root` are
/// ignored.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if a directory or file can't be read.
pub fn read_label_dirs(root: &Path) -> Result<Vec<RawSample>> {
    let mut samples = Vec::new();
    for dir in sorted_entries(root)? {
        if !dir.is_dir() {
            continue;
        }
        let label = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for file in sorted_entries(&dir)? {
            if !file.is_file() {
                continue;
            }
            let bytes = fs::read(&file).map_err(io_error(&file))?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            samples.push(RawSample::encoded(format!("{label}/{name}"), label.clone(), bytes));
        }
    }
    debug!("read {} samples from {}", samples.len(), root.display());
    Ok(samples)
}

/// Writes images to `<root>/<label>/<label>_<ordinal>.<ext>`, with the ordinal
/// zero-padded to three digits.
#[derive(Debug, Clone)]
pub struct LabelDirPersistor {
    root: PathBuf,
    format: ImageFormat,
}

impl LabelDirPersistor {
    /// A persistor writing JPEG files below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            format: ImageFormat::Jpeg,
        }
    }

    /// Like [`LabelDirPersistor::new`], but starts from an empty `root`.
    ///
    /// Anything already below `root` is deleted first, so files left by an
    /// earlier, larger run can't be read back as part of this one.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if the old contents can't be removed or the
    /// root can't be created.
    pub fn create_fresh(root: impl Into<PathBuf>) -> Result<Self> {
        let persistor = Self::new(root);
        let root = persistor.root.as_path();
        match fs::remove_dir_all(root) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(root)(e)),
        }
        fs::create_dir_all(root).map_err(io_error(root))?;
        debug!("cleared output root {}", root.display());
        Ok(persistor)
    }

    /// Switches the encoding of written files; the extension follows it.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Directory the label subdirectories are created in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an image of `label` at `ordinal` is written to.
    pub fn path_for(&self, label: &str, ordinal: usize) -> PathBuf {
        let extension = self.format.extensions_str().first().copied().unwrap_or("img");
        self.root
            .join(label)
            .join(format!("{label}_{ordinal:03}.{extension}"))
    }
}

impl Persistor for LabelDirPersistor {
    fn persist(&self, image: &RgbImage, label: &str, ordinal: usize) -> Result<()> {
        let dir = self.root.join(label);
        // Workers race to create the same label directory; `create_dir_all`
        // succeeds if it already exists.
        fs::create_dir_all(&dir).map_err(io_error(&dir))?;

        let path = self.path_for(label, ordinal);
        image
            .save_with_format(&path, self.format)
            .map_err(|source| PipelineError::Persist { path, source })
    }
}
