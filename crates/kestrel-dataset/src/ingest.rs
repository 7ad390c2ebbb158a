//! Archive extraction and dataset root discovery.
//!
//! An archive is unpacked into a working directory which is then scanned
//! breadth-first for the first directory holding both an `images` and a
//! `labels` entry.

use crate::error::{DatasetError, DatasetResult};
use flate2::read::GzDecoder;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const IMAGES_DIR: &str = "images";
pub const LABELS_DIR: &str = "labels";
pub const CLASS_LIST_FILE: &str = "classes.txt";

/// Container formats accepted as dataset archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
    Tar,
}

impl ArchiveKind {
    /// Detect the container kind from the file signature.
    pub fn detect(path: &Path) -> DatasetResult<Self> {
        let file = File::open(path)
            .map_err(|e| DatasetError::archive(format!("cannot open {}: {e}", path.display())))?;
        let mut header = Vec::with_capacity(512);
        file.take(512).read_to_end(&mut header)?;

        if header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06") {
            return Ok(Self::Zip);
        }
        if header.starts_with(&[0x1f, 0x8b]) {
            return Ok(Self::TarGz);
        }
        if header.len() >= 262 && &header[257..262] == b"ustar" {
            return Ok(Self::Tar);
        }

        Err(DatasetError::archive(format!("unrecognized archive format: {}", path.display())))
    }
}

/// How a dataset root was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootDiscovery {
    /// A directory with both `images` and `labels` children was found.
    Found,
    /// Nothing matched; the extraction root is returned as-is.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRoot {
    pub path: PathBuf,
    pub discovery: RootDiscovery,
}

impl DatasetRoot {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path, discovery: RootDiscovery::Found }
    }

    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.path.join(IMAGES_DIR)
    }

    #[must_use]
    pub fn labels_dir(&self) -> PathBuf {
        self.path.join(LABELS_DIR)
    }

    #[must_use]
    pub fn class_list_path(&self) -> PathBuf {
        self.path.join(CLASS_LIST_FILE)
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.discovery == RootDiscovery::Fallback
    }
}

/// Extract `archive_path` into `destination` and locate the dataset root.
///
/// The destination is created when absent and does not need to be empty.
/// Removing the extracted files afterwards is the caller's job.
pub fn extract(archive_path: &Path, destination: &Path) -> DatasetResult<DatasetRoot> {
    if !archive_path.is_file() {
        return Err(DatasetError::archive(format!("archive not found: {}", archive_path.display())));
    }

    let kind = ArchiveKind::detect(archive_path)?;
    std::fs::create_dir_all(destination)?;

    info!(
        archive = %archive_path.display(),
        destination = %destination.display(),
        ?kind,
        "extracting archive"
    );

    let reader = BufReader::new(File::open(archive_path)?);
    match kind {
        ArchiveKind::Zip => {
            let mut zip = zip::ZipArchive::new(reader)?;
            zip.extract(destination)?;
        }
        ArchiveKind::TarGz => unpack_tar(GzDecoder::new(reader), destination)?,
        ArchiveKind::Tar => unpack_tar(reader, destination)?,
    }

    discover_root(destination)
}

fn unpack_tar<R: Read>(reader: R, destination: &Path) -> DatasetResult<()> {
    tar::Archive::new(reader)
        .unpack(destination)
        .map_err(|e| DatasetError::archive(format!("failed to unpack tar archive: {e}")))
}

/// Breadth-first search for the first directory containing `images` and `labels`.
///
/// `root` itself is checked first and siblings are visited in name order, so
/// the result is stable for a given tree.
pub fn discover_root(root: &Path) -> DatasetResult<DatasetRoot> {
    let mut queue = VecDeque::from([root.to_path_buf()]);

    while let Some(dir) = queue.pop_front() {
        if has_dataset_children(&dir) {
            info!(root = %dir.display(), "detected dataset root");
            return Ok(DatasetRoot::new(dir));
        }

        let mut children = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                children.push(entry.path());
            }
        }
        children.sort();
        debug!(dir = %dir.display(), children = children.len(), "scanning for dataset root");
        queue.extend(children);
    }

    warn!(
        root = %root.display(),
        "no directory with both images/ and labels/ found; falling back to extraction root"
    );
    Ok(DatasetRoot { path: root.to_path_buf(), discovery: RootDiscovery::Fallback })
}

fn has_dataset_children(dir: &Path) -> bool {
    dir.join(IMAGES_DIR).exists() && dir.join(LABELS_DIR).exists()
}
