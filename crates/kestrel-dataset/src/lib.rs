//! Kestrel Dataset
//!
//! Filesystem-side dataset preparation for detection training:
//! - Extracting dataset archives and locating the dataset root (`ingest`)
//! - Seeded train/validation splitting (`split`)
//! - Writing and reading the `data.yaml` manifest (`manifest`)
//! - The combined archive → manifest workflow (`prepare`)

pub mod error;
pub mod ingest;
pub mod manifest;
pub mod prepare;
pub mod split;

pub use error::{DatasetError, DatasetResult};
pub use ingest::{discover_root, extract, ArchiveKind, DatasetRoot, RootDiscovery, CLASS_LIST_FILE};
pub use manifest::{
    audit_split_labels, read_class_names, read_manifest, write_manifest, LabelFinding, Manifest, MANIFEST_FILE,
};
pub use prepare::{prepare_from_archive, PreparedDataset, EXTRACTION_DIR};
pub use split::{split, ImageLabelPair, SplitLayout, SplitOutcome, SplitRatio, Subset};
