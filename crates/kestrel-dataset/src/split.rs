//! Train/validation split of an `images/` + `labels/` dataset.
//!
//! Images are enumerated in sorted order, shuffled with a seeded ChaCha8
//! generator and cut at `floor(N * train_fraction)`. Each image is copied with
//! its same-named `.txt` label (when one exists) into
//! `<dest>/train/{images,labels}` or `<dest>/validation/{images,labels}`,
//! keeping the relative subdirectory structure.

use crate::error::{DatasetError, DatasetResult};
use crate::ingest::{IMAGES_DIR, LABELS_DIR};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Image extensions picked up by the split (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];
pub const LABEL_EXTENSION: &str = "txt";
pub const TRAIN_DIR: &str = "train";
pub const VALIDATION_DIR: &str = "validation";

/// Fraction of the dataset assigned to the training subset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatio {
    train: f64,
}

impl SplitRatio {
    /// Creates a split ratio; `train` must lie strictly between 0 and 1.
    pub fn new(train: f64) -> DatasetResult<Self> {
        if train > 0.0 && train < 1.0 {
            Ok(Self { train })
        } else {
            Err(DatasetError::InvalidSplitRatio(train))
        }
    }

    #[must_use]
    pub const fn train_fraction(&self) -> f64 {
        self.train
    }

    /// Number of items that go to the training subset.
    #[must_use]
    pub fn split_point(&self, total: usize) -> usize {
        (total as f64 * self.train).floor() as usize
    }
}

/// An image and its optional label, both as absolute source paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLabelPair {
    pub image: PathBuf,
    /// Path of the image relative to the `images` directory.
    pub relative: PathBuf,
    pub label: Option<PathBuf>,
}

impl ImageLabelPair {
    /// Relative path of the label file under `labels`.
    #[must_use]
    pub fn label_relative(&self) -> PathBuf {
        self.relative.with_extension(LABEL_EXTENSION)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subset {
    Train,
    Validation,
}

impl Subset {
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Train => TRAIN_DIR,
            Self::Validation => VALIDATION_DIR,
        }
    }
}

/// Directory layout of a materialized split.
#[derive(Debug, Clone)]
pub struct SplitLayout {
    root: PathBuf,
}

impl SplitLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn subset_dir(&self, subset: Subset) -> PathBuf {
        self.root.join(subset.dir_name())
    }

    #[must_use]
    pub fn images_dir(&self, subset: Subset) -> PathBuf {
        self.subset_dir(subset).join(IMAGES_DIR)
    }

    #[must_use]
    pub fn labels_dir(&self, subset: Subset) -> PathBuf {
        self.subset_dir(subset).join(LABELS_DIR)
    }

    /// Remove subset directories left by an earlier split.
    ///
    /// A subset directory that contains `source` is kept, so splitting a
    /// dataset into its own parent never deletes the input.
    pub fn reset(&self, source: &Path) -> DatasetResult<()> {
        for subset in [Subset::Train, Subset::Validation] {
            let dir = self.subset_dir(subset);
            if !dir.exists() {
                continue;
            }
            if source.starts_with(&dir) {
                warn!(dir = %dir.display(), "source dataset lives inside a split directory; not clearing it");
                continue;
            }
            debug!(dir = %dir.display(), "clearing previous split output");
            std::fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    pub fn ensure_dirs(&self) -> DatasetResult<()> {
        for subset in [Subset::Train, Subset::Validation] {
            std::fs::create_dir_all(self.images_dir(subset))?;
            std::fs::create_dir_all(self.labels_dir(subset))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub train_dir: PathBuf,
    pub validation_dir: PathBuf,
    pub train: Vec<ImageLabelPair>,
    pub validation: Vec<ImageLabelPair>,
    /// Source images that had no matching label file.
    pub missing_labels: Vec<PathBuf>,
    /// Seed that drove the shuffle; pass it back in to reproduce the split.
    pub seed: u64,
}

impl SplitOutcome {
    #[must_use]
    pub fn total(&self) -> usize {
        self.train.len() + self.validation.len()
    }
}

/// Enumerate every image under `dataset_root/images` and pair it with its label.
///
/// Fails with a structure error when `images` or `labels` is missing and with
/// an empty-dataset error when no image qualifies. Never writes to disk.
pub fn collect_pairs(dataset_root: &Path) -> DatasetResult<Vec<ImageLabelPair>> {
    let images_dir = dataset_root.join(IMAGES_DIR);
    let labels_dir = dataset_root.join(LABELS_DIR);
    if !images_dir.is_dir() || !labels_dir.is_dir() {
        return Err(DatasetError::structure(format!(
            "expected 'images' and 'labels' subdirectories under {}",
            dataset_root.display()
        )));
    }

    let mut pairs = Vec::new();
    for entry in WalkDir::new(&images_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_image(entry.path()) {
            continue;
        }

        let image = entry.path().to_path_buf();
        let relative = image
            .strip_prefix(&images_dir)
            .map_err(|_| DatasetError::structure(format!("{} escapes images/", image.display())))?
            .to_path_buf();
        let label = labels_dir.join(relative.with_extension(LABEL_EXTENSION));
        let label = label.is_file().then_some(label);

        pairs.push(ImageLabelPair { image, relative, label });
    }

    if pairs.is_empty() {
        return Err(DatasetError::EmptyDataset(images_dir));
    }

    pairs.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(pairs)
}

fn is_image(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = ext.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|allowed| *allowed == ext)
}

/// Shuffle `pairs` with `seed` and cut them into `(train, validation)`.
#[must_use]
pub fn assign(
    mut pairs: Vec<ImageLabelPair>,
    ratio: SplitRatio,
    seed: u64,
) -> (Vec<ImageLabelPair>, Vec<ImageLabelPair>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    pairs.shuffle(&mut rng);

    let split_index = ratio.split_point(pairs.len());
    let validation = pairs.split_off(split_index);
    (pairs, validation)
}

/// Seed derived from the wall clock, used when the caller gives none.
#[must_use]
pub fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Split the dataset at `dataset_root` into `destination_root`.
///
/// The ratio and the source layout are validated before anything is written.
/// Existing `train/` and `validation/` output under `destination_root` is
/// replaced.
pub fn split(
    dataset_root: &Path,
    destination_root: &Path,
    train_fraction: f64,
    seed: Option<u64>,
) -> DatasetResult<SplitOutcome> {
    let ratio = SplitRatio::new(train_fraction)?;
    let pairs = collect_pairs(dataset_root)?;
    let seed = seed.unwrap_or_else(time_seed);

    let (train, validation) = assign(pairs, ratio, seed);
    info!(
        total = train.len() + validation.len(),
        train = train.len(),
        validation = validation.len(),
        train_fraction,
        seed,
        "splitting dataset"
    );

    let layout = SplitLayout::new(destination_root.to_path_buf());
    layout.reset(dataset_root)?;
    layout.ensure_dirs()?;

    let mut missing_labels = Vec::new();
    for (subset, members) in [(Subset::Train, &train), (Subset::Validation, &validation)] {
        for pair in members {
            if !copy_pair(pair, &layout, subset)? {
                missing_labels.push(pair.image.clone());
            }
        }
    }

    if !missing_labels.is_empty() {
        warn!(count = missing_labels.len(), "images without labels were kept unlabeled");
    }

    Ok(SplitOutcome {
        train_dir: layout.subset_dir(Subset::Train),
        validation_dir: layout.subset_dir(Subset::Validation),
        train,
        validation,
        missing_labels,
        seed,
    })
}

/// Copy one pair into `subset`; returns whether a label was copied.
fn copy_pair(pair: &ImageLabelPair, layout: &SplitLayout, subset: Subset) -> DatasetResult<bool> {
    let dest_image = layout.images_dir(subset).join(&pair.relative);
    if let Some(parent) = dest_image.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(&pair.image, &dest_image)?;
    debug!(image = %pair.relative.display(), subset = subset.dir_name(), "copied image");

    let Some(label) = &pair.label else {
        warn!(image = %pair.image.display(), "missing label for image");
        return Ok(false);
    };

    let dest_label = layout.labels_dir(subset).join(pair.label_relative());
    if let Some(parent) = dest_label.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(label, &dest_label)?;
    Ok(true)
}
