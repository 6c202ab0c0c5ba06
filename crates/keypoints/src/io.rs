//! JSON persistence for every dataset shape.
//!
//! Trees mirror the dataset nesting on disk with one [`KEYPOINTS_FILE`] per
//! leaf, each holding the single-entry document `{ label: leaf }`:
//!
//! - [`Dataset`]: `<root>/<category>/<label>/keypoints.json`
//! - [`AugmentedDataset`]: `<root>/<label>/version_<n>/keypoints.json`
//! - [`SplitDataset`]: `<root>/<train|test>/<category>/<label>/keypoints.json`
//!
//! Reading a missing file is an error. Writing creates directories as needed
//! and overwrites without merging; a failed leaf write is logged and the
//! remaining leaves are still written.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use strum::IntoEnumIterator;
use tracing::{debug, error, info};

use crate::{
    dataset::{AugmentedDataset, Dataset, Split, SplitDataset},
    utils, KeypointsError, PointSequence, Result,
};

/// File name of every leaf document.
pub const KEYPOINTS_FILE: &str = "keypoints.json";

const VERSION_PREFIX: &str = "version_";

/// Outcome of writing a tree of leaf documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

impl WriteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn merge(&mut self, other: WriteReport) {
        self.written.extend(other.written);
        self.failed.extend(other.failed);
    }

    /// Log and record the outcome of writing `path`.
    pub fn record(&mut self, path: PathBuf, outcome: Result<()>) {
        match outcome {
            Ok(()) => {
                debug!("Wrote {}", path.display());
                self.written.push(path);
            }
            Err(e) => {
                error!("Failed to write {}: {}", path.display(), e);
                self.failed.push(path);
            }
        }
    }
}

/// Read and deserialize a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(KeypointsError::MissingInput {
            path: path.display().to_string(),
        });
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Serialize a value to a JSON document, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    fs::write(path, content)?;
    Ok(())
}

fn write_leaf<V: Serialize>(path: &Path, label: &str, value: &V) -> Result<()> {
    let document: BTreeMap<&str, &V> = BTreeMap::from([(label, value)]);
    write_json(path, &document, false)
}

fn read_leaf<V: DeserializeOwned>(path: &Path, label: &str) -> Result<V> {
    let mut document: BTreeMap<String, V> = read_json(path)?;
    document.remove(label).ok_or_else(|| KeypointsError::InvalidValue {
        message: format!("{} has no entry for label '{}'", path.display(), label),
    })
}

impl<V: Serialize + DeserializeOwned> Dataset<V> {
    /// Save the whole dataset as one nested JSON document
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json(path.as_ref(), self, true)
    }

    /// Load a dataset from one nested JSON document
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_json(path.as_ref())
    }

    /// Write one leaf document per `(category, label)` under `root`.
    pub fn write_tree<P: AsRef<Path>>(&self, root: P) -> WriteReport {
        let root = root.as_ref();
        let mut report = WriteReport::default();
        for (category, label, value) in self.iter() {
            let path = root.join(category).join(label).join(KEYPOINTS_FILE);
            let outcome = write_leaf(&path, label, value);
            report.record(path, outcome);
        }
        report
    }

    /// Read a tree written by [`Dataset::write_tree`].
    pub fn read_tree<P: AsRef<Path>>(root: P) -> Result<Self> {
        let mut dataset = Dataset::new();
        for (category, category_path) in utils::subdirectories(root.as_ref())? {
            for (label, label_path) in utils::subdirectories(&category_path)? {
                let value = read_leaf(&label_path.join(KEYPOINTS_FILE), &label)?;
                dataset.insert(category.clone(), label, value);
            }
        }
        Ok(dataset)
    }
}

impl AugmentedDataset {
    /// Write every variant to `<root>/<label>/version_<n>/keypoints.json`, `n` from 1.
    pub fn write_tree<P: AsRef<Path>>(&self, root: P) -> WriteReport {
        let root = root.as_ref();
        let mut report = WriteReport::default();
        for (label, variants) in &self.labels {
            for (index, variant) in variants.iter().enumerate() {
                let path = root
                    .join(label)
                    .join(format!("{}{}", VERSION_PREFIX, index + 1))
                    .join(KEYPOINTS_FILE);
                let outcome = write_leaf(&path, label, variant);
                report.record(path, outcome);
            }
        }
        info!(
            "Augmented data: {} files written, {} failed",
            report.written.len(),
            report.failed.len()
        );
        report
    }

    /// Read a tree written by [`AugmentedDataset::write_tree`], variants in version order.
    pub fn read_tree<P: AsRef<Path>>(root: P) -> Result<Self> {
        let mut dataset = AugmentedDataset::new();
        for (label, label_path) in utils::subdirectories(root.as_ref())? {
            let mut versions: Vec<(usize, PathBuf)> = utils::subdirectories(&label_path)?
                .into_iter()
                .filter_map(|(name, path)| {
                    let index = name.strip_prefix(VERSION_PREFIX)?.parse().ok()?;
                    Some((index, path))
                })
                .collect();
            versions.sort_by_key(|(index, _)| *index);

            let variants = versions
                .iter()
                .map(|(_, path)| read_leaf::<PointSequence>(&path.join(KEYPOINTS_FILE), &label))
                .collect::<Result<Vec<_>>>()?;
            dataset.labels.insert(label, variants);
        }
        Ok(dataset)
    }
}

impl SplitDataset {
    /// Write both partitions to `<root>/<train|test>/<category>/<label>/keypoints.json`.
    pub fn write_tree<P: AsRef<Path>>(&self, root: P) -> WriteReport {
        let root = root.as_ref();
        let mut report = WriteReport::default();
        for split in Split::iter() {
            let side = self.side(split).write_tree(root.join(split.to_string()));
            info!("{} data: {} files written", split, side.written.len());
            report.merge(side);
        }
        report
    }

    /// Read a tree written by [`SplitDataset::write_tree`].
    pub fn read_tree<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let mut dataset = SplitDataset::new();
        for split in Split::iter() {
            *dataset.side_mut(split) = Dataset::read_tree(root.join(split.to_string()))?;
        }
        Ok(dataset)
    }
}
