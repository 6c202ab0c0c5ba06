use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{KeypointsError, PointSequence, Result, VideoKeypoints};

/// Three-level dataset: category -> label -> leaf value.
///
/// Serialized as the nested JSON object `{ category: { label: leaf } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset<V> {
    pub categories: BTreeMap<String, Category<V>>,
}

/// The labels of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category<V> {
    pub labels: BTreeMap<String, V>,
}

/// Raw detector output, one video per label.
pub type KeypointsDataset = Dataset<VideoKeypoints>;

/// Same shape as [`KeypointsDataset`] with every coordinate rescaled into `[0, 1]`.
pub type NormalizedDataset = Dataset<VideoKeypoints>;

impl<V> Default for Category<V> {
    fn default() -> Self {
        Self {
            labels: BTreeMap::new(),
        }
    }
}

impl<V> Default for Dataset<V> {
    fn default() -> Self {
        Self {
            categories: BTreeMap::new(),
        }
    }
}

impl<V> Dataset<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a leaf, replacing any previous value for the same key pair.
    pub fn insert(&mut self, category: impl Into<String>, label: impl Into<String>, value: V) -> Option<V> {
        self.categories
            .entry(category.into())
            .or_default()
            .labels
            .insert(label.into(), value)
    }

    pub fn get(&self, category: &str, label: &str) -> Option<&V> {
        self.categories.get(category)?.labels.get(label)
    }

    /// `(category, label, leaf)` triples in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &V)> {
        self.categories.iter().flat_map(|(category, entry)| {
            entry
                .labels
                .iter()
                .map(move |(label, value)| (category.as_str(), label.as_str(), value))
        })
    }

    pub fn label_count(&self) -> usize {
        self.categories.values().map(|c| c.labels.len()).sum()
    }

    /// Transform every leaf, keeping the category/label structure.
    pub fn map<U>(&self, mut f: impl FnMut(&V) -> U) -> Dataset<U> {
        let categories = self
            .categories
            .iter()
            .map(|(name, category)| {
                let labels = category
                    .labels
                    .iter()
                    .map(|(label, value)| (label.clone(), f(value)))
                    .collect();
                (name.clone(), Category { labels })
            })
            .collect();
        Dataset { categories }
    }

    /// Collapse the category level, keyed by label alone.
    pub fn by_label(&self) -> Result<BTreeMap<String, &V>> {
        let mut labels = BTreeMap::new();
        for (_, label, value) in self.iter() {
            if labels.insert(label.to_string(), value).is_some() {
                return Err(KeypointsError::DuplicateLabel {
                    label: label.to_string(),
                });
            }
        }
        Ok(labels)
    }
}

/// Label -> augmented variants of that label's sequence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AugmentedDataset {
    pub labels: BTreeMap<String, Vec<PointSequence>>,
}

impl AugmentedDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variant_count(&self) -> usize {
        self.labels.values().map(Vec::len).sum()
    }
}

/// Side of a train/test partition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize,
    Display, EnumString, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Split {
    Train,
    Test,
}

/// Disjoint train and test partitions of sampled keypoints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SplitDataset {
    pub train: Dataset<PointSequence>,
    pub test: Dataset<PointSequence>,
}

impl SplitDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn side(&self, split: Split) -> &Dataset<PointSequence> {
        match split {
            Split::Train => &self.train,
            Split::Test => &self.test,
        }
    }

    pub fn side_mut(&mut self, split: Split) -> &mut Dataset<PointSequence> {
        match split {
            Split::Train => &mut self.train,
            Split::Test => &mut self.test,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_iterate_in_key_order() {
        let mut dataset = Dataset::new();
        dataset.insert("Pronouns", "she", 3);
        dataset.insert("Adjectives", "dirty", 2);
        dataset.insert("Adjectives", "clean", 1);

        let items: Vec<_> = dataset.iter().collect();
        assert_eq!(
            items,
            vec![
                ("Adjectives", "clean", &1),
                ("Adjectives", "dirty", &2),
                ("Pronouns", "she", &3),
            ]
        );
        assert_eq!(dataset.label_count(), 3);
        assert_eq!(dataset.get("Pronouns", "she"), Some(&3));
        assert_eq!(dataset.get("Pronouns", "he"), None);
    }

    #[test]
    fn test_insert_replaces_existing_leaf() {
        let mut dataset = Dataset::new();
        assert_eq!(dataset.insert("a", "b", 1), None);
        assert_eq!(dataset.insert("a", "b", 2), Some(1));
        assert_eq!(dataset.label_count(), 1);
    }

    #[test]
    fn test_map_keeps_structure() {
        let mut dataset = Dataset::new();
        dataset.insert("Places", "school", 2);
        dataset.insert("Places", "house", 5);

        let doubled = dataset.map(|v| v * 2);
        assert_eq!(doubled.get("Places", "school"), Some(&4));
        assert_eq!(doubled.get("Places", "house"), Some(&10));
    }

    #[test]
    fn test_by_label_rejects_duplicates() {
        let mut dataset = Dataset::new();
        dataset.insert("A", "clean", 1);
        dataset.insert("B", "weak", 2);
        assert_eq!(dataset.by_label().unwrap().len(), 2);

        dataset.insert("C", "clean", 3);
        let err = dataset.by_label().unwrap_err();
        assert!(matches!(err, KeypointsError::DuplicateLabel { label } if label == "clean"));
    }

    #[test]
    fn test_nested_json_shape() {
        let mut dataset = Dataset::new();
        dataset.insert("Adjectives", "clean", vec![1]);
        let json = serde_json::to_value(&dataset).unwrap();
        assert_eq!(json, serde_json::json!({ "Adjectives": { "clean": [1] } }));
    }

    #[test]
    fn test_split_directory_names() {
        assert_eq!(Split::Train.to_string(), "train");
        assert_eq!(Split::Test.to_string(), "test");
    }
}
