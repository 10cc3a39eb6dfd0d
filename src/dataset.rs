//! Persisted path and adjacency dictionaries
//!
//! Ground-truth and sparse dictionaries share one shape: path index → ordered
//! segment ids. The sparse dictionary may additionally carry, per path, the
//! positions of its segments inside the ground-truth path; those drive
//! clipped (non-global) evaluation.
//!
//! All three artifacts are stored as JSON.

use crate::errors::Result;
use crate::types::{Path, SegmentId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path as FsPath;

fn read_json<T: DeserializeOwned>(path: &FsPath) -> Result<T> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn write_json<T: Serialize>(value: &T, path: &FsPath) -> Result<()> {
    let text = serde_json::to_string(value)?;
    std::fs::write(path, text)?;
    Ok(())
}

// ─── Ground truth ───────────────────────────────────────────────────────────

/// Ground-truth paths keyed by path index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathDictionary {
    pub paths: BTreeMap<usize, Path>,
}

impl PathDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, idx: usize, path: Path) -> Option<Path> {
        self.paths.insert(idx, path)
    }

    pub fn get(&self, idx: usize) -> Option<&Path> {
        self.paths.get(&idx)
    }

    /// Path indices in ascending order
    pub fn keys(&self) -> impl Iterator<Item = usize> + '_ {
        self.paths.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Path)> {
        self.paths.iter().map(|(&k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Mean path length (0 for an empty dictionary)
    pub fn mean_path_len(&self) -> f64 {
        if self.paths.is_empty() {
            return 0.0;
        }
        let total: usize = self.paths.values().map(Vec::len).sum();
        total as f64 / self.paths.len() as f64
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn load(path: impl AsRef<FsPath>) -> Result<Self> {
        read_json(path.as_ref())
    }

    pub fn save(&self, path: impl AsRef<FsPath>) -> Result<()> {
        write_json(self, path.as_ref())
    }
}

impl FromIterator<(usize, Path)> for PathDictionary {
    fn from_iter<I: IntoIterator<Item = (usize, Path)>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

// ─── Sparse observations ────────────────────────────────────────────────────

/// Sparse observations keyed by path index.
///
/// `gt_link_indices[idx][k]` is the position of `paths[idx][k]` within the
/// ground-truth path. It is absent for observations that were not produced
/// by masking (for example detector hits), in which case alignment can be
/// recovered with [`align_to_ground_truth`](crate::observation::align_to_ground_truth).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseDictionary {
    pub paths: BTreeMap<usize, Path>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub gt_link_indices: BTreeMap<usize, Vec<usize>>,
}

impl SparseDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an observation without ground-truth alignment
    pub fn insert(&mut self, idx: usize, path: Path) {
        self.paths.insert(idx, path);
    }

    /// Insert an observation together with its ground-truth positions
    pub fn insert_aligned(&mut self, idx: usize, path: Path, gt_indices: Vec<usize>) {
        self.paths.insert(idx, path);
        self.gt_link_indices.insert(idx, gt_indices);
    }

    pub fn get(&self, idx: usize) -> Option<&Path> {
        self.paths.get(&idx)
    }

    /// Ground-truth positions of an observation, when recorded
    pub fn gt_indices(&self, idx: usize) -> Option<&[usize]> {
        self.gt_link_indices.get(&idx).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = usize> + '_ {
        self.paths.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Path)> {
        self.paths.iter().map(|(&k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn load(path: impl AsRef<FsPath>) -> Result<Self> {
        read_json(path.as_ref())
    }

    pub fn save(&self, path: impl AsRef<FsPath>) -> Result<()> {
        write_json(self, path.as_ref())
    }
}

// ─── Adjacency ──────────────────────────────────────────────────────────────

/// Segment id → ordered list of neighboring segment ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdjacencyMap(BTreeMap<SegmentId, Vec<SegmentId>>);

impl AdjacencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, segment: SegmentId, neighbors: Vec<SegmentId>) -> Option<Vec<SegmentId>> {
        self.0.insert(segment, neighbors)
    }

    pub fn get(&self, segment: &SegmentId) -> Option<&Vec<SegmentId>> {
        self.0.get(segment)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SegmentId, &Vec<SegmentId>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn load(path: impl AsRef<FsPath>) -> Result<Self> {
        read_json(path.as_ref())
    }

    pub fn save(&self, path: impl AsRef<FsPath>) -> Result<()> {
        write_json(self, path.as_ref())
    }
}

impl FromIterator<(SegmentId, Vec<SegmentId>)> for AdjacencyMap {
    fn from_iter<I: IntoIterator<Item = (SegmentId, Vec<SegmentId>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::InferenceError;

    fn temp_file(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("rapid_pathinfer_{}_{name}", std::process::id()))
    }

    #[test]
    fn test_path_dictionary_json_shape() {
        let dict: PathDictionary = vec![(0, vec![1, 2, 3]), (4, vec![7])].into_iter().collect();
        let json = dict.to_json_string().unwrap();
        assert_eq!(json, r#"{"paths":{"0":[1,2,3],"4":[7]}}"#);
        assert_eq!(PathDictionary::from_json_str(&json).unwrap(), dict);
    }

    #[test]
    fn test_mean_path_len() {
        let dict: PathDictionary = vec![(0, vec![1, 2, 3]), (1, vec![7])].into_iter().collect();
        assert!((dict.mean_path_len() - 2.0).abs() < 1e-12);
        assert_eq!(PathDictionary::new().mean_path_len(), 0.0);
    }

    #[test]
    fn test_sparse_dictionary_without_indices() {
        let sparse = SparseDictionary::from_json_str(r#"{"paths":{"3":[0,3]}}"#).unwrap();
        assert_eq!(sparse.get(3), Some(&vec![0, 3]));
        assert_eq!(sparse.gt_indices(3), None);

        let mut aligned = SparseDictionary::new();
        aligned.insert_aligned(3, vec![0, 3], vec![0, 3]);
        let json = aligned.to_json_string().unwrap();
        assert!(json.contains("gt_link_indices"));
        assert_eq!(SparseDictionary::from_json_str(&json).unwrap().gt_indices(3), Some(&[0, 3][..]));
    }

    #[test]
    fn test_adjacency_map_transparent() {
        let map = AdjacencyMap::from_json_str(r#"{"0":[1],"1":[2,3]}"#).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&1), Some(&vec![2, 3]));
        assert_eq!(map.to_json_string().unwrap(), r#"{"0":[1],"1":[2,3]}"#);
    }

    #[test]
    fn test_save_and_load() {
        let file = temp_file("gt.json");
        let dict: PathDictionary = vec![(2, vec![5, 6])].into_iter().collect();
        dict.save(&file).unwrap();
        assert_eq!(PathDictionary::load(&file).unwrap(), dict);
        std::fs::remove_file(&file).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let err = AdjacencyMap::load(temp_file("does_not_exist.json")).unwrap_err();
        assert!(matches!(err, InferenceError::Io { .. }));
    }
}
