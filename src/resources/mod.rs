//! External evidence consulted by filters.
//!
//! Immutable data (ORF annotations) is loaded once per run and shared through
//! the [`ResourceCache`]. Mutable cursors over it ([`OrfSweep`],
//! [`RedundancyIndex`]) are chromosome-scoped and owned by a single filter
//! instance, so they are never shared between processing units.

pub mod alignment;
pub mod orf;

pub use alignment::{AlignmentRow, RedundancyIndex};
pub use orf::{Eviction, Orf, OrfAnnotations, OrfSweep, Strand};

use crate::OligoError;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Loaded resources keyed by file, built once and handed to every unit
#[derive(Default)]
pub struct ResourceCache {
    orfs: DashMap<(PathBuf, u64), Arc<OrfAnnotations>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// ORF annotations for `path`, loading them on first use
    pub fn orf_annotations(
        &self,
        path: &Path,
        offset: u64,
    ) -> Result<Arc<OrfAnnotations>, OligoError> {
        let key = (path.to_path_buf(), offset);
        if let Some(existing) = self.orfs.get(&key) {
            return Ok(existing.clone());
        }

        let loaded = Arc::new(OrfAnnotations::load(path, offset)?);
        Ok(self.orfs.entry(key).or_insert(loaded).clone())
    }

    /// Register annotations built in memory under a path key
    pub fn insert_orf_annotations(&self, path: &Path, offset: u64, annotations: OrfAnnotations) {
        self.orfs
            .insert((path.to_path_buf(), offset), Arc::new(annotations));
    }

    pub fn len(&self) -> usize {
        self.orfs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orfs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_orf_annotations_loaded_once() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "YAL001C\tchrI\t10\t20\tW").unwrap();

        let cache = ResourceCache::new();
        let first = cache.orf_annotations(file.path(), 0).unwrap();
        let second = cache.orf_annotations(file.path(), 0).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let shifted = cache.orf_annotations(file.path(), 1).unwrap();
        assert_eq!(shifted.orfs("chrI")[0].start, 9);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_missing_annotation_file_is_config_error() {
        let cache = ResourceCache::new();
        let result = cache.orf_annotations(Path::new("/nonexistent/orfs.tab"), 0);
        assert!(matches!(result, Err(OligoError::Config(_))));
    }
}
