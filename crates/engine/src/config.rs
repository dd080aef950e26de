//! On-disk layout of a docsim data directory.

use std::path::{Path, PathBuf};

/// File name of the metadata sequence.
pub const METADATA_FILE: &str = "meta.json";

/// File name of the flat index snapshot.
pub const INDEX_FILE: &str = "index.bin";

/// File name of the index's own copy of the rows it was built from.
pub const INDEX_METADATA_FILE: &str = "index.meta.json";

/// File name of the named rebuild lock.
pub const LOCK_FILE: &str = "meta.json.lock";

/// Paths of the metadata store, the served pair, and the rebuild lock.
///
/// `index.bin` and `index.meta.json` are the served pair and are only ever
/// replaced together by the index builder. `meta.json` is the store that
/// uploads write to; it never has to match the served pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    data_dir: PathBuf,
}

impl StoreLayout {
    /// Layout rooted at `data_dir` (usually `<workspace>/.docsim`).
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Directory holding all files.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the metadata JSON path.
    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join(METADATA_FILE)
    }

    /// Get the index snapshot path.
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(INDEX_FILE)
    }

    /// Get the path of the index's row copy.
    pub fn index_metadata_path(&self) -> PathBuf {
        self.data_dir.join(INDEX_METADATA_FILE)
    }

    /// Get the rebuild lock path.
    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join(LOCK_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = StoreLayout::new("/srv/docs/.docsim");
        assert!(layout.metadata_path().ends_with("meta.json"));
        assert!(layout.index_path().ends_with("index.bin"));
        assert!(layout.index_metadata_path().ends_with("index.meta.json"));
        assert!(layout.lock_path().ends_with("meta.json.lock"));
        assert_eq!(layout.data_dir(), Path::new("/srv/docs/.docsim"));
    }
}
