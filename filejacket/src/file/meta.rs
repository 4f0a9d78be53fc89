use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Classification flags plus free-form metadata of a file.
///
/// The fixed flags are written by the extractors; anything else the
/// sources carry (content disposition, language, expiry) lands in the
/// `extra` map under its own key.
///
/// // 元数据:固定分类标记由抽取器填写,其余信息进入 extra 映射。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// The content is a container with listable entries.
    pub packed: bool,
    /// The extension names a compression format.
    pub compressed: bool,
    /// The encoding keeps the original data intact.
    pub lossless: bool,
    /// Digests may be generated for this file. Internal archive
    /// entries are not hashable on their own.
    pub hashable: bool,
    /// The file lives inside another file's content.
    pub internal: bool,
    /// For sidecar hash files: the digest came from a shared
    /// `CHECKSUM.<ext>` manifest rather than a per-file sidecar.
    pub checksum: bool,
    /// For sidecar hash files: the digest was loaded from storage
    /// instead of being generated from content.
    pub loaded: bool,
    /// Additional metadata keyed by source-specific names.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl FileMetadata {
    pub fn new() -> FileMetadata {
        FileMetadata::default()
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.extra.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.extra.contains_key(key)
    }
}

impl Default for FileMetadata {
    fn default() -> FileMetadata {
        FileMetadata {
            packed: false,
            compressed: false,
            lossless: false,
            hashable: true,
            internal: false,
            checksum: false,
            loaded: false,
            extra: BTreeMap::new(),
        }
    }
}
