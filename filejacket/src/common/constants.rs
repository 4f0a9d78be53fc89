/// Default block size, in bytes, for content iteration.
pub const DEFAULT_BLOCK_SIZE: usize = 256;

/// Stem used by shared checksum sidecar files, e.g. `CHECKSUM.sha256`.
pub const CHECKSUM_STEM: &str = "CHECKSUM";

/// Upper bound of candidate names tried by the unique renamer before
/// it gives up.
pub const UNIQUE_RENAME_ATTEMPTS: u32 = 100;

// --- 包内容历史 ---
/// How many previous entry mappings a packet keeps after resets.
pub const PACKET_HISTORY_LIMIT: usize = 10;

// --- 序列化格式 ---
/// Tag prefix for serialized datetime attributes (RFC 3339 payload).
pub const DATETIME_TAG: &str = "datetime";

/// Key that carries the originating preset of a serialized file.
pub const SERIALIZED_SOURCE_KEY: &str = "__source__";

/// Version stamp embedded in serialized files.
pub const SERIALIZED_VERSION_KEY: &str = "__version__";

/// Suffix appended by the storage backup operation.
pub const BACKUP_SUFFIX: &str = ".bak";
