//! Storage abstraction layer.
//!
//! Every filesystem touch of the core goes through the [`Storage`]
//! trait: sanitizing and joining paths, stat-ing, listing, reading and
//! writing bytes, allocating temp space and making backups. The file
//! aggregate, the extractors and the renamers only ever hold a
//! `dyn Storage`, so an embedder can route everything through a remote
//! or sandboxed backend.
//!
//! // 存储抽象层:核心代码只依赖 Storage trait,本地磁盘实现在 local.rs。

pub mod local;

use std::io::{self, Read, Write};

use chrono::{DateTime, Utc};

use crate::content::source::ReadSeek;

pub use local::LocalStorage;

/// Capability surface the core consumes for byte and path handling.
///
/// All operations are synchronous; blocking I/O lives behind this trait
/// and nowhere else in the core.
pub trait Storage {
    /// Stable identifier used by the serialization registry.
    fn registry_id(&self) -> &'static str;

    /// Path separator convention of this backend.
    fn sep(&self) -> &'static str;

    /// Line separator convention of this backend.
    fn line_sep(&self) -> &'static str;

    /// Normalizes separators and strips redundant components.
    fn sanitize_path(&self, path: &str) -> String;

    /// Joins `child` onto `base` using the backend separator.
    fn join(&self, base: &str, child: &str) -> String;

    fn exists(&self, path: &str) -> bool;

    fn is_dir(&self, path: &str) -> bool;

    fn is_file(&self, path: &str) -> bool;

    /// Filenames (not full paths) of the plain files inside `directory`.
    fn list_files(&self, directory: &str) -> io::Result<Vec<String>>;

    /// Directory portion of `path` (everything before the last name).
    fn get_directory_from_path(&self, path: &str) -> String;

    /// Parent of the directory portion of `path`.
    fn get_parent_directory_from_path(&self, path: &str) -> String;

    /// Last name component of `path`.
    fn get_filename_from_path(&self, path: &str) -> String;

    fn get_absolute_path(&self, path: &str) -> io::Result<String>;

    fn get_size(&self, path: &str) -> io::Result<u64>;

    fn get_created_date(&self, path: &str) -> io::Result<DateTime<Utc>>;

    fn get_modified_date(&self, path: &str) -> io::Result<DateTime<Utc>>;

    /// Backend-specific stable identity of the object behind `path`.
    fn get_path_id(&self, path: &str) -> io::Result<String>;

    /// Opens `path` for random-access reading.
    fn open_reader(&self, path: &str) -> io::Result<Box<dyn ReadSeek>>;

    /// Opens `path` for writing, truncating existing content.
    fn open_writer(&self, path: &str) -> io::Result<Box<dyn Write>>;

    /// Reads `path` as text lines without the trailing separators.
    fn read_lines(&self, path: &str) -> io::Result<Vec<String>>;

    /// Writes `data` to `path` in one call, creating parents as needed.
    fn save_bytes(&self, path: &str, data: &[u8]) -> io::Result<()>;

    /// Streams `reader` into `path`, creating parents as needed.
    fn save_stream(&self, path: &str, reader: &mut dyn Read) -> io::Result<u64>;

    fn create_directory(&self, path: &str) -> io::Result<()>;

    fn delete(&self, path: &str) -> io::Result<()>;

    /// Renames without clobbering: fails when `to` exists.
    fn rename_path(&self, from: &str, to: &str) -> io::Result<()>;

    /// Renames, replacing `to` when it already exists.
    fn replace_path(&self, from: &str, to: &str) -> io::Result<()>;

    /// Copies `path` aside before it gets overwritten and returns the
    /// backup location.
    fn backup(&self, path: &str) -> io::Result<String>;

    fn get_temp_directory(&self) -> io::Result<String>;

    /// Allocates a fresh unique temp file and returns its path.
    fn get_unique_temp_file(&self) -> io::Result<String>;

    /// Collision-avoidance suffix convention of this platform, e.g.
    /// `" (2)"` on Windows and `" - 2"` elsewhere.
    fn enumeration_suffix(&self, index: u32) -> String;
}
