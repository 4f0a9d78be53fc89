use std::fs::{File, OpenOptions};
use std::io::{Cursor, Read, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::OperationNotAllowedError;

use super::source::ReadSeek;
use super::ContentError;

/// The pluggable policies for materializing streamed content.
///
/// // 三种缓存策略:内存、临时文件、不缓存。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CacheKind {
    Memory,
    TempFile,
    #[default]
    None,
}

/// Policy contract used by the content controller.
///
/// `save_and_return` is invoked for every block read from a
/// not-yet-cached buffer; `consume` gates whether the controller may
/// drain the stream on the strategy's behalf (the controller performs
/// the actual drain after `consume` returns). The none strategy rejects
/// every data-returning call so callers can tell "no data yet" apart
/// from "this policy never stores data".
pub trait CacheStrategy {
    fn kind(&self) -> CacheKind;

    /// Whether a complete copy of the content has been persisted.
    fn is_cached(&self) -> bool;

    /// Marks the stored copy as complete.
    fn set_cached(&mut self);

    /// Persists one block.
    fn save_and_return(&mut self, block: &[u8]) -> Result<(), ContentError>;

    /// Full stored content. Fails with [`ContentError::Empty`] when
    /// nothing was ever written.
    fn load_from_cache(&mut self) -> Result<Vec<u8>, ContentError>;

    /// A read-only copy of the stored content, available only once a
    /// complete copy exists. Lets comparisons look at content without a
    /// mutable borrow.
    ///
    /// // 只读窥视:仅当完整副本已落缓存时返回数据,供不可变比较使用。
    fn peek(&self) -> Option<Vec<u8>>;

    /// Throws away a partial copy so a restarted iteration can write
    /// through from the beginning again.
    ///
    /// // 丢弃半截副本,重新迭代时从头写入。
    fn discard(&mut self);

    /// A fresh seekable buffer over the stored content.
    fn load_buffer_from_cache(&mut self) -> Result<Box<dyn ReadSeek>, ContentError>;

    /// Permission check before the controller drains the source stream
    /// through this strategy.
    fn consume(&mut self) -> Result<(), ContentError>;
}

pub(crate) fn strategy_for(kind: CacheKind) -> Box<dyn CacheStrategy> {
    match kind {
        CacheKind::Memory => Box::new(MemoryCache::default()),
        CacheKind::TempFile => Box::new(TempFileCache::default()),
        CacheKind::None => Box::new(NoCache),
    }
}

/// Accumulates blocks into a growable in-memory buffer.
#[derive(Debug, Default)]
pub struct MemoryCache {
    data: Vec<u8>,
    cached: bool,
}

impl CacheStrategy for MemoryCache {
    fn kind(&self) -> CacheKind {
        CacheKind::Memory
    }

    fn is_cached(&self) -> bool {
        self.cached
    }

    fn set_cached(&mut self) {
        self.cached = true;
    }

    fn save_and_return(&mut self, block: &[u8]) -> Result<(), ContentError> {
        self.data.extend_from_slice(block);
        Ok(())
    }

    fn load_from_cache(&mut self) -> Result<Vec<u8>, ContentError> {
        if self.data.is_empty() {
            return Err(ContentError::Empty);
        }
        Ok(self.data.clone())
    }

    fn peek(&self) -> Option<Vec<u8>> {
        self.cached.then(|| self.data.clone())
    }

    fn discard(&mut self) {
        self.data.clear();
        self.cached = false;
    }

    fn load_buffer_from_cache(&mut self) -> Result<Box<dyn ReadSeek>, ContentError> {
        Ok(Box::new(Cursor::new(self.data.clone())))
    }

    fn consume(&mut self) -> Result<(), ContentError> {
        Ok(())
    }
}

/// Appends blocks to a uniquely named temporary file.
///
/// The file is allocated at the first write and intentionally outlives
/// the strategy so a swapped-in buffer stays readable.
#[derive(Debug, Default)]
pub struct TempFileCache {
    path: Option<PathBuf>,
    cached: bool,
}

impl TempFileCache {
    fn writer(&mut self) -> Result<File, ContentError> {
        // 第一次写入时分配唯一临时路径,之后始终追加。
        let path = match &self.path {
            Some(path) => path.clone(),
            None => {
                let staging = tempfile::NamedTempFile::new()?;
                let (_, path) = staging.keep().map_err(|e| ContentError::Io(e.error))?;
                self.path = Some(path.clone());
                path
            }
        };
        Ok(OpenOptions::new().append(true).create(true).open(path)?)
    }
}

impl CacheStrategy for TempFileCache {
    fn kind(&self) -> CacheKind {
        CacheKind::TempFile
    }

    fn is_cached(&self) -> bool {
        self.cached
    }

    fn set_cached(&mut self) {
        self.cached = true;
    }

    fn save_and_return(&mut self, block: &[u8]) -> Result<(), ContentError> {
        let mut file = self.writer()?;
        file.write_all(block)?;
        file.flush()?;
        Ok(())
    }

    fn load_from_cache(&mut self) -> Result<Vec<u8>, ContentError> {
        let path = self.path.as_ref().ok_or(ContentError::Empty)?;
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;
        if data.is_empty() {
            return Err(ContentError::Empty);
        }
        Ok(data)
    }

    fn peek(&self) -> Option<Vec<u8>> {
        if !self.cached {
            return None;
        }
        let path = self.path.as_ref()?;
        let mut data = Vec::new();
        File::open(path).ok()?.read_to_end(&mut data).ok()?;
        Some(data)
    }

    fn discard(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = std::fs::remove_file(path);
        }
        self.cached = false;
    }

    fn load_buffer_from_cache(&mut self) -> Result<Box<dyn ReadSeek>, ContentError> {
        match &self.path {
            Some(path) => Ok(Box::new(File::open(path)?)),
            // 尚未写入任何块,等价于空缓冲。
            None => Ok(Box::new(Cursor::new(Vec::new()))),
        }
    }

    fn consume(&mut self) -> Result<(), ContentError> {
        Ok(())
    }
}

/// Stores nothing and rejects every data-returning call.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl NoCache {
    fn rejected(operation: &'static str) -> ContentError {
        ContentError::NotAllowed(OperationNotAllowedError::new(
            operation,
            "the none cache strategy does not store content",
        ))
    }
}

impl CacheStrategy for NoCache {
    fn kind(&self) -> CacheKind {
        CacheKind::None
    }

    fn is_cached(&self) -> bool {
        false
    }

    fn set_cached(&mut self) {}

    fn save_and_return(&mut self, _block: &[u8]) -> Result<(), ContentError> {
        Ok(())
    }

    fn load_from_cache(&mut self) -> Result<Vec<u8>, ContentError> {
        Err(Self::rejected("load_from_cache"))
    }

    fn peek(&self) -> Option<Vec<u8>> {
        None
    }

    fn discard(&mut self) {}

    fn load_buffer_from_cache(&mut self) -> Result<Box<dyn ReadSeek>, ContentError> {
        Err(Self::rejected("load_buffer_from_cache"))
    }

    fn consume(&mut self) -> Result<(), ContentError> {
        Err(Self::rejected("consume"))
    }
}
