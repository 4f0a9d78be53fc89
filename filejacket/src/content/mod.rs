//! Lazy content handling.
//!
//! A file's bytes can come from raw values, from streams, or from an
//! entry inside an archive. The [`FileContent`] controller wraps any of
//! those behind block iteration with a pluggable [`cache::CacheStrategy`],
//! so callers never need to know whether the origin was seekable.
//!
//! // 内容子系统:来源枚举、缓存策略、控制器、游标与包内容模型。

pub mod cache;
pub mod controller;
pub mod packet;
pub mod source;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::common::constants::DEFAULT_BLOCK_SIZE;
use crate::errors::{ConfigurationError, OperationNotAllowedError};

pub use cache::{CacheKind, CacheStrategy};
pub use controller::{ContentCursor, FileContent};
pub use packet::FilePacket;
pub use source::{ContentSource, LazyReadSeek, ReadSeek};

/// Errors of the content subsystem.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// Nothing was ever stored, distinct from "not set up to store".
    #[error("No content was stored in the cache")]
    Empty,

    #[error(transparent)]
    NotAllowed(#[from] OperationNotAllowedError),

    /// `read` was called while a block iteration is mid-stream.
    #[error("read cannot be used while a block iteration is in progress")]
    IterationInProgress,

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The cache produced a buffer that cannot seek; the strategy is
    /// misconfigured for this source.
    #[error("The active cache strategy did not produce a seekable buffer")]
    CacheNotSeekable,

    #[error("Content I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Content bytes are not valid UTF-8 text: {0}")]
    NotText(#[from] std::string::FromUtf8Error),
}

/// Materialized content, text or binary depending on the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(value) => value.as_bytes(),
            Payload::Binary(value) => value,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Payload::Text(value) => value.into_bytes(),
            Payload::Binary(value) => value,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Payload::Binary(_))
    }
}

/// Normalizes between raw bytes and the text/binary view chosen when
/// the content was attached. Immutable for the life of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferAdapter {
    pub binary: bool,
    pub encoding: &'static str,
}

impl BufferAdapter {
    pub fn text() -> Self {
        BufferAdapter {
            binary: false,
            encoding: "utf-8",
        }
    }

    pub fn binary() -> Self {
        BufferAdapter {
            binary: true,
            encoding: "utf-8",
        }
    }

    pub fn to_bytes(&self, payload: Payload) -> Vec<u8> {
        payload.into_bytes()
    }

    /// Base64 (standard alphabet, padded) of the given bytes.
    pub fn to_base64(&self, bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    pub fn from_base64(&self, encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(encoded)
    }

    /// Wraps raw bytes back into the view this adapter was built for.
    pub fn payload_from(&self, bytes: Vec<u8>) -> Result<Payload, ContentError> {
        if self.binary {
            Ok(Payload::Binary(bytes))
        } else {
            Ok(Payload::Text(String::from_utf8(bytes)?))
        }
    }
}

/// Construction-time knobs of a [`FileContent`] controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Bytes handed out per iteration step.
    pub block_size: usize,
    /// Requested cache policy. Non-seekable sources upgrade to
    /// [`CacheKind::Memory`] regardless.
    pub cache: CacheKind,
    /// Cache even seekable sources.
    pub force_cache: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        ContentConfig {
            block_size: DEFAULT_BLOCK_SIZE,
            cache: CacheKind::None,
            force_cache: false,
        }
    }
}
