//! In-memory file objects with lazy content and processor pipelines.
//!
//! A [`File`] collects everything known about one file: identity and
//! naming, lifecycle state, pending actions, digests with their sidecar
//! manifests, packed entries, and the content itself behind a lazy
//! block-iterating controller. Attributes are not probed eagerly;
//! configurable pipelines of processors (extractors, comparers, hashers,
//! renamers, renders, package extractors) fill them in, and saving is
//! guarded by an explicit permission matrix instead of implicit
//! overwrites.
//!
//! All storage access goes through the [`Storage`] trait, so the same
//! objects work against any backend that can hand out readers and
//! writers.
//!
//! // 文件对象库:惰性内容、处理器管线、显式保存许可矩阵。
//! // 存储一律走 Storage trait,后端可替换。
//!
//! ```no_run
//! use std::sync::Arc;
//! use filejacket::{File, KnownMimeTyper, LocalStorage, SaveOptions, Storage};
//!
//! let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new());
//! let mut file = File::from_disk("/data/report.txt", storage, KnownMimeTyper::new_arc());
//! file.save_to = Some("/data/copies".to_string());
//! file.save(&SaveOptions::default())?;
//! # Ok::<(), filejacket::FileError>(())
//! ```

pub mod common;
pub mod content;
pub mod errors;
pub mod file;
pub mod mimetype;
pub mod pipeline;
pub mod pipelines;
pub mod serializer;
pub mod storage;
pub mod utils;

pub use content::{CacheKind, ContentConfig, ContentSource, FileContent, FilePacket};
pub use errors::{ConfigurationError, OperationNotAllowedError, ValidationError};
pub use file::{File, FileError, SaveOptions};
pub use mimetype::{KnownMimeTyper, MimeTyper};
pub use pipeline::{
    Pipeline, PipelineContext, ProcessorBinding, ProcessorFamily, ProcessorKind, ProcessorOptions,
};
pub use pipelines::hasher::HashSession;
pub use pipelines::renamer::RenameSession;
pub use serializer::{SerializeError, SerializeOptions};
pub use storage::{LocalStorage, Storage};

#[cfg(test)]
mod tests;
