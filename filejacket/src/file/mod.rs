//! The lazy file object and the drivers that orchestrate its
//! pipelines.
//!
//! A [`File`] bundles identity attributes, classification metadata, a
//! content controller and five processor pipelines. Construction only
//! runs the extract chain; everything expensive — digests, packet
//! listing, previews, persistence — stays pending in the action ledger
//! until a driver is asked for it.
//!
//! // 文件对象:属性、内容控制器和五条流水线的载体。构造只跑抽取链,
//! // 其余贵的操作都挂在动作台账上,等对应驱动被调用时才发生。

use std::cmp::Ordering;
use std::fmt;
use std::io::SeekFrom;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::packet::FilePacket;
use crate::content::source::ContentSource;
use crate::content::{ContentConfig, ContentError, FileContent};
use crate::errors::{ConfigurationError, OperationNotAllowedError, ValidationError};
use crate::mimetype::MimeTyper;
use crate::pipeline::{
    PathTarget, Pipeline, PipelineContext, ProcessorBinding, ProcessorError, ProcessorKind,
    ProcessorOptions,
};
use crate::pipelines::comparer::ComparerKind;
use crate::pipelines::extractor::ExtractorKind;
use crate::pipelines::extractor::package::PackageExtractorKind;
use crate::pipelines::hasher::{HashError, HasherKind};
use crate::pipelines::renamer::{RenameError, RenameSession, RenamerKind, prepare_filename};
use crate::pipelines::render::RenderKind;
use crate::storage::Storage;

pub mod action;
pub mod hashes;
pub mod meta;
pub mod name;
pub mod option;
pub mod state;

pub use action::FileActions;
pub use hashes::{FileHashes, HashRecord};
pub use meta::FileMetadata;
pub use name::FileNaming;
pub use option::SaveOptions;
pub use state::FileState;

/// Errors surfaced by the file-level drivers. Pipeline-internal
/// failures are absorbed into each pipeline's error list instead.
#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotAllowed(#[from] OperationNotAllowedError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error(transparent)]
    Rename(#[from] RenameError),

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("At least one other file is required for a comparison")]
    NothingToCompare,

    #[error("There is not enough data in the files for a comparison verdict")]
    InsufficientComparison,
}

/// The five processor chains a file carries.
///
/// The extract chain is filled by the constructor that built the file;
/// the other four start from the defaults below and stay editable.
///
/// // 五条流水线:抽取链由构造器决定,其余四条带默认配置,随时可改。
#[derive(Debug, Serialize, Deserialize)]
pub struct FilePipelines {
    /// Attribute sources run at construction and on refresh.
    pub extract: Pipeline,
    /// Equality chain, consulted by `compare_to` and `==`.
    pub compare: Pipeline,
    /// Digest chain run by `generate_hashes`.
    pub hash: Pipeline,
    /// Conflict-solving renamers used while saving.
    pub rename: Pipeline,
    /// Representation builders for previews and thumbnails.
    pub render: Pipeline,
}

impl Default for FilePipelines {
    fn default() -> FilePipelines {
        FilePipelines {
            extract: Pipeline::new(Vec::new()),
            compare: Pipeline::new(vec![
                ProcessorBinding::new(ProcessorKind::Compare(ComparerKind::Type)),
                ProcessorBinding::new(ProcessorKind::Compare(ComparerKind::Size)),
                ProcessorBinding::new(ProcessorKind::Compare(ComparerKind::Binary)),
                ProcessorBinding::new(ProcessorKind::Compare(ComparerKind::Hash)),
                ProcessorBinding::new(ProcessorKind::Compare(ComparerKind::Data)),
            ]),
            hash: Pipeline::new(vec![
                ProcessorBinding::new(ProcessorKind::Hash(HasherKind::Sha256)).with_overrides(
                    ProcessorOptions {
                        try_loading_from_file: Some(true),
                        full_check: Some(true),
                        ..ProcessorOptions::default()
                    },
                ),
                ProcessorBinding::new(ProcessorKind::Hash(HasherKind::Crc32)).with_overrides(
                    ProcessorOptions {
                        try_loading_from_file: Some(true),
                        full_check: Some(true),
                        ..ProcessorOptions::default()
                    },
                ),
            ]),
            rename: Pipeline::new(vec![ProcessorBinding::new(ProcessorKind::Rename(
                RenamerKind::Windows,
            ))]),
            render: Pipeline::new(vec![ProcessorBinding::new(ProcessorKind::Render(
                RenderKind::Snippet,
            ))]),
        }
    }
}

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

fn next_token() -> u64 {
    NEXT_TOKEN.fetch_add(1, AtomicOrdering::Relaxed)
}

/// One file as an in-memory object: identity, metadata, lazily-read
/// content and the pipelines that fill all of it in.
///
/// // 文件对象本体。字段公开可改;改动会在状态和动作台账上留下痕迹,
/// // save 时据此决定要做什么。
pub struct File {
    /// Storage-side identity of the persisted file, when known.
    pub id: Option<String>,
    /// Source path this object was built from, when there was one.
    pub path: Option<String>,
    pub filename: Option<String>,
    /// Extension without the dot. `Some("")` marks a known absence, so
    /// an extension was looked for and there is none.
    pub extension: Option<String>,
    /// Directory the file saves into.
    pub save_to: Option<String>,
    /// Directory fragment between `save_to` and the filename.
    pub relative_path: Option<String>,
    /// Content length in bytes.
    pub length: u64,
    pub mime_type: Option<String>,
    /// Coarse semantic class resolved from the mimetype, e.g. "text".
    pub file_type: Option<String>,
    pub create_date: Option<DateTime<Utc>>,
    pub update_date: Option<DateTime<Utc>>,

    pub meta: FileMetadata,
    pub actions: FileActions,
    pub state: FileState,
    pub naming: FileNaming,
    pub hashes: FileHashes,
    /// Entries of packed content, filled by the unpack chain.
    pub packet: FilePacket,
    pub pipelines: FilePipelines,

    /// Derived text excerpt, attached by the render family.
    pub preview: Option<Box<File>>,
    pub thumbnail: Option<Box<File>>,

    pub(crate) content: Option<FileContent>,

    storage: Arc<dyn Storage>,
    mimetyper: Arc<dyn MimeTyper>,
    /// Process-unique identity for rename reservations.
    token: u64,
}

impl File {
    fn assemble(storage: Arc<dyn Storage>, mimetyper: Arc<dyn MimeTyper>) -> File {
        File {
            id: None,
            path: None,
            filename: None,
            extension: None,
            save_to: None,
            relative_path: None,
            length: 0,
            mime_type: None,
            file_type: None,
            create_date: None,
            update_date: None,
            meta: FileMetadata::default(),
            actions: FileActions::default(),
            state: FileState::default(),
            naming: FileNaming::default(),
            hashes: FileHashes::new(),
            packet: FilePacket::new(),
            pipelines: FilePipelines::default(),
            preview: None,
            thumbnail: None,
            content: None,
            storage,
            mimetyper,
            token: next_token(),
        }
    }

    /// An empty file object with no extract chain. Attributes are
    /// entirely up to the caller.
    pub(crate) fn bare(storage: Arc<dyn Storage>, mimetyper: Arc<dyn MimeTyper>) -> File {
        File::assemble(storage, mimetyper)
    }

    fn preset(
        path: &str,
        chain: &[ExtractorKind],
        storage: Arc<dyn Storage>,
        mimetyper: Arc<dyn MimeTyper>,
    ) -> File {
        let mut file = File::assemble(storage, mimetyper);
        file.path = Some(path.to_string());
        file.pipelines.extract = Pipeline::new(
            chain
                .iter()
                .map(|kind| ProcessorBinding::new(ProcessorKind::Extract(*kind)))
                .collect(),
        );
        let mut ctx = PipelineContext::new();
        file.refresh_from_pipeline(&mut ctx);
        file
    }

    /// A derived file pointing at `path`: name and mimetype resolved,
    /// nothing touched on the storage.
    pub(crate) fn sidecar(
        path: &str,
        storage: Arc<dyn Storage>,
        mimetyper: Arc<dyn MimeTyper>,
    ) -> File {
        File::preset(
            path,
            &[
                ExtractorKind::FilenameAndExtensionFromPath,
                ExtractorKind::MimeTypeFromFilename,
            ],
            storage,
            mimetyper,
        )
    }

    /// Like [`File::sidecar`] but additionally stats the path, so the
    /// object reflects a file that exists on the storage.
    pub(crate) fn sidecar_from_disk(
        path: &str,
        storage: Arc<dyn Storage>,
        mimetyper: Arc<dyn MimeTyper>,
    ) -> File {
        File::preset(
            path,
            &[
                ExtractorKind::FilenameAndExtensionFromPath,
                ExtractorKind::MimeTypeFromFilename,
                ExtractorKind::FileSystemData,
            ],
            storage,
            mimetyper,
        )
    }

    /// Builds a file object from a path on the storage.
    ///
    /// The extract chain resolves name, mimetype and filesystem facts,
    /// attaches lazily-opened content and picks up digests from
    /// checksum manifests next to the file. Failures of individual
    /// sources land in the extract pipeline's error list.
    ///
    /// // 从磁盘路径构造:名字、mimetype、文件系统信息、清单摘要
    /// // 逐个抽取,内容按需惰性打开。
    pub fn from_disk(path: &str, storage: Arc<dyn Storage>, mimetyper: Arc<dyn MimeTyper>) -> File {
        File::preset(
            path,
            &[
                ExtractorKind::FilenameAndExtensionFromPath,
                ExtractorKind::MimeTypeFromFilename,
                ExtractorKind::FileSystemData,
                ExtractorKind::ChecksumManifest,
            ],
            storage,
            mimetyper,
        )
    }

    /// Builds a file object around raw content.
    ///
    /// Name and mimetype come from the metadata headers in `options`,
    /// when any are given.
    pub fn from_content(
        source: ContentSource,
        options: &ProcessorOptions,
        storage: Arc<dyn Storage>,
        mimetyper: Arc<dyn MimeTyper>,
    ) -> File {
        let mut file = File::assemble(storage, mimetyper);
        file.pipelines.extract = Pipeline::new(vec![
            ProcessorBinding::new(ProcessorKind::Extract(ExtractorKind::FilenameFromMetadata)),
            ProcessorBinding::new(ProcessorKind::Extract(ExtractorKind::MimeTypeFromFilename)),
        ]);
        file.set_content(source);
        let mut ctx = PipelineContext::with_options(options.clone());
        file.refresh_from_pipeline(&mut ctx);
        file
    }

    /// Builds a file object around a downloaded or piped stream.
    ///
    /// The extract chain additionally consults the request URLs and
    /// response headers carried in `options`, the way a download
    /// handler would have seen them.
    ///
    /// // 从流构造:除元数据外还会参考 options 里的 URL 和响应头。
    pub fn from_stream(
        source: ContentSource,
        options: &ProcessorOptions,
        storage: Arc<dyn Storage>,
        mimetyper: Arc<dyn MimeTyper>,
    ) -> File {
        let mut file = File::assemble(storage, mimetyper);
        file.pipelines.extract = Pipeline::new(vec![
            ProcessorBinding::new(ProcessorKind::Extract(ExtractorKind::FilenameFromMetadata)),
            ProcessorBinding::new(ProcessorKind::Extract(ExtractorKind::FilenameFromUrl)),
            ProcessorBinding::new(ProcessorKind::Extract(ExtractorKind::MimeTypeFromFilename)),
            ProcessorBinding::new(ProcessorKind::Extract(ExtractorKind::MetadataHeaders)),
        ]);
        file.set_content(source);
        let mut ctx = PipelineContext::with_options(options.clone());
        file.refresh_from_pipeline(&mut ctx);
        file
    }

    pub fn storage_arc(&self) -> Arc<dyn Storage> {
        self.storage.clone()
    }

    pub fn mimetyper_arc(&self) -> Arc<dyn MimeTyper> {
        self.mimetyper.clone()
    }

    /// Process-unique identity of this object, used as the owner key
    /// for rename reservations.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// `filename.extension`, or the bare filename when the extension
    /// is empty. `None` while the file has no name at all.
    pub fn complete_filename(&self) -> Option<String> {
        let filename = self.filename.as_deref().unwrap_or("");
        let extension = self.extension.as_deref().unwrap_or("");
        if filename.is_empty() && extension.is_empty() {
            return None;
        }
        Some(crate::utils::filename::join_complete(
            filename,
            Some(extension),
        ))
    }

    /// Replaces filename and extension, archiving the old pair.
    ///
    /// A pair identical to the current one is a no-op. Once the file
    /// left its adding state, any accepted change marks a rename
    /// pending.
    ///
    /// // 改名:旧名归档进命名历史;非新建状态下改名会挂起待改名动作。
    pub fn set_complete_filename(&mut self, filename: String, extension: Option<String>) {
        let filename = Some(filename);
        if self.filename == filename && self.extension == extension {
            return;
        }

        let had_name = self.filename.as_deref().is_some_and(|name| !name.is_empty())
            || self.extension.as_deref().is_some_and(|ext| !ext.is_empty());
        if had_name {
            self.naming
                .record(self.filename.take(), self.extension.take());
        }

        self.filename = filename;
        self.extension = extension;

        if !self.state.adding {
            self.actions.to_rename();
        }
    }

    /// Attaches content, replacing whatever was there.
    ///
    /// Replacing existing content on a non-new file flips the changing
    /// state. Any new content is pending save and hash, and packed
    /// files get their entry listing invalidated.
    ///
    /// // 换内容:非首次、非新建时视为内容变更;保存和摘要动作挂起,
    /// // 包文件的条目列表作废待重列。
    pub fn set_content(&mut self, source: ContentSource) {
        let first_load = self.content.is_none();
        self.content = Some(FileContent::new(source, ContentConfig::default()));

        if !self.state.adding && !first_load {
            self.state.changing = true;
        }

        self.actions.to_save();
        self.actions.to_hash();
        if self.meta.packed {
            self.actions.to_list();
        }
    }

    /// Attaches content with an explicit cache policy instead of the
    /// default no-cache one.
    pub fn set_content_with_config(&mut self, source: ContentSource, config: ContentConfig) {
        let first_load = self.content.is_none();
        self.content = Some(FileContent::new(source, config));

        if !self.state.adding && !first_load {
            self.state.changing = true;
        }

        self.actions.to_save();
        self.actions.to_hash();
        if self.meta.packed {
            self.actions.to_list();
        }
    }

    /// Read-only view of the content controller, when content is
    /// attached.
    pub fn content_controller(&self) -> Option<&FileContent> {
        self.content.as_ref()
    }

    /// Mutable view of the content controller, for reading the bytes.
    pub fn content_controller_mut(&mut self) -> Option<&mut FileContent> {
        self.content.as_mut()
    }

    /// Adopts `complete_filename` only when its extension is
    /// registered for some mimetype.
    ///
    /// With `enforce_mimetype` set and a mimetype already resolved, the
    /// extension must additionally belong to that mimetype. On success
    /// the classification flags are refreshed from the new extension.
    ///
    /// // 仅在扩展名可识别时接受新名字;enforce_mimetype 时还要求与已
    /// // 解析的 mimetype 匹配。压缩、无损、打包标记随扩展名刷新。
    pub fn add_valid_filename(&mut self, complete_filename: &str, enforce_mimetype: bool) -> bool {
        let mimetyper = self.mimetyper_arc();

        let Some(possible_extension) = mimetyper.guess_extension_from_filename(complete_filename)
        else {
            return false;
        };

        if enforce_mimetype
            && let Some(mime_type) = self.mime_type.as_deref()
            && !mimetyper
                .get_extensions(mime_type)
                .contains(&possible_extension)
        {
            return false;
        }

        let (filename, extension) =
            prepare_filename(complete_filename, Some(&possible_extension));
        self.set_complete_filename(filename, extension);

        let extension = self.extension.clone().unwrap_or_default();
        self.meta.compressed = mimetyper.is_extension_compressed(&extension);
        self.meta.lossless = mimetyper.is_extension_lossless(&extension);
        self.meta.packed = mimetyper.is_extension_packed(&extension);
        if self.meta.packed {
            self.actions.to_list();
        }

        true
    }

    /// Whether the file's bytes are binary rather than text.
    ///
    /// The semantic type answers when it is known; otherwise the
    /// content source decides. `None` when neither is known.
    pub fn is_binary(&self) -> Option<bool> {
        match self.file_type.as_deref() {
            Some("text") => Some(false),
            Some(_) => Some(true),
            None => self.content.as_ref().map(FileContent::is_binary),
        }
    }

    /// Re-runs the file's own extract chain, e.g. after the caller
    /// changed attributes the chain derives from.
    pub fn refresh_from_pipeline(&mut self, ctx: &mut PipelineContext<'_>) {
        let mut extract = mem::take(&mut self.pipelines.extract);
        extract.run(self, ctx);
        self.pipelines.extract = extract;
        self.state.processing = false;
    }

    /// Re-reads every disk-derived attribute, overriding what is
    /// already populated. The file must have a path.
    ///
    /// // 从磁盘重读:名字、mimetype、文件系统信息、清单摘要全部以
    /// // overrider 方式重抽。
    pub fn refresh_from_disk(&mut self) {
        let mut pipeline = Pipeline::new(vec![
            ProcessorBinding::new(ProcessorKind::Extract(
                ExtractorKind::FilenameAndExtensionFromPath,
            )),
            ProcessorBinding::new(ProcessorKind::Extract(ExtractorKind::MimeTypeFromFilename)),
            ProcessorBinding::new(ProcessorKind::Extract(ExtractorKind::FileSystemData)),
            ProcessorBinding::new(ProcessorKind::Extract(ExtractorKind::ChecksumManifest)),
        ]);
        let mut ctx = PipelineContext::with_options(ProcessorOptions {
            overrider: Some(true),
            ..ProcessorOptions::default()
        });
        pipeline.run(self, &mut ctx);
        self.state.processing = false;
    }

    /// Runs the hash chain when hashing is pending.
    ///
    /// Digest lookup in manifests is only attempted for content that
    /// was saved and has not changed since; `force` discards every
    /// recorded digest and recomputes from the bytes, whether or not
    /// hashing was still pending.
    pub fn generate_hashes(&mut self, force: bool) {
        // 强制重算不受台账限制,已完成的哈希动作重新挂起。
        if force {
            self.actions.to_hash();
        }
        if !self.actions.hash {
            return;
        }

        // 内容变过或强制时不查清单,必须重新计算。
        let try_loading_from_file = if self.state.changing || force {
            false
        } else {
            self.actions.was_saved
        };

        // 强制重算先丢掉已登记的摘要,处理器遇到已有记录会直接复用。
        // 内部条目的容器摘要不丢,它们没有可重算的来源。
        if force && self.meta.hashable {
            self.hashes.clear();
        }

        let mut ctx = PipelineContext::with_options(ProcessorOptions {
            try_loading_from_file: Some(try_loading_from_file),
            ..ProcessorOptions::default()
        });

        let mut hash = mem::take(&mut self.pipelines.hash);
        hash.run(self, &mut ctx);
        self.pipelines.hash = hash;

        self.actions.hashed();
    }

    /// Verifies the content against every digest recorded on the file.
    ///
    /// `Ok(Some(false))` as soon as one digest mismatches,
    /// `Ok(Some(true))` when at least one matched and none failed,
    /// `Ok(None)` when nothing could be verified at all.
    ///
    /// // 完整性检查:任一摘要不符立即判坏;至少验过一个且全部通过才算好。
    pub fn is_content_wholesome(&mut self) -> Result<Option<bool>, FileError> {
        let names: Vec<String> = self.hashes.names().map(str::to_string).collect();

        let mut verified = false;
        for name in names {
            let Some(hasher) = HasherKind::from_name(&name) else {
                continue;
            };
            match hasher.check_hash(self, None)? {
                Some(true) => verified = true,
                Some(false) => return Ok(Some(false)),
                None => {}
            }
        }
        Ok(verified.then_some(true))
    }

    fn list_internal_content(&mut self, ctx: &mut PipelineContext<'_>) {
        if !self.actions.list {
            return;
        }

        // 重列前先把现有条目归档进包历史。
        self.packet.reset();
        let mut pipeline = mem::take(&mut self.packet.pipeline);
        pipeline.run(self, ctx);
        self.packet.pipeline = pipeline;
        self.actions.listed();
    }

    /// The nested files of packed content, listing them first when a
    /// listing is pending.
    pub fn files(&mut self) -> Vec<&File> {
        self.list_internal_content(&mut PipelineContext::new());
        self.packet.files().collect()
    }

    /// One nested file by its archive path, listing first when a
    /// listing is pending.
    pub fn internal_file(&mut self, internal_path: &str) -> Option<&mut File> {
        self.list_internal_content(&mut PipelineContext::new());
        self.packet
            .get_mut(internal_path)
            .map(|entry| &mut entry.file)
    }

    /// Decompresses packed content to a directory on the storage.
    ///
    /// Does nothing for files that are not packed. The destination
    /// defaults to `<save_to>/<filename>`. With `force`, entries that
    /// already exist at the destination are overwritten. Returns
    /// whether any backend accepted the archive.
    ///
    /// // 解包:目的地默认是 save_to 下以文件名命名的目录;逐个格式
    /// // 尝试,第一个认出归档的后端为准。
    pub fn extract(&mut self, destination: Option<&str>, force: bool) -> Result<bool, FileError> {
        if !self.meta.packed {
            return Ok(false);
        }

        let storage = self.storage_arc();
        let destination = match destination {
            Some(destination) => destination.to_string(),
            None => {
                let save_to = self
                    .save_to
                    .as_deref()
                    .ok_or(ConfigurationError::MissingSaveTo)?;
                let filename = self
                    .filename
                    .as_deref()
                    .ok_or(ConfigurationError::MissingFilename)?;
                storage.join(save_to, filename)
            }
        };

        let options = ProcessorOptions {
            decompress_to: Some(destination),
            overrider: Some(force),
            ..ProcessorOptions::default()
        };

        let kinds: Vec<PackageExtractorKind> = self
            .packet
            .pipeline
            .bindings()
            .iter()
            .filter_map(|binding| match binding.kind {
                ProcessorKind::Package(kind) => Some(kind),
                _ => None,
            })
            .collect();

        for kind in kinds {
            if kind.decompress(self, &options)? {
                self.actions.extracted();
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Compares this file against one or more candidates through the
    /// compare pipeline.
    ///
    /// An empty candidate list and a chain with too little data for a
    /// verdict are both errors; `==` is the lenient form of this.
    pub fn compare_to(&self, candidates: &[&File]) -> Result<bool, FileError> {
        if candidates.is_empty() {
            return Err(FileError::NothingToCompare);
        }
        self.pipelines
            .compare
            .evaluate(self, candidates)
            .ok_or(FileError::InsufficientComparison)
    }

    /// Full target path: save-to directory, relative path and complete
    /// filename joined and sanitized. Unset parts are skipped.
    pub fn sanitize_path(&self) -> String {
        let mut path = self.save_to.clone().unwrap_or_default();
        if let Some(relative_path) = self
            .relative_path
            .as_deref()
            .filter(|part| !part.is_empty())
        {
            path = self.storage.join(&path, relative_path);
        }
        if let Some(complete_filename) = self.complete_filename().filter(|part| !part.is_empty()) {
            path = self.storage.join(&path, &complete_filename);
        }
        self.storage.sanitize_path(&path)
    }

    /// Checks the minimum attributes a save needs.
    ///
    /// // 保存前校验:名字、目录、内容缺一不可;mimetype 已解析时
    /// // 扩展名必须与之兼容,未解析时跳过该检查。
    pub fn validate(&self) -> Result<(), FileError> {
        let has_filename = self
            .filename
            .as_deref()
            .is_some_and(|name| !name.is_empty());
        let has_extension = self.extension.as_deref().is_some_and(|ext| !ext.is_empty());
        if !has_filename && !has_extension {
            return Err(ValidationError::EmptyFilename.into());
        }

        if self.save_to.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigurationError::MissingSaveTo.into());
        }

        if self.content.is_none() {
            return Err(ConfigurationError::MissingContent.into());
        }

        if let Some(extension) = self.extension.as_deref().filter(|ext| !ext.is_empty())
            && let Some(mime_type) = self.mime_type.as_deref()
            && !self
                .mimetyper
                .get_extensions(mime_type)
                .iter()
                .any(|known| known == extension)
        {
            return Err(ValidationError::MimetypeMismatch {
                extension: extension.to_string(),
                mime_type: mime_type.to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Writes the whole content to `path`, truncating what is there.
    ///
    /// The bytes are materialized before the target is opened: the
    /// content may well be a lazy stream reading from that same path.
    ///
    /// // 先整体读出再写,内容可能正是从目标路径惰性读取的。
    pub fn write_content(&mut self, path: &str) -> Result<(), FileError> {
        let storage = self.storage_arc();
        let content = self
            .content
            .as_mut()
            .ok_or(ConfigurationError::MissingContent)?;

        let buffer = content.content_as_buffer()?;
        let mut data = Vec::new();
        buffer.read_to_end(&mut data)?;
        buffer.seek(SeekFrom::Start(0))?;

        storage.save_bytes(path, &data)?;
        Ok(())
    }

    /// Persists the file to its storage backend.
    ///
    /// The permission matrix in `options` is checked against the
    /// current state before anything is written; a refused combination
    /// fails without touching the storage.
    ///
    /// // 保存流程:校验 -> 许可矩阵 -> 处理改名 -> 备份 -> 写内容
    /// // -> 旁车摘要 -> 补 id -> 状态翻转。
    pub fn save(&mut self, options: &SaveOptions) -> Result<(), FileError> {
        self.save_inner(options, None)
    }

    /// Like [`File::save`], with name reservations shared through a
    /// rename session so concurrent saves into one directory do not
    /// pick the same free name.
    pub fn save_with(
        &mut self,
        options: &SaveOptions,
        session: &mut RenameSession,
    ) -> Result<(), FileError> {
        self.save_inner(options, Some(session))
    }

    fn save_inner(
        &mut self,
        options: &SaveOptions,
        session: Option<&mut RenameSession>,
    ) -> Result<(), FileError> {
        // 1. 基础校验。
        self.validate()?;

        let storage = self.storage_arc();
        let file_exists = storage.exists(&self.sanitize_path());
        log::debug!(
            "saving {} (adding={}, changing={}, renaming={})",
            self.sanitize_path(),
            self.state.adding,
            self.state.changing,
            self.state.renaming
        );

        // 2. 许可矩阵:不被放行的组合在写入前失败。
        if self.state.adding && file_exists && !options.overwrite {
            return Err(OperationNotAllowedError::new(
                "save",
                "a file already exists at the target path and `overwrite` is not set",
            )
            .into());
        }
        if !self.state.adding
            && self.state.changing
            && !(options.allow_update || options.create_backup)
        {
            return Err(OperationNotAllowedError::new(
                "save",
                "content changed and neither `allow_update` nor `create_backup` is set",
            )
            .into());
        }
        if self.state.renaming && file_exists && !(options.allow_rename || options.overwrite) {
            return Err(OperationNotAllowedError::new(
                "save",
                "a file already exists at the renamed path and neither `allow_rename` nor \
                 `overwrite` is set",
            )
            .into());
        }
        if self.state.renaming
            && self.naming.previous_saved_extension.is_some()
            && self.naming.previous_saved_extension != self.extension
            && !options.allow_extension_change
        {
            return Err(OperationNotAllowedError::new(
                "save",
                "the extension changed and `allow_extension_change` is not set",
            )
            .into());
        }

        // 3. 处理改名:账本里被别人占了名字时由重命名管线挑新名字。
        if self.state.renaming {
            self.resolve_rename(options.allow_rename, session)?;
        }

        // 4. 更新内容前按需备份旧副本。
        if self.state.changing && options.create_backup {
            storage.backup(&self.sanitize_path())?;
        }

        // 5. 写内容。改名之后目标路径要重算。
        if self.state.adding || self.state.changing {
            let target = self.sanitize_path();
            self.write_content(&target)?;
        }

        // 6. 旁车摘要:生成(或装载)后立刻落盘。
        if options.save_hashes {
            self.generate_hashes(!options.allow_search_hashes);
            self.hashes.save(true)?;
        }

        // 7. 第一次保存后补上存储分配的 id。
        if self.id.is_none() {
            self.id = Some(storage.get_path_id(&self.sanitize_path())?);
        }

        // 8. 状态翻转只在所有持久化调用成功之后发生。
        self.actions.saved();
        self.actions.renamed();
        self.state.adding = false;
        self.state.changing = false;
        self.state.renaming = false;
        self.naming.previous_saved_extension = self.extension.clone();

        Ok(())
    }

    /// Resolves a pending rename against the session ledger.
    ///
    /// A name reserved by a different object is a conflict: with
    /// `allow_rename` the rename pipeline picks a free name, otherwise
    /// the save fails. Whatever name the file ends up with is reserved
    /// under this object, and the old reservation is released.
    ///
    /// // 解决改名冲突:名字被别的对象占用时走重命名管线;最终名字
    /// // 登记到本对象名下,旧名的登记同时释放。
    fn resolve_rename(
        &mut self,
        allow_rename: bool,
        mut session: Option<&mut RenameSession>,
    ) -> Result<(), FileError> {
        let storage = self.storage_arc();
        let directory = storage.sanitize_path(
            self.save_to
                .as_deref()
                .ok_or(ConfigurationError::MissingSaveTo)?,
        );
        let old_complete = self
            .complete_filename()
            .ok_or(ConfigurationError::MissingFilename)?;

        let foreign_owner = session
            .as_deref()
            .and_then(|session| session.owner_of(&directory, &old_complete))
            .is_some_and(|owner| owner != self.token);

        if foreign_owner {
            if !allow_rename {
                return Err(RenameError::Reserved {
                    complete_filename: old_complete,
                    directory,
                }
                .into());
            }

            // 1. 重命名管线按磁盘和会话账本挑一个空闲名字。
            let mut ctx = PipelineContext {
                options: ProcessorOptions {
                    path_target: Some(PathTarget::SaveTo),
                    ..ProcessorOptions::default()
                },
                rename_session: session.as_deref_mut(),
                hash_session: None,
            };
            let mut rename = mem::take(&mut self.pipelines.rename);
            rename.run(self, &mut ctx);
            self.pipelines.rename = rename;

            // 2. 名字没变说明管线没找到出路,冲突原样上抛。
            let new_complete = self
                .complete_filename()
                .ok_or(ConfigurationError::MissingFilename)?;
            if new_complete == old_complete {
                return Err(RenameError::Reserved {
                    complete_filename: old_complete,
                    directory,
                }
                .into());
            }

            // 3. 旁车清单跟着宿主换名。
            self.hashes.rename(&old_complete, &new_complete)?;
        }

        if let Some(session) = session {
            let current = self
                .complete_filename()
                .ok_or(ConfigurationError::MissingFilename)?;
            if current != old_complete {
                session.release(&directory, &old_complete, self.token);
            }
            session.reserve(&directory, &current, self.token);
        }
        Ok(())
    }

    /// Runs the rename pipeline outside of a save, picking a name that
    /// is free on the storage and, when a session is given, in its
    /// reservation ledger.
    pub fn rename_to_free_name(
        &mut self,
        session: Option<&mut RenameSession>,
    ) -> Result<(), FileError> {
        let old_complete = self.complete_filename();

        let mut ctx = PipelineContext {
            options: ProcessorOptions {
                path_target: Some(PathTarget::SaveTo),
                ..ProcessorOptions::default()
            },
            rename_session: session,
            hash_session: None,
        };
        let mut rename = mem::take(&mut self.pipelines.rename);
        rename.run(self, &mut ctx);
        self.pipelines.rename = rename;

        if let (Some(old), Some(new)) = (old_complete, self.complete_filename())
            && old != new
        {
            self.hashes.rename(&old, &new)?;
        }
        Ok(())
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("filename", &self.filename)
            .field("extension", &self.extension)
            .field("save_to", &self.save_to)
            .field("relative_path", &self.relative_path)
            .field("length", &self.length)
            .field("mime_type", &self.mime_type)
            .field("file_type", &self.file_type)
            .field("meta", &self.meta)
            .field("actions", &self.actions)
            .field("state", &self.state)
            .field("content", &self.content)
            .finish_non_exhaustive()
    }
}

impl PartialEq for File {
    /// Equality is whatever the compare pipeline decides. A chain with
    /// too little data for a verdict counts as "not equal".
    fn eq(&self, other: &File) -> bool {
        self.pipelines.compare.evaluate(self, &[other]) == Some(true)
    }
}

impl PartialOrd for File {
    /// Ordering follows content length; equality follows the compare
    /// pipeline. Same-length files the pipeline cannot call equal are
    /// unordered.
    fn partial_cmp(&self, other: &File) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        match self.length.cmp(&other.length) {
            Ordering::Equal => None,
            ordering => Some(ordering),
        }
    }

    fn lt(&self, other: &File) -> bool {
        self.length < other.length
    }

    fn le(&self, other: &File) -> bool {
        self.lt(other) || self.eq(other)
    }

    fn gt(&self, other: &File) -> bool {
        self.length > other.length
    }

    fn ge(&self, other: &File) -> bool {
        self.gt(other) || self.eq(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::CacheKind;
    use crate::mimetype::KnownMimeTyper;
    use crate::storage::local::LocalStorage;

    fn storage() -> Arc<dyn Storage> {
        Arc::new(LocalStorage::new())
    }

    fn write_fixture(dir: &std::path::Path, name: &str, data: &[u8]) -> String {
        let path = dir.join(name);
        std::fs::write(&path, data).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_from_disk_extracts_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "report.txt", b"quarterly numbers");

        let file = File::from_disk(&path, storage(), KnownMimeTyper::new_arc());

        assert_eq!(file.filename.as_deref(), Some("report"));
        assert_eq!(file.extension.as_deref(), Some("txt"));
        assert_eq!(file.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(file.file_type.as_deref(), Some("text"));
        assert_eq!(file.length, 17);
        assert!(file.id.is_some());
        assert!(file.content.is_some());
        assert!(!file.state.processing);
    }

    #[test]
    fn test_set_complete_filename_archives_old_name() {
        let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
        file.filename = Some("draft".to_string());
        file.extension = Some("txt".to_string());
        file.state.adding = false;

        file.set_complete_filename("final".to_string(), Some("txt".to_string()));

        assert_eq!(file.filename.as_deref(), Some("final"));
        assert_eq!(file.naming.history_len(), 1);
        assert!(file.actions.rename);

        // 相同名字不产生历史记录。
        file.set_complete_filename("final".to_string(), Some("txt".to_string()));
        assert_eq!(file.naming.history_len(), 1);
    }

    #[test]
    fn test_add_valid_filename_rejects_unknown_extension() {
        let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
        assert!(!file.add_valid_filename("weird.zzyzx", false));
        assert!(file.filename.is_none());

        assert!(file.add_valid_filename("notes.txt", false));
        assert_eq!(file.filename.as_deref(), Some("notes"));
        assert_eq!(file.extension.as_deref(), Some("txt"));
    }

    #[test]
    fn test_add_valid_filename_enforces_resolved_mimetype() {
        let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
        file.mime_type = Some("text/plain".to_string());

        assert!(!file.add_valid_filename("photo.png", true));
        assert!(file.add_valid_filename("notes.txt", true));
    }

    #[test]
    fn test_packed_extension_marks_listing_pending() {
        let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
        assert!(file.add_valid_filename("bundle.zip", false));
        assert!(file.meta.packed);
        assert!(file.actions.list);
    }

    #[test]
    fn test_save_refuses_existing_target_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "taken.txt", b"already here");

        let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
        file.filename = Some("taken".to_string());
        file.extension = Some("txt".to_string());
        file.save_to = Some(dir.path().to_string_lossy().into_owned());
        file.set_content(ContentSource::Text("new data".to_string()));

        let result = file.save(&SaveOptions::default());
        assert!(matches!(result, Err(FileError::NotAllowed(_))));
    }

    #[test]
    fn test_save_writes_new_file_and_flips_state() {
        let dir = tempfile::tempdir().unwrap();

        let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
        file.filename = Some("fresh".to_string());
        file.extension = Some("txt".to_string());
        file.save_to = Some(dir.path().to_string_lossy().into_owned());
        file.set_content(ContentSource::Text("payload".to_string()));

        file.save(&SaveOptions::default()).unwrap();

        let written = std::fs::read_to_string(dir.path().join("fresh.txt")).unwrap();
        assert_eq!(written, "payload");
        assert!(file.id.is_some());
        assert!(!file.state.adding);
        assert!(file.actions.was_saved);
        assert_eq!(file.naming.previous_saved_extension.as_deref(), Some("txt"));
    }

    #[test]
    fn test_save_refuses_changed_content_without_update_permission() {
        let dir = tempfile::tempdir().unwrap();

        let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
        file.filename = Some("doc".to_string());
        file.extension = Some("txt".to_string());
        file.save_to = Some(dir.path().to_string_lossy().into_owned());
        file.set_content(ContentSource::Text("v1".to_string()));
        file.save(&SaveOptions::default()).unwrap();

        file.set_content(ContentSource::Text("v2".to_string()));
        assert!(file.state.changing);

        let refused = file.save(&SaveOptions {
            allow_update: false,
            ..SaveOptions::default()
        });
        assert!(matches!(refused, Err(FileError::NotAllowed(_))));

        file.save(&SaveOptions {
            allow_update: true,
            ..SaveOptions::default()
        })
        .unwrap();
        let written = std::fs::read_to_string(dir.path().join("doc.txt")).unwrap();
        assert_eq!(written, "v2");
    }

    #[test]
    fn test_save_refuses_extension_change_without_permission() {
        let dir = tempfile::tempdir().unwrap();

        let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
        file.filename = Some("notes".to_string());
        file.extension = Some("txt".to_string());
        file.save_to = Some(dir.path().to_string_lossy().into_owned());
        file.set_content(ContentSource::Text("body".to_string()));
        file.save(&SaveOptions::default()).unwrap();

        // 换扩展名并挂起改名状态。
        file.set_complete_filename("notes".to_string(), Some("md".to_string()));
        file.state.renaming = true;

        let refused = file.save(&SaveOptions {
            allow_extension_change: false,
            ..SaveOptions::default()
        });
        assert!(matches!(refused, Err(FileError::NotAllowed(_))));
        assert!(!dir.path().join("notes.md").exists());

        file.save(&SaveOptions::default()).unwrap();
        assert_eq!(file.naming.previous_saved_extension.as_deref(), Some("md"));
        assert!(!file.state.renaming);
    }

    #[test]
    fn test_save_with_session_renames_on_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let directory = dir.path().to_string_lossy().into_owned();
        let mut session = RenameSession::new();

        let mut blocker = File::bare(storage(), KnownMimeTyper::new_arc());
        blocker.filename = Some("shared".to_string());
        blocker.extension = Some("txt".to_string());
        blocker.save_to = Some(directory.clone());
        blocker.set_content(ContentSource::Text("first".to_string()));
        blocker.state.renaming = true;
        blocker
            .save_with(&SaveOptions::default(), &mut session)
            .unwrap();

        // 第二个对象要用同一个名字,会话账本里已被第一个占用。
        let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
        file.filename = Some("shared".to_string());
        file.extension = Some("txt".to_string());
        file.save_to = Some(directory.clone());
        file.set_content(ContentSource::Text("second".to_string()));
        file.state.adding = false;
        file.state.changing = true;
        file.state.renaming = true;

        file.save_with(
            &SaveOptions {
                allow_update: true,
                allow_rename: true,
                ..SaveOptions::default()
            },
            &mut session,
        )
        .unwrap();

        assert_ne!(file.complete_filename(), blocker.complete_filename());
        let renamed = file.complete_filename().unwrap();
        assert!(dir.path().join(&renamed).exists());
        assert!(session.is_reserved(&storage().sanitize_path(&directory), &renamed));
    }

    #[test]
    fn test_save_with_session_refuses_conflict_without_permission() {
        let dir = tempfile::tempdir().unwrap();
        let directory = dir.path().to_string_lossy().into_owned();
        let sanitized = storage().sanitize_path(&directory);

        let mut session = RenameSession::new();
        session.reserve(&sanitized, "held.txt", 0);

        let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
        file.filename = Some("held".to_string());
        file.extension = Some("txt".to_string());
        file.save_to = Some(directory);
        file.set_content(ContentSource::Text("data".to_string()));
        file.state.adding = false;
        file.state.changing = true;
        file.state.renaming = true;

        let refused = file.save_with(
            &SaveOptions {
                allow_update: true,
                ..SaveOptions::default()
            },
            &mut session,
        );
        assert!(matches!(refused, Err(FileError::Rename(_))));
    }

    #[test]
    fn test_generate_hashes_records_digests_for_chain() {
        let dir = tempfile::tempdir().unwrap();

        let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
        file.filename = Some("data".to_string());
        file.extension = Some("bin".to_string());
        file.save_to = Some(dir.path().to_string_lossy().into_owned());
        file.set_content(ContentSource::Bytes(vec![1, 2, 3]));

        file.generate_hashes(false);

        assert!(file.hashes.contains("sha256"));
        assert!(file.hashes.contains("crc32"));
        assert!(file.actions.was_hashed);
        assert!(!file.actions.hash);
    }

    /// 测试:force 不受动作台账限制,已登记的摘要被丢弃重算。
    #[test]
    fn test_generate_hashes_force_discards_recorded_digests() {
        let dir = tempfile::tempdir().unwrap();

        let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
        file.filename = Some("data".to_string());
        file.extension = Some("bin".to_string());
        file.save_to = Some(dir.path().to_string_lossy().into_owned());
        file.set_content(ContentSource::Bytes(vec![1, 2, 3]));
        file.generate_hashes(false);
        let genuine = file.hashes.digest_of("sha256").unwrap().to_string();

        // 台账已结,伪造一条记录顶掉真摘要。
        let bogus_sidecar = File::bare(storage(), KnownMimeTyper::new_arc());
        file.hashes.insert("sha256", "0".repeat(64), bogus_sidecar);
        assert!(!file.actions.hash);

        file.generate_hashes(true);
        assert_eq!(file.hashes.digest_of("sha256"), Some(genuine.as_str()));
        assert!(file.actions.was_hashed);
    }

    #[test]
    fn test_compare_to_requires_candidates() {
        let file = File::bare(storage(), KnownMimeTyper::new_arc());
        assert!(matches!(
            file.compare_to(&[]),
            Err(FileError::NothingToCompare)
        ));
    }

    #[test]
    fn test_equal_files_compare_equal() {
        let make = |text: &str| {
            let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
            file.file_type = Some("text".to_string());
            file.length = text.len() as u64;
            file.set_content_with_config(
                ContentSource::Text(text.to_string()),
                ContentConfig {
                    cache: CacheKind::Memory,
                    ..ContentConfig::default()
                },
            );
            // 预读一遍,数据比较器只认缓存里的完整副本。
            file.content.as_mut().unwrap().content_as_bytes().unwrap();
            file
        };

        let a = make("same bytes");
        let b = make("same bytes");
        let c = make("other data");

        assert!(a == b);
        assert!(a != c);
    }

    #[test]
    fn test_ordering_follows_length() {
        let mut small = File::bare(storage(), KnownMimeTyper::new_arc());
        small.length = 10;
        let mut large = File::bare(storage(), KnownMimeTyper::new_arc());
        large.length = 400;

        assert!(small < large);
        assert!(large > small);
        assert!(small.le(&large));
        assert!(!small.ge(&large));
    }

    #[test]
    fn test_extract_is_a_no_op_for_flat_files() {
        let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
        assert!(!file.extract(None, false).unwrap());
    }

    #[test]
    fn test_is_binary_prefers_semantic_type() {
        let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
        assert_eq!(file.is_binary(), None);

        file.set_content(ContentSource::Bytes(vec![0, 1]));
        assert_eq!(file.is_binary(), Some(true));

        file.file_type = Some("text".to_string());
        assert_eq!(file.is_binary(), Some(false));
    }

    #[test]
    fn test_validate_checks_extension_against_mimetype() {
        let dir = tempfile::tempdir().unwrap();

        let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
        file.filename = Some("photo".to_string());
        file.extension = Some("png".to_string());
        file.mime_type = Some("text/plain".to_string());
        file.save_to = Some(dir.path().to_string_lossy().into_owned());
        file.set_content(ContentSource::Bytes(vec![0]));

        assert!(matches!(
            file.validate(),
            Err(FileError::Validation(ValidationError::MimetypeMismatch { .. }))
        ));

        file.mime_type = Some("image/png".to_string());
        assert!(file.validate().is_ok());
    }
}
