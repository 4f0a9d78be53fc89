//! Package extractors that look inside archive files.
//!
//! Each format validates the file's extension against its declared set
//! before touching any bytes: a mismatch silently hands the file over to
//! the next processor in the unpack chain. Listing fills the parent's
//! packet with nested file objects whose content is a lazy entry stream,
//! so nothing is decompressed until an entry is actually read.
//!
//! // 包抽取器:先校验扩展名,不匹配就静默放行给下一个格式;
//! // 列出的内部文件持有惰性条目流,真正读取时才解压。

use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use flate2::read::GzDecoder;
use log::debug;
use thiserror::Error;

use crate::content::source::{ContentSource, LazyReadSeek, ReadSeek};
use crate::errors::{ConfigurationError, ValidationError};
use crate::file::File;
use crate::pipeline::{
    Pipeline, PipelineContext, ProcessorBinding, ProcessorError, ProcessorKind, ProcessorOptions,
};
use crate::pipelines::hasher::HasherKind;
use crate::storage::Storage;

/// Failure from an archive backend.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The backend did not recognize the data as a valid archive.
    #[error("the {format} backend rejected this archive: {reason}")]
    Rejected {
        format: &'static str,
        reason: String,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The archive formats the package family can list and decompress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageExtractorKind {
    /// `zip` and `cbz` archives.
    Zip,
    /// Plain `tar` and `cbt` archives.
    Tar,
    /// Gzip-compressed tarballs, `gz` and `tgz`.
    TarGz,
}

impl PackageExtractorKind {
    pub fn registry_id(&self) -> &'static str {
        match self {
            PackageExtractorKind::Zip => "zip-package",
            PackageExtractorKind::Tar => "tar-package",
            PackageExtractorKind::TarGz => "tar-gz-package",
        }
    }

    pub fn from_registry_id(id: &str) -> Option<PackageExtractorKind> {
        match id {
            "zip-package" => Some(PackageExtractorKind::Zip),
            "tar-package" => Some(PackageExtractorKind::Tar),
            "tar-gz-package" => Some(PackageExtractorKind::TarGz),
            _ => None,
        }
    }

    /// Extensions this format accepts in [`PackageExtractorKind::process`].
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            PackageExtractorKind::Zip => &["zip", "cbz"],
            PackageExtractorKind::Tar => &["tar", "cbt"],
            PackageExtractorKind::TarGz => &["gz", "tgz"],
        }
    }

    fn validate(&self, file: &File) -> Result<(), ValidationError> {
        let extension = file.extension.as_deref().unwrap_or("");
        if !self.extensions().contains(&extension) {
            return Err(ValidationError::ExtensionNotAllowed {
                extension: extension.to_string(),
                processor: self.registry_id(),
            });
        }
        Ok(())
    }

    /// Pipeline entry point: list the archive's entries into the packet.
    ///
    /// An extension outside the allow-list, a missing save-to directory
    /// and an archive the backend rejects all produce a `false` result
    /// instead of an error, so the rest of the unpack chain still runs.
    pub(crate) fn process(
        &self,
        file: &mut File,
        options: &ProcessorOptions,
        _ctx: &mut PipelineContext<'_>,
    ) -> Result<bool, ProcessorError> {
        let overrider = options.overrider.unwrap_or(false);

        if let Err(error) = self.validate(file) {
            debug!("package extractor {} skipped: {error}", self.registry_id());
            return Ok(false);
        }

        match self.list_entries(file, overrider) {
            Ok(()) => Ok(true),
            Err(
                error @ (ProcessorError::Configuration(_)
                | ProcessorError::Io(_)
                | ProcessorError::Extract(_)),
            ) => {
                debug!(
                    "package extractor {} had no data: {error}",
                    self.registry_id()
                );
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    /// Walks the archive and registers every inner file in the packet.
    ///
    /// // 列出归档:每个条目变成一个嵌套文件对象,日期、长度和容器
    /// // 自带的 CRC 摘要一并登记,内容指向惰性条目流。
    fn list_entries(&self, file: &mut File, overrider: bool) -> Result<(), ProcessorError> {
        let storage = file.storage_arc();
        let mimetyper = file.mimetyper_arc();
        let save_to = file
            .save_to
            .clone()
            .ok_or(ConfigurationError::MissingSaveTo)?;

        // 1. 归档字节的来源:磁盘文件直接按路径重开,否则物化一次后共享。
        let source = archive_source(file, &storage)?;
        let mut reader = source.open()?;
        let records = match self {
            PackageExtractorKind::Zip => list_zip(&mut *reader)?,
            PackageExtractorKind::Tar => list_tar(&mut *reader)?,
            PackageExtractorKind::TarGz => list_tar(GzDecoder::new(reader))?,
        };

        // 2. 为每个条目构造嵌套文件,已有条目默认不覆盖。
        for record in records {
            if file.packet.contains(&record.name) && !overrider {
                continue;
            }

            let path = storage.join(&save_to, &record.name);
            let mut internal = File::sidecar(&path, storage.clone(), mimetyper.clone());

            internal.create_date = record.create_date;
            internal.update_date = record.update_date;
            internal.length = record.length;

            if let Some(digest) = record.crc32 {
                let sidecar = HasherKind::Crc32.create_hash_file(&internal, &digest)?;
                internal
                    .hashes
                    .insert(HasherKind::Crc32.name(), digest, sidecar);
            }

            internal.actions.to_extract();
            internal.set_content(ContentSource::Lazy(Box::new(PackedEntryStream::new(
                *self,
                source.clone(),
                record.name.clone(),
            ))));
            internal.meta.hashable = false;
            internal.meta.internal = true;

            file.packet.insert(record.name, internal);
        }

        // 3. 宿主标记为包文件,列表动作记为完成。
        file.meta.packed = true;
        file.actions.listed();
        Ok(())
    }

    /// Bulk-extracts the archive to `decompress_to` on the storage.
    ///
    /// Entries that already exist at the destination are skipped unless
    /// `overrider` is set. Entry names that would escape the destination
    /// are always skipped. Returns `false` when the backend rejects the
    /// archive, leaving the next format in the chain to try.
    ///
    /// // 批量解压:已存在的目标默认跳过,越界的条目名一律拒绝;
    /// // 归档无法打开时返回 false,交给链上的下一个格式。
    pub(crate) fn decompress(
        &self,
        file: &mut File,
        options: &ProcessorOptions,
    ) -> Result<bool, ProcessorError> {
        let destination = options
            .decompress_to
            .clone()
            .ok_or(ConfigurationError::MissingInput("decompress_to"))?;
        let overrider = options.overrider.unwrap_or(false);
        let storage = file.storage_arc();

        let source = archive_source(file, &storage)?;
        let reader = source.open()?;
        match self {
            PackageExtractorKind::Zip => {
                decompress_zip(reader, storage.as_ref(), &destination, overrider)
            }
            PackageExtractorKind::Tar => {
                decompress_tar(reader, storage.as_ref(), &destination, overrider)
            }
            PackageExtractorKind::TarGz => decompress_tar(
                GzDecoder::new(reader),
                storage.as_ref(),
                &destination,
                overrider,
            ),
        }
    }
}

/// The unpack chain a fresh packet starts with: every known package
/// format, each a stopper, so the first format that accepts the archive
/// ends the run.
pub fn default_unpack_pipeline() -> Pipeline {
    Pipeline::new(vec![
        ProcessorBinding::new(ProcessorKind::Package(PackageExtractorKind::TarGz)),
        ProcessorBinding::new(ProcessorKind::Package(PackageExtractorKind::Tar)),
        ProcessorBinding::new(ProcessorKind::Package(PackageExtractorKind::Zip)),
    ])
}

/// What a backend reports about one archive entry before the nested
/// file object is built.
struct EntryRecord {
    name: String,
    length: u64,
    create_date: Option<DateTime<Utc>>,
    update_date: Option<DateTime<Utc>>,
    /// Container-provided digest, recorded under the crc32 hasher.
    crc32: Option<String>,
}

/// Where the archive bytes are re-opened from, shareable by every lazy
/// entry stream without borrowing the parent file.
#[derive(Clone)]
pub(crate) enum ArchiveSource {
    /// Archive sitting on a storage backend.
    Disk {
        storage: Arc<dyn Storage>,
        path: String,
    },
    /// Archive already materialized in memory.
    Memory(Arc<[u8]>),
}

impl ArchiveSource {
    fn open(&self) -> io::Result<Box<dyn ReadSeek>> {
        match self {
            ArchiveSource::Disk { storage, path } => storage.open_reader(path),
            ArchiveSource::Memory(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
        }
    }
}

fn archive_source(
    file: &mut File,
    storage: &Arc<dyn Storage>,
) -> Result<ArchiveSource, ProcessorError> {
    if let Some(path) = file.path.as_deref()
        && storage.is_file(path)
    {
        return Ok(ArchiveSource::Disk {
            storage: storage.clone(),
            path: path.to_string(),
        });
    }

    let content = file
        .content
        .as_mut()
        .ok_or(ConfigurationError::MissingContent)?;

    // 经由缓冲视图整体读出,免缓存策略下 content() 不可用。
    let buffer = content.content_as_buffer()?;
    let mut bytes = Vec::new();
    buffer.read_to_end(&mut bytes)?;
    buffer.seek(SeekFrom::Start(0))?;
    Ok(ArchiveSource::Memory(Arc::from(bytes)))
}

fn reject_zip(error: zip::result::ZipError) -> ExtractError {
    match error {
        zip::result::ZipError::Io(source) => ExtractError::Io(source),
        other => ExtractError::Rejected {
            format: "zip",
            reason: other.to_string(),
        },
    }
}

fn list_zip(reader: &mut dyn ReadSeek) -> Result<Vec<EntryRecord>, ExtractError> {
    let mut archive = zip::ZipArchive::new(reader).map_err(reject_zip)?;
    let mut records = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let entry = archive.by_index(index).map_err(reject_zip)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if name.is_empty() {
            continue;
        }

        // zip 只记录修改时间,创建时间按修改时间处理。
        let modified = zip_datetime(entry.last_modified());
        records.push(EntryRecord {
            name,
            length: entry.size(),
            create_date: modified,
            update_date: modified,
            crc32: Some(entry.crc32().to_string()),
        });
    }

    Ok(records)
}

fn list_tar(reader: impl Read) -> Result<Vec<EntryRecord>, ExtractError> {
    let mut archive = tar::Archive::new(reader);
    let mut records = Vec::new();

    for entry in archive.entries()? {
        let entry = entry?;
        let header = entry.header();
        if !header.entry_type().is_file() {
            continue;
        }
        let Ok(path) = entry.path() else {
            continue;
        };
        let name = path.to_string_lossy().into_owned();
        if name.is_empty() {
            continue;
        }

        let modified = header
            .mtime()
            .ok()
            .and_then(|seconds| Utc.timestamp_opt(seconds as i64, 0).single());
        // tar 头部的校验和字段当作容器提供的摘要登记。
        let crc32 = header
            .cksum()
            .ok()
            .filter(|sum| *sum != 0)
            .map(|sum| sum.to_string());

        records.push(EntryRecord {
            name,
            length: entry.size(),
            create_date: modified,
            update_date: modified,
            crc32,
        });
    }

    Ok(records)
}

fn zip_datetime(value: zip::DateTime) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(
        i32::from(value.year()),
        u32::from(value.month()),
        u32::from(value.day()),
        u32::from(value.hour()),
        u32::from(value.minute()),
        u32::from(value.second()),
    )
    .single()
}

/// Rejects entry names that would land outside the extraction root.
fn is_safe_entry_name(name: &str) -> bool {
    if name.starts_with('/') || name.starts_with('\\') {
        return false;
    }
    !name
        .split(['/', '\\'])
        .any(|component| component == "..")
}

fn decompress_zip(
    mut reader: Box<dyn ReadSeek>,
    storage: &dyn Storage,
    destination: &str,
    overrider: bool,
) -> Result<bool, ProcessorError> {
    let mut archive = match zip::ZipArchive::new(&mut *reader) {
        Ok(archive) => archive,
        Err(error) => {
            debug!("zip backend rejected this archive: {error}");
            return Ok(false);
        }
    };

    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(error) => {
                debug!("zip backend rejected entry {index}: {error}");
                return Ok(false);
            }
        };
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if name.is_empty() || !is_safe_entry_name(&name) {
            debug!("skipping archive entry with unsafe name: {name}");
            continue;
        }

        let target = storage.join(destination, &name);
        if storage.exists(&target) && !overrider {
            continue;
        }
        storage.save_stream(&target, &mut entry)?;
    }

    Ok(true)
}

fn decompress_tar(
    reader: impl Read,
    storage: &dyn Storage,
    destination: &str,
    overrider: bool,
) -> Result<bool, ProcessorError> {
    let mut archive = tar::Archive::new(reader);
    let entries = match archive.entries() {
        Ok(entries) => entries,
        Err(error) => {
            debug!("tar backend rejected this archive: {error}");
            return Ok(false);
        }
    };

    for entry in entries {
        let mut entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                debug!("tar backend rejected an entry: {error}");
                return Ok(false);
            }
        };
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let Ok(path) = entry.path() else {
            continue;
        };
        let name = path.to_string_lossy().into_owned();
        if name.is_empty() || !is_safe_entry_name(&name) {
            debug!("skipping archive entry with unsafe name: {name}");
            continue;
        }

        let target = storage.join(destination, &name);
        if storage.exists(&target) && !overrider {
            continue;
        }
        storage.save_stream(&target, &mut entry)?;
    }

    Ok(true)
}

/// Lazy stream over one archive entry.
///
/// Nothing is read from the archive until the first `read` or `seek`;
/// the decompressed entry is cached in memory thereafter. A name absent
/// from a tar archive reads as empty, matching how a missing member
/// behaves, while a missing zip entry surfaces an error.
///
/// // 惰性条目流:首次访问才定位并解出条目,之后复用内存缓存。
pub(crate) struct PackedEntryStream {
    format: PackageExtractorKind,
    source: ArchiveSource,
    entry_name: String,
    buffer: Option<Cursor<Vec<u8>>>,
}

impl PackedEntryStream {
    pub(crate) fn new(
        format: PackageExtractorKind,
        source: ArchiveSource,
        entry_name: String,
    ) -> PackedEntryStream {
        PackedEntryStream {
            format,
            source,
            entry_name,
            buffer: None,
        }
    }

    fn buffer(&mut self) -> io::Result<&mut Cursor<Vec<u8>>> {
        if self.buffer.is_none() {
            let mut reader = self.source.open()?;
            let bytes = match self.format {
                PackageExtractorKind::Zip => read_zip_entry(&mut *reader, &self.entry_name)?,
                PackageExtractorKind::Tar => read_tar_entry(&mut *reader, &self.entry_name)?,
                PackageExtractorKind::TarGz => {
                    read_tar_entry(GzDecoder::new(reader), &self.entry_name)?
                }
            };
            self.buffer = Some(Cursor::new(bytes));
        }
        match self.buffer.as_mut() {
            Some(buffer) => Ok(buffer),
            None => Err(io::Error::other("entry buffer vanished after mounting")),
        }
    }
}

impl Read for PackedEntryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.buffer()?.read(buf)
    }
}

impl Seek for PackedEntryStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.buffer()?.seek(pos)
    }
}

impl LazyReadSeek for PackedEntryStream {
    fn seekable(&self) -> bool {
        true
    }

    fn as_read_seek(&mut self) -> &mut dyn ReadSeek {
        self
    }
}

fn read_zip_entry(reader: &mut dyn ReadSeek, name: &str) -> io::Result<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(reader).map_err(io::Error::other)?;
    let mut entry = archive.by_name(name).map_err(io::Error::other)?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn read_tar_entry(reader: impl Read, name: &str) -> io::Result<Vec<u8>> {
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let Ok(path) = entry.path() else {
            continue;
        };
        if path.to_string_lossy() == name {
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;
            return Ok(bytes);
        }
    }
    // 归档里找不到条目时按空内容处理。
    Ok(Vec::new())
}
