//! Extractor processors that populate a file's identity from whatever
//! source is at hand.
//!
//! Extractors fill attributes incrementally: a field that already holds a
//! value is left alone unless the caller passes `overrider`. Missing
//! required inputs abort only the one extractor, which reports a `false`
//! result so the rest of the chain still runs.
//!
//! // 抽取器:按来源增量填充文件属性,已有值默认不覆盖;
//! // 缺少必要输入只会让单个抽取器返回 false,不会打断整条流水线。

pub mod package;

use std::collections::BTreeMap;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use url::Url;

use crate::content::source::{ContentSource, LazyReadSeek, ReadSeek};
use crate::errors::ConfigurationError;
use crate::file::File;
use crate::pipeline::{PipelineContext, ProcessorError, ProcessorKind, ProcessorOptions};
use crate::pipelines::hasher::HasherKind;
use crate::storage::Storage;
use crate::utils::datetime::parse_http_date;
use crate::utils::filename::split_complete;

/// The extractor processors known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    /// Filename, extension and save-to directory from the file's path.
    FilenameAndExtensionFromPath,
    /// Filename from a `Content-Disposition` header.
    FilenameFromMetadata,
    /// Filename from candidate URL path segments.
    FilenameFromUrl,
    /// Relative path (and fallback filename) from candidate URLs.
    PathFromUrl,
    /// Identity, mimetype, dates and length from an HTTP-header-like map.
    MetadataHeaders,
    /// Mimetype and semantic type from the registered extension.
    MimeTypeFromFilename,
    /// Size, dates, path id and lazy content from the storage backend.
    FileSystemData,
    /// Digests from checksum manifests next to the file.
    ChecksumManifest,
}

impl ExtractorKind {
    pub fn registry_id(&self) -> &'static str {
        match self {
            ExtractorKind::FilenameAndExtensionFromPath => "filename-from-path",
            ExtractorKind::FilenameFromMetadata => "filename-from-metadata",
            ExtractorKind::FilenameFromUrl => "filename-from-url",
            ExtractorKind::PathFromUrl => "path-from-url",
            ExtractorKind::MetadataHeaders => "metadata-headers",
            ExtractorKind::MimeTypeFromFilename => "mimetype-from-filename",
            ExtractorKind::FileSystemData => "filesystem-data",
            ExtractorKind::ChecksumManifest => "checksum-manifest",
        }
    }

    pub fn from_registry_id(id: &str) -> Option<ExtractorKind> {
        match id {
            "filename-from-path" => Some(ExtractorKind::FilenameAndExtensionFromPath),
            "filename-from-metadata" => Some(ExtractorKind::FilenameFromMetadata),
            "filename-from-url" => Some(ExtractorKind::FilenameFromUrl),
            "path-from-url" => Some(ExtractorKind::PathFromUrl),
            "metadata-headers" => Some(ExtractorKind::MetadataHeaders),
            "mimetype-from-filename" => Some(ExtractorKind::MimeTypeFromFilename),
            "filesystem-data" => Some(ExtractorKind::FileSystemData),
            "checksum-manifest" => Some(ExtractorKind::ChecksumManifest),
            _ => None,
        }
    }

    /// Pipeline entry point.
    ///
    /// Configuration and I/O problems mean "this source has nothing for
    /// us" and are absorbed into a `false` result; anything else is a
    /// genuine failure and surfaces to the pipeline's error list.
    ///
    /// // 配置或 IO 问题视为该来源无数据,吸收为 false;其余错误上抛。
    pub(crate) fn process(
        &self,
        file: &mut File,
        options: &ProcessorOptions,
        ctx: &mut PipelineContext<'_>,
    ) -> Result<bool, ProcessorError> {
        let overrider = options.overrider.unwrap_or(false);

        let outcome = match self {
            ExtractorKind::FilenameAndExtensionFromPath => from_path(file, overrider),
            ExtractorKind::FilenameFromMetadata => from_metadata(file, options, overrider),
            ExtractorKind::FilenameFromUrl => filename_from_url(file, options, overrider),
            ExtractorKind::PathFromUrl => path_from_url(file, options, overrider),
            ExtractorKind::MetadataHeaders => metadata_headers(file, options, overrider),
            ExtractorKind::MimeTypeFromFilename => mimetype_from_filename(file, overrider),
            ExtractorKind::FileSystemData => filesystem_data(file),
            ExtractorKind::ChecksumManifest => checksum_manifest(file, options, ctx, overrider),
        };

        match outcome {
            Ok(()) => Ok(true),
            Err(error @ (ProcessorError::Configuration(_) | ProcessorError::Io(_))) => {
                debug!("extractor {} had no data: {error}", self.registry_id());
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }
}

/// Derives filename, extension, save-to directory and relative path
/// from the file's own path.
fn from_path(file: &mut File, overrider: bool) -> Result<(), ProcessorError> {
    let path = file
        .path
        .clone()
        .filter(|path| !path.is_empty())
        .ok_or(ConfigurationError::MissingPath)?;

    if file.filename.is_some() && !overrider {
        return Ok(());
    }

    let storage = file.storage_arc();

    // 1. 先把路径规范化并写回。
    let sanitized = storage.sanitize_path(&path);
    file.path = Some(sanitized.clone());

    // 2. 有注册扩展名就拆出来,否则整个名字当作无扩展文件名。
    let complete_filename = storage.get_filename_from_path(&sanitized);
    if !(complete_filename.contains('.') && file.add_valid_filename(&complete_filename, false)) {
        file.filename = Some(complete_filename);
        file.extension = Some(String::new());
    }

    // 3. save_to 取目录部分;相对路径此时为空。
    file.save_to = Some(storage.get_directory_from_path(&sanitized));
    file.relative_path = Some(String::new());
    Ok(())
}

/// Pulls a filename out of a `Content-Disposition` header.
///
/// Quoted `filename=`/`filename*=` values are tried in order, starred
/// entries first. A value with a registered extension wins outright;
/// otherwise the first quoted value becomes an extensionless filename.
fn from_metadata(
    file: &mut File,
    options: &ProcessorOptions,
    overrider: bool,
) -> Result<(), ProcessorError> {
    if file.filename.is_some() && !overrider {
        return Ok(());
    }

    let headers = options
        .headers
        .as_ref()
        .ok_or(ConfigurationError::MissingInput("headers"))?;

    let disposition = content_disposition(headers);
    if disposition.is_empty() {
        return Ok(());
    }
    file.meta.add("disposition", disposition.clone());

    let mut candidates: Vec<&String> = disposition
        .iter()
        .filter(|part| part.contains("filename"))
        .collect();
    if candidates.is_empty() {
        return Ok(());
    }
    // `filename*=` 排在 `filename=` 前面。
    candidates.sort();

    let mut fallbacks: Vec<String> = Vec::new();
    for candidate in candidates {
        let Some(complete_filename) = quoted_value(candidate) else {
            continue;
        };
        if complete_filename.contains('.') && file.add_valid_filename(&complete_filename, false) {
            return Ok(());
        }
        if !complete_filename.is_empty() {
            fallbacks.push(complete_filename);
        }
    }

    if let Some(first) = fallbacks.into_iter().next() {
        file.filename = Some(first);
        file.extension = Some(String::new());
    }
    Ok(())
}

/// Resolves mimetype and semantic type from the file's extension.
fn mimetype_from_filename(file: &mut File, overrider: bool) -> Result<(), ProcessorError> {
    if file.mime_type.is_some() && !overrider {
        return Ok(());
    }

    let extension = file
        .extension
        .clone()
        .filter(|extension| !extension.is_empty())
        .ok_or(ConfigurationError::MissingExtension)?;

    let mimetyper = file.mimetyper_arc();
    file.mime_type = mimetyper.get_mimetype(&extension);
    file.file_type = mimetyper.get_type(file.mime_type.as_deref(), Some(&extension));
    Ok(())
}

/// Stats the file on its storage backend and attaches lazily-opened
/// content.
///
/// The semantic type must already be resolved; running this on an
/// unclassified file is an ordering mistake in the pipeline, and the
/// step reports `false` like any other source with no data.
fn filesystem_data(file: &mut File) -> Result<(), ProcessorError> {
    let path = file
        .path
        .clone()
        .filter(|path| !path.is_empty())
        .ok_or(ConfigurationError::MissingPath)?;
    if file.file_type.as_deref().is_none_or(str::is_empty) {
        return Err(ConfigurationError::MissingFileType.into());
    }

    let storage = file.storage_arc();

    if !storage.exists(&path) {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no file exists at '{path}'"),
        )
        .into());
    }
    if storage.is_dir(&path) {
        return Err(ConfigurationError::PathIsDirectory.into());
    }

    file.id = Some(storage.get_path_id(&path)?);
    file.length = storage.get_size(&path)?;
    file.create_date = Some(storage.get_created_date(&path)?);
    file.update_date = Some(storage.get_modified_date(&path)?);

    // 内容按需打开:首次读取时才真正碰磁盘。
    file.set_content(ContentSource::Lazy(Box::new(StorageStream::new(
        storage.clone(),
        path,
    ))));
    file.meta.add("saved", true);
    Ok(())
}

/// Lets every hasher of the file's hash pipeline try to load its digest
/// from a manifest, without computing anything.
fn checksum_manifest(
    file: &mut File,
    options: &ProcessorOptions,
    ctx: &mut PipelineContext<'_>,
    overrider: bool,
) -> Result<(), ProcessorError> {
    if file.path.as_deref().is_none_or(str::is_empty) {
        return Err(ConfigurationError::MissingPath.into());
    }

    let kinds: Vec<HasherKind> = file
        .pipelines
        .hash
        .bindings()
        .iter()
        .filter_map(|binding| match binding.kind {
            ProcessorKind::Hash(kind) => Some(kind),
            _ => None,
        })
        .collect();

    let mut manifest_options = options.clone();
    manifest_options.full_check = Some(options.full_check.unwrap_or(false));

    for kind in kinds {
        if file.hashes.contains(kind.name()) && !overrider {
            continue;
        }
        // 找不到清单只是 false,不算错误;真正的歧义从这里上抛。
        kind.process_from_file(file, &manifest_options, ctx)?;
    }
    Ok(())
}

/// Populates identity, mimetype, dates and length from an
/// HTTP-header-like map.
fn metadata_headers(
    file: &mut File,
    options: &ProcessorOptions,
    overrider: bool,
) -> Result<(), ProcessorError> {
    let headers = options
        .headers
        .as_ref()
        .filter(|headers| !headers.is_empty())
        .ok_or(ConfigurationError::MissingInput("headers"))?;
    let mimetyper = file.mimetyper_arc();

    // 1. ETag 充当 id。
    if let Some(etag) = header(headers, "ETag").and_then(quoted_value)
        && (file.id.is_none() || overrider)
    {
        file.id = Some(etag);
    }

    // 2. Content-Type 给出 mimetype,流式 mimetype 不反推扩展名。
    let mimetype = header(headers, "Content-Type")
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    if let Some(mime) = &mimetype {
        if file.mime_type.is_none() || overrider {
            file.mime_type = Some(mime.clone());
        }
        if (file.extension.as_deref().is_none_or(str::is_empty) || overrider)
            && !mime.contains("stream")
            && let Some(extension) = mimetyper.guess_extension_from_mimetype(mime)
        {
            file.meta.compressed = mimetyper.is_extension_compressed(&extension);
            file.meta.lossless = mimetyper.is_extension_lossless(&extension);
            file.extension = Some(extension);
        }
    }

    // 3. mimetype 和扩展名都齐了才解析语义类型。
    if file.mime_type.is_some()
        && file.extension.is_some()
        && (file.file_type.is_none() || overrider)
    {
        file.file_type = mimetyper.get_type(file.mime_type.as_deref(), file.extension.as_deref());
    }

    // 4. 日期:创建时间取 Date 与 Last-Modified 中较早者。
    if let Some(date) = creation_date(headers)
        && (file.create_date.is_none() || overrider)
    {
        file.create_date = Some(date);
    }
    if let Some(date) = header(headers, "Last-Modified").and_then(parse_http_date)
        && (file.update_date.is_none() || overrider)
    {
        file.update_date = Some(date);
    }

    // 5. 长度与附加元数据。
    let length = header(headers, "Content-Length")
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(0);
    if length > 0 && (file.length == 0 || overrider) {
        file.length = length;
    }

    let language: Vec<String> = header(headers, "Content-Language")
        .map(|value| value.split(',').map(|part| part.trim().to_string()).collect())
        .unwrap_or_default();
    if !language.is_empty() && (!file.meta.has("language") || overrider) {
        file.meta.add("language", language);
    }

    if let Some(expire) = header(headers, "Expires").and_then(parse_http_date)
        && (!file.meta.has("expire") || overrider)
    {
        file.meta.add("expire", expire.to_rfc3339());
    }
    Ok(())
}

/// Picks a filename from candidate URLs.
///
/// Candidates with a registered extension win, preferring ones whose
/// extension also matches an already-known mimetype. When nothing
/// qualifies the last candidate's segment is used verbatim, unless the
/// caller disabled that fallback.
fn filename_from_url(
    file: &mut File,
    options: &ProcessorOptions,
    overrider: bool,
) -> Result<(), ProcessorError> {
    if file.filename.is_some() && !overrider {
        return Ok(());
    }

    let urls = options
        .urls
        .as_ref()
        .ok_or(ConfigurationError::MissingInput("urls"))?;
    let candidates: Vec<UrlCandidate> = urls.iter().filter_map(|raw| url_candidate(raw)).collect();
    if candidates.is_empty() {
        return Ok(());
    }

    // 1. 两轮尝试:先要求扩展名匹配 mimetype,再放宽。
    let mut matched_directory: Option<String> = None;
    'attempts: for enforce_mimetype in [true, false] {
        for candidate in &candidates {
            if file.add_valid_filename(&candidate.filename, enforce_mimetype) {
                matched_directory = Some(candidate.directory.clone());
                break 'attempts;
            }
        }
    }

    // 2. 没有合格候选时退回最后一个路径段。
    let directory = match matched_directory {
        Some(directory) => directory,
        None => {
            if options.url_fallback == Some(false) {
                return Ok(());
            }
            let last = match candidates.last() {
                Some(candidate) => candidate,
                None => return Ok(()),
            };
            let (filename, extension) = split_complete(&last.filename);
            file.set_complete_filename(filename, extension);
            last.directory.clone()
        }
    };

    if file.relative_path.as_deref().is_none_or(str::is_empty) || overrider {
        file.relative_path = Some(directory);
    }
    Ok(())
}

/// Takes the relative path (and, when unset, the filename) from the
/// last candidate URL that ends in something filename-shaped.
fn path_from_url(
    file: &mut File,
    options: &ProcessorOptions,
    overrider: bool,
) -> Result<(), ProcessorError> {
    if !file.relative_path.as_deref().is_none_or(str::is_empty) && !overrider {
        return Ok(());
    }

    let urls = options
        .urls
        .as_ref()
        .ok_or(ConfigurationError::MissingInput("urls"))?;
    let candidates: Vec<UrlCandidate> = urls.iter().filter_map(|raw| url_candidate(raw)).collect();
    if candidates.is_empty() {
        return Ok(());
    }

    for candidate in candidates.iter().rev() {
        if candidate.filename.contains('.') {
            file.relative_path = Some(candidate.directory.clone());
            if file.filename.is_none() {
                let (filename, extension) = split_complete(&candidate.filename);
                file.set_complete_filename(filename, extension);
            }
            return Ok(());
        }
    }

    // 没有带文件名的候选,整个路径都算目录。
    if let Some(last) = candidates.last() {
        file.relative_path = Some(if last.directory.is_empty() {
            last.filename.clone()
        } else {
            format!("{}/{}", last.directory, last.filename)
        });
    }
    Ok(())
}

/// Case-insensitive header lookup.
fn header<'a>(headers: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Value between the first pair of double quotes, e.g. the payload of
/// `filename="report.pdf"` or a quoted ETag.
fn quoted_value(raw: &str) -> Option<String> {
    let begin = raw.find('"')? + 1;
    let end = raw[begin..].find('"')? + begin;
    Some(raw[begin..end].to_string())
}

/// `Content-Disposition` split into trimmed `;`-separated parts.
fn content_disposition(headers: &BTreeMap<String, String>) -> Vec<String> {
    header(headers, "Content-Disposition")
        .map(|value| value.split(';').map(|part| part.trim().to_string()).collect())
        .unwrap_or_default()
}

/// Creation date per HTTP semantics: `Date`, clamped down to
/// `Last-Modified` when that one is earlier.
fn creation_date(headers: &BTreeMap<String, String>) -> Option<DateTime<Utc>> {
    let last_modified = header(headers, "Last-Modified").and_then(parse_http_date);
    match header(headers, "Date").and_then(parse_http_date) {
        Some(date) => match last_modified {
            Some(last_modified) if last_modified < date => Some(last_modified),
            _ => Some(date),
        },
        None => last_modified,
    }
}

/// One URL reduced to its path: the last segment as a filename
/// candidate, the segments before it as a directory.
struct UrlCandidate {
    directory: String,
    filename: String,
}

fn url_candidate(raw: &str) -> Option<UrlCandidate> {
    let parsed = Url::parse(raw).ok()?;
    let segments: Vec<&str> = parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .collect();
    let (last, directory_segments) = segments.split_last()?;
    Some(UrlCandidate {
        directory: directory_segments.join("/"),
        filename: (*last).to_string(),
    })
}

/// Content stream that opens its storage reader on first use.
///
/// // 惰性磁盘流:首次 read/seek 才通过 Storage 打开底层文件。
pub(crate) struct StorageStream {
    storage: Arc<dyn Storage>,
    path: String,
    reader: Option<Box<dyn ReadSeek>>,
}

impl StorageStream {
    pub(crate) fn new(storage: Arc<dyn Storage>, path: String) -> StorageStream {
        StorageStream {
            storage,
            path,
            reader: None,
        }
    }

    fn reader(&mut self) -> io::Result<&mut Box<dyn ReadSeek>> {
        if self.reader.is_none() {
            self.reader = Some(self.storage.open_reader(&self.path)?);
        }
        match self.reader.as_mut() {
            Some(reader) => Ok(reader),
            None => Err(io::Error::other("storage reader vanished after opening")),
        }
    }
}

impl Read for StorageStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader()?.read(buf)
    }
}

impl Seek for StorageStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.reader()?.seek(pos)
    }
}

impl LazyReadSeek for StorageStream {
    fn seekable(&self) -> bool {
        true
    }

    fn as_read_seek(&mut self) -> &mut dyn ReadSeek {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::mimetype::KnownMimeTyper;
    use crate::storage::LocalStorage;

    use super::*;

    fn bare_file() -> File {
        File::bare(Arc::new(LocalStorage::new()), KnownMimeTyper::new_arc())
    }

    fn run(
        kind: ExtractorKind,
        file: &mut File,
        options: &ProcessorOptions,
    ) -> Result<bool, ProcessorError> {
        let mut ctx = PipelineContext::new();
        kind.process(file, options, &mut ctx)
    }

    #[test]
    fn test_from_path_splits_registered_extension() {
        let mut file = bare_file();
        file.path = Some("/tmp/data/report.txt".to_string());

        let result = run(
            ExtractorKind::FilenameAndExtensionFromPath,
            &mut file,
            &ProcessorOptions::default(),
        )
        .unwrap();

        assert!(result);
        assert_eq!(file.filename.as_deref(), Some("report"));
        assert_eq!(file.extension.as_deref(), Some("txt"));
        assert_eq!(file.save_to.as_deref(), Some("/tmp/data"));
        assert_eq!(file.relative_path.as_deref(), Some(""));
    }

    #[test]
    fn test_from_path_keeps_unregistered_name_whole() {
        let mut file = bare_file();
        file.path = Some("/tmp/data/README".to_string());

        run(
            ExtractorKind::FilenameAndExtensionFromPath,
            &mut file,
            &ProcessorOptions::default(),
        )
        .unwrap();

        assert_eq!(file.filename.as_deref(), Some("README"));
        assert_eq!(file.extension.as_deref(), Some(""));
        assert_eq!(file.save_to.as_deref(), Some("/tmp/data"));
    }

    #[test]
    fn test_from_path_marks_archives_for_listing() {
        let mut file = bare_file();
        file.path = Some("/tmp/data/backup.zip".to_string());

        run(
            ExtractorKind::FilenameAndExtensionFromPath,
            &mut file,
            &ProcessorOptions::default(),
        )
        .unwrap();

        assert!(file.meta.packed);
        assert!(file.meta.compressed);
        assert!(file.actions.list);
    }

    #[test]
    fn test_from_path_without_path_reports_false() {
        let mut file = bare_file();
        let result = run(
            ExtractorKind::FilenameAndExtensionFromPath,
            &mut file,
            &ProcessorOptions::default(),
        )
        .unwrap();
        assert!(!result);
    }

    #[test]
    fn test_from_metadata_prefers_quoted_disposition_filename() {
        let mut file = bare_file();
        let mut headers = BTreeMap::new();
        headers.insert(
            "Content-Disposition".to_string(),
            "attachment; filename=\"report.pdf\"".to_string(),
        );
        let options = ProcessorOptions {
            headers: Some(headers),
            ..ProcessorOptions::default()
        };

        let result = run(ExtractorKind::FilenameFromMetadata, &mut file, &options).unwrap();

        assert!(result);
        assert_eq!(file.filename.as_deref(), Some("report"));
        assert_eq!(file.extension.as_deref(), Some("pdf"));
        assert!(file.meta.has("disposition"));
    }

    #[test]
    fn test_from_metadata_falls_back_to_extensionless_name() {
        let mut file = bare_file();
        let mut headers = BTreeMap::new();
        headers.insert(
            "Content-Disposition".to_string(),
            "attachment; filename=\"export\"".to_string(),
        );
        let options = ProcessorOptions {
            headers: Some(headers),
            ..ProcessorOptions::default()
        };

        run(ExtractorKind::FilenameFromMetadata, &mut file, &options).unwrap();

        assert_eq!(file.filename.as_deref(), Some("export"));
        assert_eq!(file.extension.as_deref(), Some(""));
    }

    #[test]
    fn test_from_metadata_without_headers_reports_false() {
        let mut file = bare_file();
        let result = run(
            ExtractorKind::FilenameFromMetadata,
            &mut file,
            &ProcessorOptions::default(),
        )
        .unwrap();
        assert!(!result);
    }

    #[test]
    fn test_mimetype_from_filename() {
        let mut file = bare_file();
        file.extension = Some("png".to_string());

        run(
            ExtractorKind::MimeTypeFromFilename,
            &mut file,
            &ProcessorOptions::default(),
        )
        .unwrap();

        assert_eq!(file.mime_type.as_deref(), Some("image/png"));
        assert_eq!(file.file_type.as_deref(), Some("image"));
    }

    #[test]
    fn test_mimetype_requires_extension() {
        let mut file = bare_file();
        let result = run(
            ExtractorKind::MimeTypeFromFilename,
            &mut file,
            &ProcessorOptions::default(),
        )
        .unwrap();
        assert!(!result);

        // 空扩展名等同缺失。
        file.extension = Some(String::new());
        let result = run(
            ExtractorKind::MimeTypeFromFilename,
            &mut file,
            &ProcessorOptions::default(),
        )
        .unwrap();
        assert!(!result);
    }

    #[test]
    fn test_filesystem_data_stats_and_attaches_content() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("notes.txt");
        std::fs::write(&target, b"hello disk").unwrap();

        let mut file = bare_file();
        file.path = Some(target.to_string_lossy().to_string());
        file.file_type = Some("text".to_string());

        let result = run(
            ExtractorKind::FileSystemData,
            &mut file,
            &ProcessorOptions::default(),
        )
        .unwrap();

        assert!(result);
        assert!(file.id.is_some());
        assert_eq!(file.length, 10);
        assert!(file.create_date.is_some());
        assert!(file.update_date.is_some());
        assert_eq!(file.meta.get("saved"), Some(&serde_json::Value::Bool(true)));

        let content = file.content.as_mut().unwrap();
        let mut bytes = Vec::new();
        for block in content.blocks() {
            bytes.extend(block.unwrap());
        }
        assert_eq!(bytes, b"hello disk");
    }

    #[test]
    fn test_filesystem_data_requires_resolved_type() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("notes.txt");
        std::fs::write(&target, b"hello").unwrap();

        let mut file = bare_file();
        file.path = Some(target.to_string_lossy().to_string());

        let result = run(
            ExtractorKind::FileSystemData,
            &mut file,
            &ProcessorOptions::default(),
        )
        .unwrap();
        assert!(!result);
    }

    #[test]
    fn test_filesystem_data_rejects_directories() {
        let temp = tempfile::tempdir().unwrap();

        let mut file = bare_file();
        file.path = Some(temp.path().to_string_lossy().to_string());
        file.file_type = Some("text".to_string());

        let result = run(
            ExtractorKind::FileSystemData,
            &mut file,
            &ProcessorOptions::default(),
        )
        .unwrap();
        assert!(!result);
    }

    #[test]
    fn test_metadata_headers_populates_identity_and_dates() {
        let mut file = bare_file();
        let mut headers = BTreeMap::new();
        headers.insert("ETag".to_string(), "\"33a64df5\"".to_string());
        headers.insert("Content-Type".to_string(), "image/png; charset=binary".to_string());
        headers.insert("Content-Length".to_string(), "2048".to_string());
        headers.insert(
            "Date".to_string(),
            "Wed, 21 Oct 2015 07:28:00 GMT".to_string(),
        );
        headers.insert(
            "Last-Modified".to_string(),
            "Tue, 20 Oct 2015 07:28:00 GMT".to_string(),
        );
        headers.insert("Content-Language".to_string(), "de-DE, en-CA".to_string());
        let options = ProcessorOptions {
            headers: Some(headers),
            ..ProcessorOptions::default()
        };

        let result = run(ExtractorKind::MetadataHeaders, &mut file, &options).unwrap();

        assert!(result);
        assert_eq!(file.id.as_deref(), Some("33a64df5"));
        assert_eq!(file.mime_type.as_deref(), Some("image/png"));
        assert_eq!(file.extension.as_deref(), Some("png"));
        assert_eq!(file.file_type.as_deref(), Some("image"));
        assert_eq!(file.length, 2048);
        // Last-Modified 早于 Date,创建时间取前者。
        let expected = chrono::TimeZone::with_ymd_and_hms(&Utc, 2015, 10, 20, 7, 28, 0).unwrap();
        assert_eq!(file.create_date, Some(expected));
        assert_eq!(file.update_date, Some(expected));
        assert!(file.meta.has("language"));
    }

    #[test]
    fn test_metadata_headers_skips_stream_mimetype_extension() {
        let mut file = bare_file();
        let mut headers = BTreeMap::new();
        headers.insert(
            "Content-Type".to_string(),
            "application/octet-stream".to_string(),
        );
        let options = ProcessorOptions {
            headers: Some(headers),
            ..ProcessorOptions::default()
        };

        run(ExtractorKind::MetadataHeaders, &mut file, &options).unwrap();

        assert_eq!(file.mime_type.as_deref(), Some("application/octet-stream"));
        assert_eq!(file.extension, None);
    }

    #[test]
    fn test_filename_from_url_prefers_registered_extension() {
        let mut file = bare_file();
        let options = ProcessorOptions {
            urls: Some(vec![
                "https://example.com/download".to_string(),
                "https://example.com/files/photo.png?size=large".to_string(),
            ]),
            ..ProcessorOptions::default()
        };

        let result = run(ExtractorKind::FilenameFromUrl, &mut file, &options).unwrap();

        assert!(result);
        assert_eq!(file.filename.as_deref(), Some("photo"));
        assert_eq!(file.extension.as_deref(), Some("png"));
        assert_eq!(file.relative_path.as_deref(), Some("files"));
    }

    #[test]
    fn test_filename_from_url_falls_back_to_last_segment() {
        let mut file = bare_file();
        let options = ProcessorOptions {
            urls: Some(vec![
                "https://example.com/download/archive.weird".to_string(),
            ]),
            ..ProcessorOptions::default()
        };

        run(ExtractorKind::FilenameFromUrl, &mut file, &options).unwrap();

        assert_eq!(file.filename.as_deref(), Some("archive"));
        assert_eq!(file.extension.as_deref(), Some("weird"));
        assert_eq!(file.relative_path.as_deref(), Some("download"));
    }

    #[test]
    fn test_filename_from_url_fallback_can_be_disabled() {
        let mut file = bare_file();
        let options = ProcessorOptions {
            urls: Some(vec![
                "https://example.com/download/archive.weird".to_string(),
            ]),
            url_fallback: Some(false),
            ..ProcessorOptions::default()
        };

        run(ExtractorKind::FilenameFromUrl, &mut file, &options).unwrap();

        assert_eq!(file.filename, None);
        assert_eq!(file.relative_path, None);
    }

    #[test]
    fn test_path_from_url_takes_last_filename_bearing_candidate() {
        let mut file = bare_file();
        let options = ProcessorOptions {
            urls: Some(vec![
                "https://example.com/docs/file.txt".to_string(),
                "https://example.com/a/b/".to_string(),
            ]),
            ..ProcessorOptions::default()
        };

        run(ExtractorKind::PathFromUrl, &mut file, &options).unwrap();

        // 反向遍历:第一个带文件名的候选是 docs/file.txt。
        assert_eq!(file.relative_path.as_deref(), Some("docs"));
        assert_eq!(file.filename.as_deref(), Some("file"));
        assert_eq!(file.extension.as_deref(), Some("txt"));
    }

    #[test]
    fn test_path_from_url_without_filenames_keeps_whole_path() {
        let mut file = bare_file();
        let options = ProcessorOptions {
            urls: Some(vec!["https://example.com/a/b/c".to_string()]),
            ..ProcessorOptions::default()
        };

        run(ExtractorKind::PathFromUrl, &mut file, &options).unwrap();

        assert_eq!(file.relative_path.as_deref(), Some("a/b/c"));
        assert_eq!(file.filename, None);
    }

    #[test]
    fn test_checksum_manifest_loads_sidecar_digest() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("report.txt");
        std::fs::write(&target, b"abc").unwrap();
        std::fs::write(
            temp.path().join("report.txt.sha256"),
            b"ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad  report.txt\n",
        )
        .unwrap();

        let mut file = bare_file();
        file.path = Some(target.to_string_lossy().to_string());
        file.filename = Some("report".to_string());
        file.extension = Some("txt".to_string());

        let result = run(
            ExtractorKind::ChecksumManifest,
            &mut file,
            &ProcessorOptions::default(),
        )
        .unwrap();

        assert!(result);
        assert_eq!(
            file.hashes.digest_of("sha256"),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        // 没有 crc32 清单,该算法保持未填充。
        assert_eq!(file.hashes.digest_of("crc32"), None);
    }

    #[test]
    fn test_quoted_value() {
        assert_eq!(
            quoted_value("filename=\"report.pdf\"").as_deref(),
            Some("report.pdf")
        );
        assert_eq!(quoted_value("filename=report.pdf"), None);
        assert_eq!(quoted_value("\"unterminated"), None);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());
        assert_eq!(header(&headers, "Content-Type"), Some("text/plain"));
        assert_eq!(header(&headers, "Expires"), None);
    }

    #[test]
    fn test_url_candidate_skips_unparseable_urls() {
        assert!(url_candidate("not a url").is_none());
        assert!(url_candidate("https://example.com/").is_none());
        let candidate = url_candidate("https://example.com/a/b.txt").unwrap();
        assert_eq!(candidate.directory, "a");
        assert_eq!(candidate.filename, "b.txt");
    }
}
