//! Extension and mimetype resolution.
//!
//! The core never asks the operating system about mimetypes. Everything
//! goes through the [`MimeTyper`] trait so tests and embedders can swap
//! the table out; [`KnownMimeTyper`] is the built-in implementation
//! backed by an embedded extension table.
//!
//! // 扩展名与 mimetype 的解析都走 MimeTyper 接口,内置实现使用内嵌表。

use std::sync::Arc;

/// Extension to mimetype pairs known to the built-in typer.
///
/// Kept sorted by extension for readability only; lookups scan linearly.
const KNOWN_TYPES: &[(&str, &str)] = &[
    ("7z", "application/x-7z-compressed"),
    ("aac", "audio/aac"),
    ("avi", "video/x-msvideo"),
    ("avif", "image/avif"),
    ("bin", "application/octet-stream"),
    ("bmp", "image/bmp"),
    ("bz2", "application/x-bzip2"),
    ("cbr", "application/x-cbr"),
    ("cbz", "application/vnd.comicbook+zip"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("data", "application/octet-stream"),
    ("deb", "application/x-debian-package"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("epub", "application/epub+zip"),
    ("flac", "audio/x-flac"),
    ("flv", "video/x-flv"),
    ("gif", "image/gif"),
    ("gz", "application/gzip"),
    ("heic", "image/heic"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("ico", "image/vnd.microsoft.icon"),
    ("ics", "text/calendar"),
    ("jar", "application/java-archive"),
    ("jpe", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "text/javascript"),
    ("json", "application/json"),
    ("log", "text/plain"),
    ("m4a", "audio/mp4"),
    ("md", "text/markdown"),
    ("mid", "audio/midi"),
    ("mkv", "video/x-matroska"),
    ("mov", "video/quicktime"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("mp4v", "video/mp4"),
    ("mpeg", "video/mpeg"),
    ("mpg", "video/mpeg"),
    ("mpg4", "video/mp4"),
    ("odp", "application/vnd.oasis.opendocument.presentation"),
    ("ods", "application/vnd.oasis.opendocument.spreadsheet"),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("oga", "audio/ogg"),
    ("ogg", "audio/ogg"),
    ("ogv", "video/ogg"),
    ("opus", "audio/opus"),
    ("otf", "font/otf"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("psd", "image/vnd.adobe.photoshop"),
    ("rar", "application/x-rar-compressed"),
    ("raw", "image/raw"),
    ("rtf", "application/rtf"),
    ("sh", "application/x-sh"),
    ("svg", "image/svg+xml"),
    ("tar", "application/x-tar"),
    ("tgz", "application/gzip"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("toml", "application/toml"),
    ("ts", "video/mp2t"),
    ("ttf", "font/ttf"),
    ("txt", "text/plain"),
    ("wav", "audio/x-wav"),
    ("weba", "audio/webm"),
    ("webm", "video/webm"),
    ("webp", "image/webp"),
    ("wma", "audio/x-ms-wma"),
    ("wmv", "video/x-ms-wmv"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("xhtml", "application/xhtml+xml"),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("xml", "application/xml"),
    ("xz", "application/x-xz"),
    ("yaml", "application/yaml"),
    ("yml", "application/yaml"),
    ("zip", "application/zip"),
];

/// Extensions whose encodings are lossless.
const LOSSLESS_EXTENSIONS: &[&str] = &[
    "avif", "bmp", "bz2", "data", "flac", "m4a", "png", "raw", "tif", "tiff", "wav",
];

/// Mimetypes whose encodings are lossless.
const LOSSLESS_MIMETYPES: &[&str] = &[
    "audio/mp4",
    "audio/x-flac",
    "audio/x-wav",
    "image/raw",
    "video/raw",
];

/// Extensions of compression containers.
const COMPRESSED_EXTENSIONS: &[&str] = &[
    "7z", "bz2", "cbr", "cbz", "deb", "epub", "gz", "jar", "rar", "tar", "tgz", "xz", "zip",
];

/// Mimetypes of compression containers.
const COMPRESSED_MIMETYPES: &[&str] = &[
    "application/epub+zip",
    "application/gzip",
    "application/java-archive",
    "application/vnd.comicbook+zip",
    "application/x-7z-compressed",
    "application/x-bzip2",
    "application/x-cbr",
    "application/x-debian-package",
    "application/x-rar-compressed",
    "application/x-tar",
    "application/x-xz",
    "application/zip",
];

/// Extensions of containers the package extractors can open.
const PACKED_EXTENSIONS: &[&str] = &["cbz", "epub", "gz", "jar", "tar", "tgz", "zip"];

/// First component of a mimetype that maps to a semantic type.
const KNOWN_TYPE_PREFIXES: &[&str] = &[
    "application",
    "audio",
    "binary",
    "chemical",
    "font",
    "image",
    "message",
    "model",
    "multipart",
    "text",
    "video",
];

/// Capability interface for extension and mimetype resolution.
pub trait MimeTyper {
    /// Stable identifier used by the serialization registry.
    fn registry_id(&self) -> &'static str;

    /// All registered extensions for the given mimetype.
    fn get_extensions(&self, mime_type: &str) -> Vec<String>;

    /// Registered mimetype for the given extension, if any.
    fn get_mimetype(&self, extension: &str) -> Option<String>;

    /// Semantic type (`image`, `video`, ...) for a mimetype or extension.
    fn get_type(&self, mime_type: Option<&str>, extension: Option<&str>) -> Option<String>;

    /// Best extension for a mimetype when several are registered.
    fn guess_extension_from_mimetype(&self, mime_type: &str) -> Option<String>;

    /// Extension taken from a filename, only when it is registered.
    fn guess_extension_from_filename(&self, filename: &str) -> Option<String>;

    fn is_extension_registered(&self, extension: &str) -> bool;

    fn is_extension_lossless(&self, extension: &str) -> bool;

    fn is_mimetype_lossless(&self, mime_type: &str) -> bool;

    fn is_extension_compressed(&self, extension: &str) -> bool;

    fn is_mimetype_compressed(&self, mime_type: &str) -> bool;

    /// Whether the extension names a container the package extractors
    /// know how to open.
    fn is_extension_packed(&self, extension: &str) -> bool;
}

/// Lowercases an extension before any lookup.
pub fn sanitize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}

/// Built-in [`MimeTyper`] backed by the embedded table.
#[derive(Debug, Default, Clone, Copy)]
pub struct KnownMimeTyper;

impl KnownMimeTyper {
    pub fn new_arc() -> Arc<dyn MimeTyper> {
        Arc::new(KnownMimeTyper)
    }

    /// Splits of multipart archives name their parts `r00`/`z01`; those
    /// resolve to the container format itself.
    fn resolve_split_part(extension: &str) -> Option<&'static str> {
        let mut chars = extension.chars();
        let head = chars.next()?;
        let rest = chars.as_str();
        if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        match head.to_ascii_lowercase() {
            'r' => Some("rar"),
            'z' => Some("zip"),
            _ => None,
        }
    }
}

impl MimeTyper for KnownMimeTyper {
    fn registry_id(&self) -> &'static str {
        "known-mimetyper"
    }

    fn get_extensions(&self, mime_type: &str) -> Vec<String> {
        KNOWN_TYPES
            .iter()
            .filter(|(_, mime)| *mime == mime_type)
            .map(|(ext, _)| (*ext).to_string())
            .collect()
    }

    fn get_mimetype(&self, extension: &str) -> Option<String> {
        let mut extension = sanitize_extension(extension);
        if let Some(container) = Self::resolve_split_part(&extension) {
            extension = container.to_string();
        }
        KNOWN_TYPES
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, mime)| (*mime).to_string())
    }

    fn get_type(&self, mime_type: Option<&str>, extension: Option<&str>) -> Option<String> {
        let mime_type = match mime_type {
            Some(value) => Some(value.to_string()),
            None => self.get_mimetype(extension?),
        }?;
        let prefix = mime_type.split('/').next()?;
        if KNOWN_TYPE_PREFIXES.contains(&prefix) {
            Some(prefix.to_string())
        } else {
            None
        }
    }

    fn guess_extension_from_mimetype(&self, mime_type: &str) -> Option<String> {
        let extensions = self.get_extensions(mime_type);
        if extensions.is_empty() {
            return None;
        }
        // jpe 在表中排在 jpg 前面,mp4v 同理,这里偏向常见写法。
        if extensions.iter().any(|ext| ext == "jpg") {
            return Some("jpg".to_string());
        }
        if extensions.iter().any(|ext| ext == "mp4") {
            return Some("mp4".to_string());
        }
        extensions.into_iter().next()
    }

    fn guess_extension_from_filename(&self, filename: &str) -> Option<String> {
        let (_, maybe_extension) = filename.rsplit_once('.')?;
        if maybe_extension.is_empty() {
            return None;
        }
        if self.is_extension_registered(maybe_extension) {
            Some(sanitize_extension(maybe_extension))
        } else {
            None
        }
    }

    fn is_extension_registered(&self, extension: &str) -> bool {
        self.get_mimetype(extension).is_some()
    }

    fn is_extension_lossless(&self, extension: &str) -> bool {
        LOSSLESS_EXTENSIONS.contains(&sanitize_extension(extension).as_str())
    }

    fn is_mimetype_lossless(&self, mime_type: &str) -> bool {
        LOSSLESS_MIMETYPES.contains(&mime_type)
    }

    fn is_extension_compressed(&self, extension: &str) -> bool {
        COMPRESSED_EXTENSIONS.contains(&sanitize_extension(extension).as_str())
    }

    fn is_mimetype_compressed(&self, mime_type: &str) -> bool {
        COMPRESSED_MIMETYPES.contains(&mime_type)
    }

    fn is_extension_packed(&self, extension: &str) -> bool {
        PACKED_EXTENSIONS.contains(&sanitize_extension(extension).as_str())
    }
}
