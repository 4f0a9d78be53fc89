//! Complete-filename split and join rules.
//!
//! A "complete filename" is `filename.extension`; the extension part is
//! everything after the last dot. An empty extension means "known to
//! have none", distinct from an unset one.
//!
//! // 完整文件名按最后一个点拆分;空扩展名表示确定没有,与未知不同。

/// Splits a complete filename at its last dot.
///
/// `report.tar.gz` becomes `("report.tar", Some("gz"))`; a dotless name
/// keeps its extension unset.
pub fn split_complete(complete_filename: &str) -> (String, Option<String>) {
    match complete_filename.rsplit_once('.') {
        Some((filename, extension)) => (filename.to_string(), Some(extension.to_string())),
        None => (complete_filename.to_string(), None),
    }
}

/// Joins a filename and extension back into a complete filename. Unset
/// and empty extensions both yield the bare filename.
pub fn join_complete(filename: &str, extension: Option<&str>) -> String {
    match extension {
        Some(extension) if !extension.is_empty() => format!("{filename}.{extension}"),
        _ => filename.to_string(),
    }
}
