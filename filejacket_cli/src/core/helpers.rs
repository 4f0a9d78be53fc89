//! Core business logic helpers, independent of UI.

use std::path::Path;
use std::sync::Arc;

use filejacket::storage::LocalStorage;
use filejacket::{File, KnownMimeTyper, MimeTyper, Storage};
use log::debug;

use crate::errors::CliError;

/// 本地后端:文件系统存储加已知扩展名的 mimetype 表
pub fn backends() -> (Arc<dyn Storage>, Arc<dyn MimeTyper>) {
    (Arc::new(LocalStorage::new()), KnownMimeTyper::new_arc())
}

/// Builds a file object from a disk path, refusing paths that do not
/// point at an existing regular file.
//
// // 从磁盘路径构建文件对象;不存在或不是普通文件的路径直接拒绝。
pub fn load_file(path: &Path) -> Result<File, CliError> {
    if !path.is_file() {
        return Err(CliError::NotAFile(path.to_path_buf()));
    }
    debug!("building file object from {}", path.display());
    let (storage, mimetyper) = backends();
    Ok(File::from_disk(&path.to_string_lossy(), storage, mimetyper))
}
