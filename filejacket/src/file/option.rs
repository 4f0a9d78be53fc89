use serde::{Deserialize, Serialize};

/// Permission flags checked by [`super::File::save`] before anything
/// is written.
///
/// Each flag widens one operation: creating over an existing path,
/// updating changed content, renaming onto an occupied name, changing
/// the saved extension, or backing the old content up first. A save
/// that needs a permission the caller did not grant fails before any
/// mutation.
///
/// // 保存许可矩阵:每个开关放行一种操作,缺少许可的保存在写入前即失败。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOptions {
    /// Replace an existing file at the target path.
    pub overwrite: bool,
    /// Also persist the sidecar hash files.
    pub save_hashes: bool,
    /// Let hashers search sidecar manifests instead of always
    /// digesting content.
    pub allow_search_hashes: bool,
    /// Write changed content over the saved copy.
    pub allow_update: bool,
    /// On a rename collision, derive a fresh name instead of failing.
    pub allow_rename: bool,
    /// Permit the extension to differ from the one saved before.
    pub allow_extension_change: bool,
    /// Copy the saved content aside before updating it.
    pub create_backup: bool,
}

impl SaveOptions {
    pub fn new() -> SaveOptions {
        SaveOptions::default()
    }
}

impl Default for SaveOptions {
    fn default() -> SaveOptions {
        SaveOptions {
            overwrite: false,
            save_hashes: false,
            allow_search_hashes: true,
            allow_update: true,
            allow_rename: false,
            allow_extension_change: true,
            create_backup: false,
        }
    }
}
