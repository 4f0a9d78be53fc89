use serde::{Deserialize, Serialize};

/// Lifecycle flags of a file.
///
/// A fresh file starts out `adding` and `processing`; `adding` drops
/// after the first successful save, `processing` after the extraction
/// pipeline ran. The other flags mark mutations pending since that
/// first save.
///
/// // 生命周期状态:新建文件处于 adding/processing,首次保存与抽取完成后分别清除。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState {
    /// Never persisted yet.
    pub adding: bool,
    /// A name change happened after the first save.
    pub renaming: bool,
    /// The content changed after the first save.
    pub changing: bool,
    /// The file is being moved to another directory.
    pub moving: bool,
    /// The extraction pipeline did not run to completion yet.
    pub processing: bool,
}

impl FileState {
    pub fn new() -> FileState {
        FileState::default()
    }
}

impl Default for FileState {
    fn default() -> FileState {
        FileState {
            adding: true,
            renaming: false,
            changing: false,
            moving: false,
            processing: true,
        }
    }
}
