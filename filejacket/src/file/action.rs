use serde::{Deserialize, Serialize};

/// Paired pending/done flags for every operation a file can undergo.
///
/// Requesting an operation (`to_x`) raises the pending flag and clears
/// its done counterpart; completing it (`xed`) does the reverse. The
/// two flags of a pair are never both true at the same time.
///
/// // 动作台账:to_x 置待办并清除已完成标记,完成方法反之,同一对标记不会同时为真。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileActions {
    /// Content must still be written to storage.
    pub save: bool,
    pub was_saved: bool,
    /// Packed content must still be decompressed to a destination.
    pub extract: bool,
    pub was_extracted: bool,
    /// A pending name change must still reach storage.
    pub rename: bool,
    pub was_renamed: bool,
    /// The file must still be moved to another directory.
    pub move_file: bool,
    pub was_moved: bool,
    /// Digests must still be generated or loaded.
    pub hash: bool,
    pub was_hashed: bool,
    /// Packed entries must still be listed into the packet.
    pub list: bool,
    pub was_listed: bool,
    /// A preview representation must still be rendered.
    pub preview: bool,
    pub was_previewed: bool,
    /// A thumbnail representation must still be rendered.
    pub thumbnail: bool,
    pub was_thumbnailed: bool,
}

impl FileActions {
    pub fn new() -> FileActions {
        FileActions::default()
    }

    pub fn to_save(&mut self) {
        self.save = true;
        self.was_saved = false;
    }

    pub fn saved(&mut self) {
        self.save = false;
        self.was_saved = true;
    }

    pub fn to_extract(&mut self) {
        self.extract = true;
        self.was_extracted = false;
    }

    pub fn extracted(&mut self) {
        self.extract = false;
        self.was_extracted = true;
    }

    pub fn to_rename(&mut self) {
        self.rename = true;
        self.was_renamed = false;
    }

    pub fn renamed(&mut self) {
        self.rename = false;
        self.was_renamed = true;
    }

    pub fn to_move(&mut self) {
        self.move_file = true;
        self.was_moved = false;
    }

    pub fn moved(&mut self) {
        self.move_file = false;
        self.was_moved = true;
    }

    pub fn to_hash(&mut self) {
        self.hash = true;
        self.was_hashed = false;
    }

    pub fn hashed(&mut self) {
        self.hash = false;
        self.was_hashed = true;
    }

    pub fn to_list(&mut self) {
        self.list = true;
        self.was_listed = false;
    }

    pub fn listed(&mut self) {
        self.list = false;
        self.was_listed = true;
    }

    pub fn to_preview(&mut self) {
        self.preview = true;
        self.was_previewed = false;
    }

    pub fn previewed(&mut self) {
        self.preview = false;
        self.was_previewed = true;
    }

    pub fn to_thumbnail(&mut self) {
        self.thumbnail = true;
        self.was_thumbnailed = false;
    }

    pub fn thumbnailed(&mut self) {
        self.thumbnail = false;
        self.was_thumbnailed = true;
    }
}
