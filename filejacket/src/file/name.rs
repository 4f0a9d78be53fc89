use serde::{Deserialize, Serialize};

/// Naming history of one file.
///
/// Every accepted name change archives the previous filename and
/// extension here, newest last, so old names stay reachable after a
/// chain of renames. The extension persisted by the last save is kept
/// separately for the extension-change permission check.
///
/// // 命名历史:每次改名都把旧名归档,上次保存的扩展名单独记录供许可检查。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileNaming {
    history: Vec<(Option<String>, Option<String>)>,
    /// Extension the file carried when it was last saved.
    pub previous_saved_extension: Option<String>,
}

impl FileNaming {
    pub fn new() -> FileNaming {
        FileNaming::default()
    }

    /// Archives a replaced (filename, extension) pair.
    pub fn record(&mut self, filename: Option<String>, extension: Option<String>) {
        self.history.push((filename, extension));
    }

    pub fn history(&self) -> &[(Option<String>, Option<String>)] {
        &self.history
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Most recently replaced pair, if any rename happened yet.
    pub fn last_replaced(&self) -> Option<&(Option<String>, Option<String>)> {
        self.history.last()
    }
}
