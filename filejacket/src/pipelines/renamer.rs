//! Renamer processors that search for a conflict-free filename.
//!
//! All renamers share one loop: strip the enumeration their own style
//! produces from the current name, then append a fresh enumeration until the
//! candidate hits neither the physical directory nor the reservation ledger.
//! The ledger lives in a [`RenameSession`] passed in by the caller, so files
//! processed in the same batch stay out of each other's way before anything
//! reaches the storage.
//!
//! // 重命名器:先剥掉旧编号,再循环追加新编号,直到物理目录和保留账本都放行。
//! // 保留账本放在会话对象里,由调用方显式传入,同批文件不会互相撞名。

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::common::constants::UNIQUE_RENAME_ATTEMPTS;
use crate::errors::ConfigurationError;
use crate::file::File;
use crate::pipeline::{PathTarget, PipelineContext, ProcessorError, ProcessorOptions};
use crate::storage::Storage;

/// Failure raised while searching for a conflict-free name.
///
/// // 重命名失败:尝试次数耗尽,或目标名字已被同会话的其他文件占用。
#[derive(Debug, Error)]
pub enum RenameError {
    #[error("No unique name was found after {attempts} attempts, too many names in flight")]
    ExhaustedAttempts { attempts: u32 },

    #[error("The name '{complete_filename}' in '{directory}' is reserved by another file")]
    Reserved {
        complete_filename: String,
        directory: String,
    },
}

/// Reservation ledger shared between files renaming into the same
/// directories.
///
/// Each claim maps a complete filename inside a directory to the token of
/// the file object holding it. A name claimed by one file counts as taken
/// for every other file in the session, even before it exists on disk.
///
/// // 重命名会话:按目录登记 完整文件名 -> 持有者令牌,落盘前就能挡住撞名。
#[derive(Debug, Default)]
pub struct RenameSession {
    reserved: HashMap<String, HashMap<String, u64>>,
}

impl RenameSession {
    pub fn new() -> RenameSession {
        RenameSession::default()
    }

    /// Claims `complete_filename` inside `directory` for `owner`,
    /// displacing any earlier claim on the same name.
    pub fn reserve(&mut self, directory: &str, complete_filename: &str, owner: u64) {
        self.reserved
            .entry(directory.to_string())
            .or_default()
            .insert(complete_filename.to_string(), owner);
    }

    /// Token of the file currently holding `complete_filename`, if any.
    pub fn owner_of(&self, directory: &str, complete_filename: &str) -> Option<u64> {
        self.reserved
            .get(directory)?
            .get(complete_filename)
            .copied()
    }

    pub fn is_reserved(&self, directory: &str, complete_filename: &str) -> bool {
        self.owner_of(directory, complete_filename).is_some()
    }

    /// Drops the claim on `complete_filename`, but only when `owner` still
    /// holds it.
    pub fn release(&mut self, directory: &str, complete_filename: &str, owner: u64) {
        if let Some(names) = self.reserved.get_mut(directory) {
            if names.get(complete_filename).copied() == Some(owner) {
                names.remove(complete_filename);
            }
        }
    }

    /// Every name currently claimed inside `directory`.
    pub fn names_in(&self, directory: &str) -> Vec<String> {
        self.reserved
            .get(directory)
            .map(|names| names.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Names claimed inside `directory` by files other than `owner`. A file
    /// is always free to keep the name it already holds.
    pub fn names_reserved_by_others(&self, directory: &str, owner: u64) -> Vec<String> {
        self.reserved
            .get(directory)
            .map(|names| {
                names
                    .iter()
                    .filter(|(_, holder)| **holder != owner)
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Splits a known extension off `filename` so enumeration lands on the stem.
///
/// // 把已知扩展名从文件名上剥离,编号只追加在主干上。
pub fn prepare_filename(filename: &str, extension: Option<&str>) -> (String, Option<String>) {
    match extension {
        Some(ext) if !ext.is_empty() => {
            let suffix = format!(".{ext}");
            let stem = filename.strip_suffix(&suffix).unwrap_or(filename);
            (stem.to_string(), Some(ext.to_string()))
        }
        Some(ext) => (filename.to_string(), Some(ext.to_string())),
        None => (filename.to_string(), None),
    }
}

/// Removes a trailing ` (n)` or `[n]` enumeration from `name`.
fn strip_windows_enumeration(name: &str) -> &str {
    if let Some(body) = name.strip_suffix(')') {
        if let Some(open) = body.rfind('(') {
            let digits = &body[open + 1..];
            if !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit()) {
                let head = &name[..open];
                // 编号前至多剥一个空格。
                return head.strip_suffix(' ').unwrap_or(head);
            }
        }
    }
    if let Some(body) = name.strip_suffix(']') {
        if let Some(open) = body.rfind('[') {
            let digits = &body[open + 1..];
            if !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit()) {
                return &name[..open];
            }
        }
    }
    name
}

/// Removes a trailing ` - n` enumeration from `name`.
fn strip_linux_enumeration(name: &str) -> &str {
    let bytes = name.as_bytes();
    let mut cut = bytes.len();

    let digits_end = cut;
    while cut > 0 && bytes[cut - 1].is_ascii_digit() {
        cut -= 1;
    }
    if cut == digits_end {
        return name;
    }

    // 数字和连字符之间至少要有一个空格。
    let spaces_end = cut;
    while cut > 0 && bytes[cut - 1] == b' ' {
        cut -= 1;
    }
    if cut == spaces_end || cut == 0 || bytes[cut - 1] != b'-' {
        return name;
    }
    cut -= 1;

    while cut > 0 && bytes[cut - 1] == b' ' {
        cut -= 1;
    }
    &name[..cut]
}

fn format_extension(extension: Option<&str>) -> String {
    match extension {
        Some(ext) if !ext.is_empty() => format!(".{ext}"),
        _ => String::new(),
    }
}

fn is_taken(storage: &dyn Storage, directory: &str, complete: &str, reserved: &[String]) -> bool {
    storage.exists(&storage.join(directory, complete))
        || reserved.iter().any(|name| name == complete)
}

/// Draws random candidates until `taken` clears one, giving up after the
/// attempt cap.
///
/// // 随机名逐个试,额度用完仍全被占就放弃。
fn find_unique_name(
    formatted_extension: &str,
    mut taken: impl FnMut(&str) -> bool,
) -> Result<String, RenameError> {
    for _ in 0..UNIQUE_RENAME_ATTEMPTS {
        let candidate = Uuid::new_v4().to_string();
        if !taken(&format!("{candidate}{formatted_extension}")) {
            return Ok(candidate);
        }
    }
    Err(RenameError::ExhaustedAttempts {
        attempts: UNIQUE_RENAME_ATTEMPTS,
    })
}

/// Naming style used to resolve a filename conflict.
///
/// The windows and linux styles enumerate the stem until it is free. The
/// unique style discards the stem entirely and draws random names, giving up
/// after a fixed number of attempts.
///
/// // 三种风格:Windows 追加 " (n)",Linux 追加 " - n",Unique 直接换成随机名。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenamerKind {
    Windows,
    Linux,
    Unique,
}

impl RenamerKind {
    pub fn registry_id(&self) -> &'static str {
        match self {
            RenamerKind::Windows => "windows-renamer",
            RenamerKind::Linux => "linux-renamer",
            RenamerKind::Unique => "unique-renamer",
        }
    }

    pub fn from_registry_id(id: &str) -> Option<RenamerKind> {
        match id {
            "windows-renamer" => Some(RenamerKind::Windows),
            "linux-renamer" => Some(RenamerKind::Linux),
            "unique-renamer" => Some(RenamerKind::Unique),
            _ => None,
        }
    }

    /// Finds a name for `filename` that neither exists under `directory` nor
    /// appears in `reserved`. The extension passes through unchanged.
    ///
    /// // 逐个候选名检查物理目录和保留列表,返回第一个双方都放行的名字。
    pub fn get_name(
        &self,
        storage: &dyn Storage,
        directory: &str,
        filename: &str,
        extension: Option<&str>,
        reserved: &[String],
    ) -> Result<(String, Option<String>), RenameError> {
        let formatted = format_extension(extension);
        let extension = extension.map(str::to_string);

        match self {
            RenamerKind::Windows | RenamerKind::Linux => {
                let base = match self {
                    RenamerKind::Windows => strip_windows_enumeration(filename),
                    _ => strip_linux_enumeration(filename),
                }
                .to_string();

                let mut candidate = base.clone();
                let mut index = 0u32;
                while is_taken(storage, directory, &format!("{candidate}{formatted}"), reserved) {
                    index += 1;
                    candidate = match self {
                        RenamerKind::Windows => format!("{base} ({index})"),
                        _ => format!("{base} - {index}"),
                    };
                }
                Ok((candidate, extension))
            }
            RenamerKind::Unique => {
                let candidate = find_unique_name(&formatted, |complete| {
                    is_taken(storage, directory, complete, reserved)
                })?;
                Ok((candidate, extension))
            }
        }
    }

    /// Pipeline entry point. Resolves the working directory from
    /// `path_target`, collects reserved names from the call options or the
    /// session and writes the conflict-free name back onto the file.
    pub(crate) fn process(
        &self,
        file: &mut File,
        options: &ProcessorOptions,
        ctx: &mut PipelineContext<'_>,
    ) -> Result<bool, ProcessorError> {
        let storage = file.storage_arc();

        // 1. 按 path_target 解析工作目录。
        let directory = match options.path_target.unwrap_or_default() {
            PathTarget::Path => {
                let path = file
                    .path
                    .as_deref()
                    .ok_or(ConfigurationError::MissingPath)?;
                storage.get_directory_from_path(path)
            }
            PathTarget::SaveTo => {
                let save_to = file
                    .save_to
                    .as_deref()
                    .ok_or(ConfigurationError::MissingSaveTo)?;
                storage.sanitize_path(save_to)
            }
        };

        // 2. 取出当前名字,剥离扩展名,编号只落在主干上。
        let raw_filename = file
            .filename
            .clone()
            .ok_or(ConfigurationError::MissingFilename)?;
        let (filename, extension) = prepare_filename(&raw_filename, file.extension.as_deref());

        // 3. 保留名来源:调用方覆盖优先,否则读会话账本。
        let reserved = match &options.reserved_names {
            Some(names) => names.clone(),
            None => ctx
                .rename_session
                .as_ref()
                .map(|session| session.names_reserved_by_others(&directory, file.token()))
                .unwrap_or_default(),
        };

        let (new_filename, new_extension) = self.get_name(
            storage.as_ref(),
            &directory,
            &filename,
            extension.as_deref(),
            &reserved,
        )?;

        // 4. 新名字写回文件对象,历史由文件对象自己归档。
        file.set_complete_filename(new_filename, new_extension);

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;

    #[test]
    fn test_prepare_filename_strips_known_extension() {
        assert_eq!(
            prepare_filename("report.txt", Some("txt")),
            ("report".to_string(), Some("txt".to_string()))
        );
        assert_eq!(
            prepare_filename("report", Some("txt")),
            ("report".to_string(), Some("txt".to_string()))
        );
        assert_eq!(prepare_filename("report", None), ("report".to_string(), None));
        assert_eq!(
            prepare_filename("report", Some("")),
            ("report".to_string(), Some(String::new()))
        );
    }

    #[test]
    fn test_strip_windows_enumeration() {
        assert_eq!(strip_windows_enumeration("report (3)"), "report");
        assert_eq!(strip_windows_enumeration("report(12)"), "report");
        assert_eq!(strip_windows_enumeration("report[7]"), "report");
        assert_eq!(strip_windows_enumeration("report"), "report");
        assert_eq!(strip_windows_enumeration("report ()"), "report ()");
        assert_eq!(strip_windows_enumeration("report (a)"), "report (a)");
    }

    #[test]
    fn test_strip_linux_enumeration() {
        assert_eq!(strip_linux_enumeration("report - 2"), "report");
        assert_eq!(strip_linux_enumeration("report- 15"), "report");
        assert_eq!(strip_linux_enumeration("report - x"), "report - x");
        assert_eq!(strip_linux_enumeration("report-2"), "report-2");
        assert_eq!(strip_linux_enumeration("report"), "report");
    }

    #[test]
    fn test_windows_get_name_enumerates_until_free() {
        let temp = tempfile::tempdir().unwrap();
        let directory = temp.path().to_string_lossy().to_string();
        std::fs::write(temp.path().join("report.txt"), b"a").unwrap();
        std::fs::write(temp.path().join("report (1).txt"), b"b").unwrap();

        let storage = LocalStorage::new();
        let (name, extension) = RenamerKind::Windows
            .get_name(&storage, &directory, "report", Some("txt"), &[])
            .unwrap();

        assert_eq!(name, "report (2)");
        assert_eq!(extension.as_deref(), Some("txt"));
    }

    #[test]
    fn test_linux_get_name_restarts_existing_enumeration() {
        let temp = tempfile::tempdir().unwrap();
        let directory = temp.path().to_string_lossy().to_string();
        std::fs::write(temp.path().join("report.txt"), b"a").unwrap();

        let storage = LocalStorage::new();
        let (name, _) = RenamerKind::Linux
            .get_name(&storage, &directory, "report - 9", Some("txt"), &[])
            .unwrap();

        // 旧编号被剥掉,重新从 1 开始。
        assert_eq!(name, "report - 1");
    }

    #[test]
    fn test_get_name_honors_reserved_list() {
        let temp = tempfile::tempdir().unwrap();
        let directory = temp.path().to_string_lossy().to_string();

        let storage = LocalStorage::new();
        let reserved = vec!["report.txt".to_string(), "report (1).txt".to_string()];
        let (name, _) = RenamerKind::Windows
            .get_name(&storage, &directory, "report", Some("txt"), &reserved)
            .unwrap();

        assert_eq!(name, "report (2)");
    }

    /// 测试:一百个随机候选全部被占时放弃并计数。
    #[test]
    fn test_unique_name_gives_up_at_the_attempt_cap() {
        let mut probes = 0u32;
        let exhausted = find_unique_name(".txt", |complete| {
            assert!(complete.ends_with(".txt"));
            probes += 1;
            true
        });

        assert!(matches!(
            exhausted,
            Err(RenameError::ExhaustedAttempts { attempts: 100 })
        ));
        assert_eq!(probes, 100);

        // 第一个空闲候选立即中断搜索。
        let found = find_unique_name("", |_| false).unwrap();
        assert!(Uuid::parse_str(&found).is_ok());
    }

    #[test]
    fn test_unique_get_name_returns_uuid_shaped_name() {
        let temp = tempfile::tempdir().unwrap();
        let directory = temp.path().to_string_lossy().to_string();

        let storage = LocalStorage::new();
        let (name, extension) = RenamerKind::Unique
            .get_name(&storage, &directory, "report", Some("txt"), &[])
            .unwrap();

        assert_eq!(name.len(), 36);
        assert!(Uuid::parse_str(&name).is_ok());
        assert_eq!(extension.as_deref(), Some("txt"));
    }

    #[test]
    fn test_session_reservations_are_per_owner() {
        let mut session = RenameSession::new();
        session.reserve("/srv/files", "report.txt", 1);
        session.reserve("/srv/files", "notes.txt", 2);

        assert_eq!(session.owner_of("/srv/files", "report.txt"), Some(1));
        assert!(session.is_reserved("/srv/files", "notes.txt"));
        assert!(!session.is_reserved("/other", "report.txt"));

        let mut others = session.names_reserved_by_others("/srv/files", 1);
        others.sort();
        assert_eq!(others, vec!["notes.txt".to_string()]);

        // 只有持有者本人能释放。
        session.release("/srv/files", "report.txt", 2);
        assert!(session.is_reserved("/srv/files", "report.txt"));
        session.release("/srv/files", "report.txt", 1);
        assert!(!session.is_reserved("/srv/files", "report.txt"));
    }
}
