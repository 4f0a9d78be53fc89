//! Digest table of a file object.
//!
//! Every digest is stored together with a sidecar file object: either the
//! manifest it was loaded from, or the manifest that will be written when
//! the host file is saved. Renaming the host renames the sidecars and
//! rewrites their manifest text in step.
//!
//! // 摘要表:每个摘要都挂一个旁车文件,要么是它的来源清单,
//! // 要么是宿主保存时将要写出的清单;宿主改名时旁车同步改名改内容。

use std::collections::BTreeMap;

use crate::content::source::ContentSource;
use crate::content::ContentError;
use crate::file::option::SaveOptions;
use crate::file::{File, FileError};

/// One digest and the sidecar file object backing it.
#[derive(Debug)]
pub struct HashRecord {
    pub digest: String,
    pub sidecar: Box<File>,
}

/// Digests of a file keyed by algorithm name.
#[derive(Debug, Default)]
pub struct FileHashes {
    records: BTreeMap<String, HashRecord>,
}

impl FileHashes {
    pub fn new() -> FileHashes {
        FileHashes::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, digest: String, sidecar: File) {
        self.records.insert(
            name.into(),
            HashRecord {
                digest,
                sidecar: Box::new(sidecar),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&HashRecord> {
        self.records.get(name)
    }

    pub fn digest_of(&self, name: &str) -> Option<&str> {
        self.records.get(name).map(|record| record.digest.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HashRecord)> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut HashRecord)> {
        self.records.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Follows a rename of the host file.
    ///
    /// Sidecars that are not shared `CHECKSUM` manifests take the name
    /// `<new complete filename>.<hasher>`, and every manifest text gets the
    /// old complete filename replaced by the new one. Nothing is written
    /// here; the sidecars are only marked pending save.
    ///
    /// // 宿主改名的跟随动作:非 CHECKSUM 旁车换名,清单文本里旧全名
    /// // 替换为新全名,只改内存状态不落盘。
    pub fn rename(
        &mut self,
        old_complete_filename: &str,
        new_complete_filename: &str,
    ) -> Result<(), ContentError> {
        for (hasher_name, record) in self.records.iter_mut() {
            let sidecar = record.sidecar.as_mut();

            // 1. 独占旁车跟着宿主改名,共享的 CHECKSUM 清单保持原名。
            if !sidecar.meta.checksum {
                sidecar.set_complete_filename(
                    new_complete_filename.to_string(),
                    Some(hasher_name.clone()),
                );
            }

            // 2. 清单文本中替换宿主的旧全名。
            let Some(content) = sidecar.content.as_mut() else {
                continue;
            };
            content.reset()?;
            let mut data: Vec<u8> = Vec::new();
            while let Some(block) = content.next_block()? {
                data.extend_from_slice(&block);
            }
            let text = String::from_utf8(data)?;
            let text = text.replace(old_complete_filename, new_complete_filename);

            sidecar.set_content(ContentSource::Text(text));
            sidecar.actions.to_save();
        }
        Ok(())
    }

    /// Saves every sidecar still marked pending.
    ///
    /// Shared `CHECKSUM` manifests are never overwritten wholesale, they
    /// only accept updates; exclusive sidecars follow `overwrite` directly.
    ///
    /// // 保存所有待保存的旁车;CHECKSUM 清单永不整体覆盖,只接受更新。
    pub fn save(&mut self, overwrite: bool) -> Result<(), FileError> {
        for record in self.records.values_mut() {
            let sidecar = record.sidecar.as_mut();
            if !sidecar.actions.save {
                continue;
            }

            let options = if sidecar.meta.checksum {
                SaveOptions {
                    overwrite: false,
                    allow_update: overwrite,
                    ..SaveOptions::default()
                }
            } else {
                SaveOptions {
                    overwrite,
                    allow_update: overwrite,
                    ..SaveOptions::default()
                }
            };
            sidecar.save(&options)?;
        }
        Ok(())
    }
}
