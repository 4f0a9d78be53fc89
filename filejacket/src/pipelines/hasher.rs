//! Hasher processors that produce, load and verify content digests.
//!
//! A hasher walks the content cursor block by block, so digesting never
//! needs the whole payload in memory at once. Digests can also be loaded
//! from sidecar manifest files (`<name>.<hasher>` or `CHECKSUM.<hasher>`)
//! instead of being computed, and every digest carries a sidecar file
//! object describing where it came from or where it will be written.
//!
//! // 散列器:按块遍历内容游标计算摘要,也能从旁车清单文件装载摘要;
//! // 每个摘要都挂一个旁车文件对象,记录它的来源或将要写入的位置。

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::PathBuf;

use sha2::{Digest, Sha256, Sha512};
use thiserror::Error;

use crate::common::constants::CHECKSUM_STEM;
use crate::content::controller::FileContent;
use crate::content::source::ContentSource;
use crate::content::ContentError;
use crate::errors::{AmbiguityError, ConfigurationError};
use crate::file::File;
use crate::pipeline::{PipelineContext, ProcessorError, ProcessorOptions};
use crate::storage::Storage;

/// Failure raised while computing or loading a digest.
#[derive(Debug, Error)]
pub enum HashError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Ambiguity(#[from] AmbiguityError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Manifest cache shared across the files of one batch run.
///
/// Manifest files tend to be consulted once per file in a directory; the
/// session keeps their lines around so a batch of hundred files reads
/// `CHECKSUM.sha256` once instead of a hundred times. The cache lives as
/// long as the session, so callers rewriting a manifest mid-batch should
/// call [`HashSession::invalidate`] for its path.
///
/// // 散列会话:缓存清单文件的行内容,同批文件只读一次清单;
/// // 批处理途中改写了清单要调用 invalidate 使缓存失效。
#[derive(Debug, Default)]
pub struct HashSession {
    lines: HashMap<String, Vec<String>>,
}

impl HashSession {
    pub fn new() -> HashSession {
        HashSession::default()
    }

    /// Lines of the manifest at `path`, read through the cache.
    pub fn read_lines(&mut self, storage: &dyn Storage, path: &str) -> io::Result<Vec<String>> {
        if let Some(cached) = self.lines.get(path) {
            return Ok(cached.clone());
        }
        let lines = storage.read_lines(path)?;
        self.lines.insert(path.to_string(), lines.clone());
        Ok(lines)
    }

    /// Drops the cached lines for `path` after the manifest was rewritten.
    pub fn invalidate(&mut self, path: &str) {
        self.lines.remove(path);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Running digest over one algorithm.
enum Digester {
    Sha256(Sha256),
    Sha512(Sha512),
    Crc32(crc32fast::Hasher),
}

impl Digester {
    fn update(&mut self, data: &[u8]) {
        match self {
            Digester::Sha256(digest) => digest.update(data),
            Digester::Sha512(digest) => digest.update(data),
            Digester::Crc32(hasher) => hasher.update(data),
        }
    }

    fn finalize(self) -> String {
        match self {
            Digester::Sha256(digest) => hex::encode(digest.finalize()),
            Digester::Sha512(digest) => hex::encode(digest.finalize()),
            // CRC-32 历来以十进制数字串示人,保持这个惯例。
            Digester::Crc32(hasher) => hasher.finalize().to_string(),
        }
    }
}

/// Digest algorithm runnable in a hash pipeline.
///
/// The lowercase algorithm name doubles as the key in a file's hash table
/// and as the extension of its manifest files.
///
/// // 散列算法:小写算法名同时用作散列表的键和清单文件的扩展名。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HasherKind {
    Sha256,
    Sha512,
    Crc32,
}

impl HasherKind {
    pub fn registry_id(&self) -> &'static str {
        match self {
            HasherKind::Sha256 => "sha256-hasher",
            HasherKind::Sha512 => "sha512-hasher",
            HasherKind::Crc32 => "crc32-hasher",
        }
    }

    pub fn from_registry_id(id: &str) -> Option<HasherKind> {
        match id {
            "sha256-hasher" => Some(HasherKind::Sha256),
            "sha512-hasher" => Some(HasherKind::Sha512),
            "crc32-hasher" => Some(HasherKind::Crc32),
            _ => None,
        }
    }

    /// Algorithm name, also the manifest file extension.
    pub fn name(&self) -> &'static str {
        match self {
            HasherKind::Sha256 => "sha256",
            HasherKind::Sha512 => "sha512",
            HasherKind::Crc32 => "crc32",
        }
    }

    pub fn from_name(name: &str) -> Option<HasherKind> {
        match name {
            "sha256" => Some(HasherKind::Sha256),
            "sha512" => Some(HasherKind::Sha512),
            "crc32" => Some(HasherKind::Crc32),
            _ => None,
        }
    }

    fn digester(&self) -> Digester {
        match self {
            HasherKind::Sha256 => Digester::Sha256(Sha256::new()),
            HasherKind::Sha512 => Digester::Sha512(Sha512::new()),
            HasherKind::Crc32 => Digester::Crc32(crc32fast::Hasher::new()),
        }
    }

    /// Digests a byte slice in one go.
    pub fn digest_bytes(&self, data: &[u8]) -> String {
        let mut digester = self.digester();
        digester.update(data);
        digester.finalize()
    }

    /// Digests content block by block through its cursor.
    ///
    /// // 从头遍历内容游标,逐块喂给摘要器。
    pub fn digest_content(&self, content: &mut FileContent) -> Result<String, HashError> {
        content.reset()?;
        let mut digester = self.digester();
        while let Some(block) = content.next_block()? {
            digester.update(&block);
        }
        Ok(digester.finalize())
    }

    /// Searches the checksum manifests around `directory` for a digest of
    /// `filename`.
    ///
    /// The fixed candidates are `<full name>.<hasher>`, `<stem>.<hasher>`,
    /// `CHECKSUM.<hasher>` and `<directory name>.<hasher>`. With
    /// `full_check` every `.<hasher>` file in the directory joins the list;
    /// with `full_loop_check` parent directories are walked until one holds
    /// a manifest or the root is reached.
    ///
    /// Matches are collected across every manifest consulted. When the
    /// collected digests agree the first one is returned together with its
    /// manifest path; when they disagree the lookup fails with an
    /// [`AmbiguityError`] instead of silently picking a winner.
    ///
    /// // 固定候选名加可选的目录扫描/父目录回溯;跨清单收集命中结果,
    /// // 摘要一致取第一个,互相矛盾直接报歧义错误,绝不暗自裁决。
    pub fn load_from_file(
        &self,
        storage: &dyn Storage,
        directory: &str,
        filename: &str,
        extension: Option<&str>,
        full_check: bool,
        full_loop_check: bool,
        mut session: Option<&mut HashSession>,
    ) -> Result<Option<(String, String)>, HashError> {
        let manifest_ext = self.name();
        let formatted_extension = match extension {
            Some(ext) if !ext.is_empty() => format!(".{ext}"),
            _ => String::new(),
        };
        let full_name = format!("{filename}{formatted_extension}");

        // 1. 固定候选:全名、主干名、CHECKSUM、目录同名。
        let mut files_to_check: Vec<String> = vec![
            storage.join(directory, &format!("{full_name}.{manifest_ext}")),
            storage.join(directory, &format!("{filename}.{manifest_ext}")),
            storage.join(directory, &format!("{CHECKSUM_STEM}.{manifest_ext}")),
            storage.join(
                directory,
                &format!(
                    "{}.{manifest_ext}",
                    storage.get_filename_from_path(directory)
                ),
            ),
        ];

        // 2. 可选候选:目录扫描,或沿父目录回溯到第一个有清单的层级。
        if full_loop_check {
            let mut found = manifests_in(storage, directory, manifest_ext);
            let mut parent = storage.get_parent_directory_from_path(directory);
            while found.is_empty() {
                found = manifests_in(storage, &parent, manifest_ext);
                let next = storage.get_parent_directory_from_path(&parent);
                if next == parent {
                    break;
                }
                parent = next;
            }
            files_to_check.extend(found);
        } else if full_check {
            files_to_check.extend(manifests_in(storage, directory, manifest_ext));
        }

        let mut seen: HashSet<String> = HashSet::new();
        files_to_check.retain(|path| seen.insert(path.clone()));

        // 3. 逐个清单扫描行,目录感知的精确命中立即返回。
        let mut candidates: Vec<(String, String)> = Vec::new();

        for file_path in &files_to_check {
            if !storage.exists(file_path) {
                continue;
            }
            let lines = match session.as_deref_mut() {
                Some(session) => session.read_lines(storage, file_path)?,
                None => storage.read_lines(file_path)?,
            };

            // 清单位于上级目录时,行里列出的是相对路径。
            let manifest_dir = storage.get_directory_from_path(file_path);
            let prefix = format!("{manifest_dir}{}", storage.sep());
            let relative_name = directory
                .strip_prefix(prefix.as_str())
                .map(|relative| format!("{relative}{}{full_name}", storage.sep()));

            for line in &lines {
                let trimmed = line.trim_start();
                if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
                    continue;
                }
                let Some(digest) = trimmed.split_whitespace().next() else {
                    continue;
                };

                if let Some(relative_name) = &relative_name {
                    if line.contains(relative_name.as_str()) {
                        return Ok(Some((digest.to_string(), file_path.clone())));
                    }
                }
                if line.contains(full_name.as_str()) {
                    candidates.push((digest.to_string(), file_path.clone()));
                }
            }
        }

        // 4. 跨清单裁决:全部一致取第一个,矛盾报歧义。
        if candidates.is_empty() {
            return Ok(None);
        }
        let distinct: HashSet<&str> = candidates
            .iter()
            .map(|(digest, _)| digest.as_str())
            .collect();
        if distinct.len() > 1 {
            return Err(AmbiguityError {
                subject: full_name,
                candidates: candidates
                    .iter()
                    .map(|(digest, _)| digest.clone())
                    .collect(),
                origins: candidates
                    .iter()
                    .map(|(_, origin)| PathBuf::from(origin))
                    .collect(),
            }
            .into());
        }
        Ok(candidates.into_iter().next())
    }

    /// Builds the sidecar file object holding a freshly computed digest.
    ///
    /// The sidecar points at `<save_to>/<complete filename>.<hasher>`, is
    /// marked pending save and carries the conventional one-entry manifest
    /// text as its content.
    ///
    /// // 为新算出的摘要构造旁车文件:指向宿主目录下的清单路径,
    /// // 内容是单条清单文本,状态记为待保存。
    pub fn create_hash_file(&self, file: &File, digest: &str) -> Result<File, HashError> {
        let storage = file.storage_arc();
        let save_to = file
            .save_to
            .as_deref()
            .ok_or(ConfigurationError::MissingSaveTo)?;
        let complete_filename = file
            .complete_filename()
            .ok_or(ConfigurationError::MissingFilename)?;

        let path = storage.join(
            &storage.sanitize_path(save_to),
            &format!("{complete_filename}.{}", self.name()),
        );

        let mut sidecar = File::sidecar(&path, storage.clone(), file.mimetyper_arc());
        sidecar.meta.checksum = false;
        sidecar.meta.loaded = false;

        let line_sep = storage.line_sep();
        let content = format!(
            "# Generated by filejacket{line_sep}{digest}  {complete_filename}{line_sep}"
        );
        sidecar.set_content(ContentSource::Text(content));
        sidecar.actions.to_save();

        Ok(sidecar)
    }

    /// Tries to fill the file's digest from a manifest on the storage.
    ///
    /// Returns `false` when the file has no path or no manifest lists it.
    /// On success the digest lands in the file's hash table together with a
    /// sidecar pointing at the manifest it came from.
    ///
    /// // 从清单装载摘要:找不到就返回 false;找到则登记摘要,
    /// // 旁车文件指向那份清单,状态记为已保存。
    pub fn process_from_file(
        &self,
        file: &mut File,
        options: &ProcessorOptions,
        ctx: &mut PipelineContext<'_>,
    ) -> Result<bool, ProcessorError> {
        let storage = file.storage_arc();

        let Some(path) = file.path.clone() else {
            return Ok(false);
        };
        let Some(filename) = file.filename.clone() else {
            return Ok(false);
        };

        let full_check = options.full_check.unwrap_or(true);
        let full_loop_check = options.full_loop_check.unwrap_or(false);
        let directory = storage.get_directory_from_path(&storage.sanitize_path(&path));

        let found = self.load_from_file(
            storage.as_ref(),
            &directory,
            &filename,
            file.extension.as_deref(),
            full_check,
            full_loop_check,
            ctx.hash_session.as_deref_mut(),
        )?;
        let Some((digest, manifest_path)) = found else {
            return Ok(false);
        };

        let mut sidecar =
            File::sidecar_from_disk(&manifest_path, storage.clone(), file.mimetyper_arc());
        sidecar.meta.checksum = manifest_path.contains(&format!("{CHECKSUM_STEM}."));
        sidecar.meta.loaded = true;
        sidecar.state.adding = false;
        sidecar.actions.saved();

        file.hashes.insert(self.name(), digest, sidecar);
        Ok(true)
    }

    /// Verifies the file content against a recorded digest.
    ///
    /// `compare_to` overrides the digest recorded on the file. Returns
    /// `None` when there is no digest to verify against or no content to
    /// digest. Comparison is case insensitive.
    pub fn check_hash(
        &self,
        file: &mut File,
        compare_to: Option<&str>,
    ) -> Result<Option<bool>, HashError> {
        let recorded = match compare_to {
            Some(digest) => digest.to_string(),
            None => match file.hashes.digest_of(self.name()) {
                Some(digest) => digest.to_string(),
                None => return Ok(None),
            },
        };

        let Some(content) = file.content.as_mut() else {
            return Ok(None);
        };
        let computed = self.digest_content(content)?;
        Ok(Some(computed.eq_ignore_ascii_case(&recorded)))
    }

    /// Pipeline entry point.
    ///
    /// // 流水线入口:已有摘要直接成功;允许时先查清单;
    /// // 否则遍历内容计算,并生成待保存的旁车文件。
    pub(crate) fn process(
        &self,
        file: &mut File,
        options: &ProcessorOptions,
        ctx: &mut PipelineContext<'_>,
    ) -> Result<bool, ProcessorError> {
        // 1. 已经有这个算法的摘要,不重复计算。
        if file.hashes.contains(self.name()) {
            return Ok(true);
        }

        // 2. 允许时先尝试从清单文件装载。
        if options.try_loading_from_file.unwrap_or(false)
            && self.process_from_file(file, options, ctx)?
        {
            return Ok(true);
        }

        // 3. 没有内容就无从计算。
        let digest = match file.content.as_mut() {
            Some(content) => self.digest_content(content).map_err(ProcessorError::from)?,
            None => return Ok(false),
        };

        // 4. 登记摘要和待保存的旁车文件。
        let sidecar = self.create_hash_file(file, &digest)?;
        file.hashes.insert(self.name(), digest, sidecar);
        Ok(true)
    }
}

fn manifests_in(storage: &dyn Storage, directory: &str, manifest_ext: &str) -> Vec<String> {
    let suffix = format!(".{manifest_ext}");
    storage
        .list_files(directory)
        .unwrap_or_default()
        .into_iter()
        .filter(|name| name.ends_with(&suffix))
        .map(|name| storage.join(directory, &name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;

    #[test]
    fn test_digest_bytes_known_values() {
        assert_eq!(
            HasherKind::Sha256.digest_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            HasherKind::Sha512.digest_bytes(b"abc"),
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
             2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
        // CRC-32 摘要是十进制数字串。
        assert_eq!(HasherKind::Crc32.digest_bytes(b"123456789"), "3421780262");
    }

    #[test]
    fn test_name_round_trips_with_registry_id() {
        for kind in [HasherKind::Sha256, HasherKind::Sha512, HasherKind::Crc32] {
            assert_eq!(HasherKind::from_name(kind.name()), Some(kind));
            assert_eq!(
                HasherKind::from_registry_id(kind.registry_id()),
                Some(kind)
            );
        }
    }

    #[test]
    fn test_load_from_file_reads_single_entry_sidecar() {
        let temp = tempfile::tempdir().unwrap();
        let directory = temp.path().to_string_lossy().to_string();
        let digest = HasherKind::Sha256.digest_bytes(b"hello");
        std::fs::write(
            temp.path().join("report.txt.sha256"),
            format!("# comment line\n{digest}  report.txt\n"),
        )
        .unwrap();

        let storage = LocalStorage::new();
        let found = HasherKind::Sha256
            .load_from_file(&storage, &directory, "report", Some("txt"), false, false, None)
            .unwrap();

        let (value, origin) = found.unwrap();
        assert_eq!(value, digest);
        assert!(origin.ends_with("report.txt.sha256"));
    }

    #[test]
    fn test_load_from_file_agreeing_manifests_return_digest() {
        let temp = tempfile::tempdir().unwrap();
        let directory = temp.path().to_string_lossy().to_string();
        std::fs::write(temp.path().join("report.txt.sha256"), "aabbcc  report.txt\n").unwrap();
        std::fs::write(temp.path().join("CHECKSUM.sha256"), "aabbcc  report.txt\n").unwrap();

        let storage = LocalStorage::new();
        let found = HasherKind::Sha256
            .load_from_file(&storage, &directory, "report", Some("txt"), false, false, None)
            .unwrap();

        assert_eq!(found.unwrap().0, "aabbcc");
    }

    #[test]
    fn test_load_from_file_disagreeing_manifests_raise_ambiguity() {
        let temp = tempfile::tempdir().unwrap();
        let directory = temp.path().to_string_lossy().to_string();
        std::fs::write(temp.path().join("report.txt.sha256"), "aabbcc  report.txt\n").unwrap();
        std::fs::write(temp.path().join("CHECKSUM.sha256"), "ddeeff  report.txt\n").unwrap();

        let storage = LocalStorage::new();
        let result = HasherKind::Sha256.load_from_file(
            &storage,
            &directory,
            "report",
            Some("txt"),
            false,
            false,
            None,
        );

        assert!(matches!(result, Err(HashError::Ambiguity(_))));
    }

    #[test]
    fn test_load_from_file_missing_manifest_returns_none() {
        let temp = tempfile::tempdir().unwrap();
        let directory = temp.path().to_string_lossy().to_string();

        let storage = LocalStorage::new();
        let found = HasherKind::Crc32
            .load_from_file(&storage, &directory, "report", Some("txt"), true, false, None)
            .unwrap();

        assert!(found.is_none());
    }

    #[test]
    fn test_load_from_file_full_loop_check_walks_parents() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        // 清单在祖父目录,行里是相对路径。
        std::fs::write(
            temp.path().join("CHECKSUM.sha256"),
            "aabbcc  a/b/report.txt\n",
        )
        .unwrap();

        let storage = LocalStorage::new();
        let directory = nested.to_string_lossy().to_string();
        let found = HasherKind::Sha256
            .load_from_file(&storage, &directory, "report", Some("txt"), false, true, None)
            .unwrap();

        let (value, origin) = found.unwrap();
        assert_eq!(value, "aabbcc");
        assert!(origin.ends_with("CHECKSUM.sha256"));
    }

    #[test]
    fn test_hash_session_caches_manifest_lines() {
        let temp = tempfile::tempdir().unwrap();
        let manifest = temp.path().join("CHECKSUM.sha256");
        std::fs::write(&manifest, "aabbcc  report.txt\n").unwrap();
        let path = manifest.to_string_lossy().to_string();

        let storage = LocalStorage::new();
        let mut session = HashSession::new();
        let first = session.read_lines(&storage, &path).unwrap();
        assert_eq!(first, vec!["aabbcc  report.txt".to_string()]);

        // 改写磁盘文件,缓存仍返回旧内容,invalidate 之后才能看到新行。
        std::fs::write(&manifest, "ddeeff  report.txt\n").unwrap();
        let cached = session.read_lines(&storage, &path).unwrap();
        assert_eq!(cached, first);

        session.invalidate(&path);
        let fresh = session.read_lines(&storage, &path).unwrap();
        assert_eq!(fresh, vec!["ddeeff  report.txt".to_string()]);
    }
}
