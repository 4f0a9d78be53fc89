use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Component, Path};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

use crate::common::constants::BACKUP_SUFFIX;
use crate::content::source::ReadSeek;

use super::Storage;

/// Local-disk implementation of [`Storage`].
///
/// Paths are plain strings at the trait surface; this backend converts
/// them to [`Path`] values internally and keeps the platform separator.
///
/// // 本地磁盘后端,trait 层使用字符串路径,内部转换为 Path。
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        LocalStorage
    }

    fn to_path(path: &str) -> &Path {
        Path::new(path)
    }

    fn ensure_parent(path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl Storage for LocalStorage {
    fn registry_id(&self) -> &'static str {
        "local-storage"
    }

    fn sep(&self) -> &'static str {
        std::path::MAIN_SEPARATOR_STR
    }

    fn line_sep(&self) -> &'static str {
        if cfg!(windows) { "\r\n" } else { "\n" }
    }

    fn sanitize_path(&self, path: &str) -> String {
        // 统一分隔符并去掉 `.` 组件,不访问磁盘。
        let normalized = path.replace('\\', "/");
        let mut parts: Vec<String> = Vec::new();
        let absolute = normalized.starts_with('/');
        for component in Path::new(&normalized).components() {
            match component {
                Component::CurDir => {}
                Component::RootDir => {}
                other => parts.push(other.as_os_str().to_string_lossy().into_owned()),
            }
        }
        let joined = parts.join(self.sep());
        if absolute {
            format!("{}{}", self.sep(), joined)
        } else {
            joined
        }
    }

    fn join(&self, base: &str, child: &str) -> String {
        if base.is_empty() {
            return child.to_string();
        }
        let trimmed = base.trim_end_matches(['/', '\\']);
        format!("{}{}{}", trimmed, self.sep(), child)
    }

    fn exists(&self, path: &str) -> bool {
        Self::to_path(path).exists()
    }

    fn is_dir(&self, path: &str) -> bool {
        Self::to_path(path).is_dir()
    }

    fn is_file(&self, path: &str) -> bool {
        Self::to_path(path).is_file()
    }

    fn list_files(&self, directory: &str) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(Self::to_path(directory))? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn get_directory_from_path(&self, path: &str) -> String {
        Self::to_path(path)
            .parent()
            .map(|parent| parent.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn get_parent_directory_from_path(&self, path: &str) -> String {
        Self::to_path(path)
            .parent()
            .and_then(|parent| parent.parent())
            .map(|grand| grand.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn get_filename_from_path(&self, path: &str) -> String {
        Self::to_path(path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn get_absolute_path(&self, path: &str) -> io::Result<String> {
        Ok(fs::canonicalize(Self::to_path(path))?
            .to_string_lossy()
            .into_owned())
    }

    fn get_size(&self, path: &str) -> io::Result<u64> {
        Ok(fs::metadata(Self::to_path(path))?.len())
    }

    fn get_created_date(&self, path: &str) -> io::Result<DateTime<Utc>> {
        let metadata = fs::metadata(Self::to_path(path))?;
        // 某些文件系统不记录创建时间,退回到修改时间。
        let created = metadata.created().or_else(|_| metadata.modified())?;
        Ok(created.into())
    }

    fn get_modified_date(&self, path: &str) -> io::Result<DateTime<Utc>> {
        Ok(fs::metadata(Self::to_path(path))?.modified()?.into())
    }

    #[cfg(unix)]
    fn get_path_id(&self, path: &str) -> io::Result<String> {
        use std::os::unix::fs::MetadataExt;
        let metadata = fs::metadata(Self::to_path(path))?;
        Ok(format!("{}:{}", metadata.dev(), metadata.ino()))
    }

    #[cfg(not(unix))]
    fn get_path_id(&self, path: &str) -> io::Result<String> {
        let metadata = fs::metadata(Self::to_path(path))?;
        let modified: DateTime<Utc> = metadata.modified()?.into();
        Ok(format!("{}:{}", metadata.len(), modified.timestamp_nanos_opt().unwrap_or_default()))
    }

    fn open_reader(&self, path: &str) -> io::Result<Box<dyn ReadSeek>> {
        let file = File::open(Self::to_path(path))?;
        Ok(Box::new(file))
    }

    fn open_writer(&self, path: &str) -> io::Result<Box<dyn Write>> {
        let target = Self::to_path(path);
        Self::ensure_parent(target)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(target)?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn read_lines(&self, path: &str) -> io::Result<Vec<String>> {
        let file = File::open(Self::to_path(path))?;
        BufReader::new(file).lines().collect()
    }

    fn save_bytes(&self, path: &str, data: &[u8]) -> io::Result<()> {
        let target = Self::to_path(path);
        Self::ensure_parent(target)?;
        // 先写入同目录下的临时文件,再原子落位,避免半成品文件。
        let directory = target.parent().unwrap_or_else(|| Path::new("."));
        let mut staging = NamedTempFile::new_in(directory)?;
        staging.write_all(data)?;
        staging.flush()?;
        staging.persist(target).map_err(|e| e.error)?;
        Ok(())
    }

    fn save_stream(&self, path: &str, reader: &mut dyn Read) -> io::Result<u64> {
        let target = Self::to_path(path);
        Self::ensure_parent(target)?;
        let directory = target.parent().unwrap_or_else(|| Path::new("."));
        let mut staging = NamedTempFile::new_in(directory)?;
        let written = io::copy(reader, &mut staging)?;
        staging.flush()?;
        staging.persist(target).map_err(|e| e.error)?;
        Ok(written)
    }

    fn create_directory(&self, path: &str) -> io::Result<()> {
        fs::create_dir_all(Self::to_path(path))
    }

    fn delete(&self, path: &str) -> io::Result<()> {
        let target = Self::to_path(path);
        if target.is_dir() {
            fs::remove_dir_all(target)
        } else if target.exists() {
            fs::remove_file(target)
        } else {
            // 目标不存在时按幂等删除处理。
            Ok(())
        }
    }

    fn rename_path(&self, from: &str, to: &str) -> io::Result<()> {
        let destination = Self::to_path(to);
        if destination.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("rename target already exists: {to}"),
            ));
        }
        Self::ensure_parent(destination)?;
        fs::rename(Self::to_path(from), destination)
    }

    fn replace_path(&self, from: &str, to: &str) -> io::Result<()> {
        let destination = Self::to_path(to);
        Self::ensure_parent(destination)?;
        fs::rename(Self::to_path(from), destination)
    }

    fn backup(&self, path: &str) -> io::Result<String> {
        let mut candidate = format!("{path}{BACKUP_SUFFIX}");
        let mut index = 1u32;
        while self.exists(&candidate) {
            candidate = format!("{path}{BACKUP_SUFFIX}.{index}");
            index += 1;
        }
        fs::copy(Self::to_path(path), Self::to_path(&candidate))?;
        Ok(candidate)
    }

    fn get_temp_directory(&self) -> io::Result<String> {
        Ok(std::env::temp_dir().to_string_lossy().into_owned())
    }

    fn get_unique_temp_file(&self) -> io::Result<String> {
        let staging = NamedTempFile::new()?;
        // keep() 之后文件归调用方负责清理。
        let (_, path) = staging.keep().map_err(|e| e.error)?;
        Ok(path.to_string_lossy().into_owned())
    }

    fn enumeration_suffix(&self, index: u32) -> String {
        if cfg!(windows) {
            format!(" ({index})")
        } else {
            format!(" - {index}")
        }
    }
}
