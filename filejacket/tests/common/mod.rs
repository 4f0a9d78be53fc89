#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use filejacket::{File, KnownMimeTyper, MimeTyper, Storage};
use filejacket::storage::LocalStorage;

/// 辅助函数：本地存储后端加已知类型表,集成测试统一用这一对。
pub fn local_backends() -> (Arc<dyn Storage>, Arc<dyn MimeTyper>) {
    (Arc::new(LocalStorage::new()), KnownMimeTyper::new_arc())
}

/// 辅助函数：在临时目录中创建一个具有特定内容的文本文件。
///
/// 这用于模拟用户本地文件系统上的源文件,返回其完整路径。
pub fn write_text_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let file_path = dir.path().join(name);
    fs::write(&file_path, content).unwrap();
    file_path
}

/// 辅助函数：在临时目录中创建一个 zip 归档。
///
/// `entries` 以 `(内部路径, 内容)` 给出;以 `/` 结尾的名字作为目录条目写入。
pub fn write_zip_fixture(dir: &TempDir, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let archive_path = dir.path().join(name);
    let file = fs::File::create(&archive_path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let file_options = zip::write::FileOptions::default();
    for (entry_name, data) in entries {
        if entry_name.ends_with('/') {
            writer
                .add_directory(entry_name.trim_end_matches('/'), file_options)
                .unwrap();
        } else {
            writer.start_file(*entry_name, file_options).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap();
    archive_path
}

/// 辅助函数：把条目打成 tar 字节流,供 tar 和 tar.gz 夹具共用。
pub fn tar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut bytes = Vec::new();
    {
        let mut builder = tar::Builder::new(&mut bytes);
        for (entry_name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mtime(1_600_000_000);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, entry_name, *data).unwrap();
        }
        builder.finish().unwrap();
    }
    bytes
}

/// 辅助函数：在临时目录中创建一个 tar 归档。
pub fn write_tar_fixture(dir: &TempDir, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let archive_path = dir.path().join(name);
    fs::write(&archive_path, tar_bytes(entries)).unwrap();
    archive_path
}

/// 辅助函数：在临时目录中创建一个 gzip 压缩的 tar 归档。
pub fn write_tar_gz_fixture(dir: &TempDir, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let archive_path = dir.path().join(name);
    let file = fs::File::create(&archive_path).unwrap();
    let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    encoder.write_all(&tar_bytes(entries)).unwrap();
    encoder.finish().unwrap();
    archive_path
}

/// 辅助函数：驱动内容控制器的块游标,整体读出字节。
pub fn drain_content(file: &mut File) -> Vec<u8> {
    let content = file.content_controller_mut().unwrap();
    let mut data = Vec::new();
    for block in content.blocks() {
        data.extend(block.unwrap());
    }
    data
}
