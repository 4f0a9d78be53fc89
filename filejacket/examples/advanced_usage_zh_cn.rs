use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;

use filejacket::serializer::{self, SerializeOptions};
use filejacket::storage::LocalStorage;
use filejacket::{ContentSource, File, KnownMimeTyper, RenameSession, SaveOptions, Storage};

fn write_sample_zip(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = fs::File::create(path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();
    writer.start_file("docs/readme.md", options)?;
    writer.write_all("# 合集\n打包在 zip 里发货。\n".as_bytes())?;
    writer.start_file("data/values.csv", options)?;
    writer.write_all(b"id,value\n1,42\n")?;
    writer.finish()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let dir = tempdir()?;
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new());
    let mimetyper = KnownMimeTyper::new_arc();

    // --- 查看归档内部 ---
    let archive_path = dir.path().join("bundle.zip");
    write_sample_zip(&archive_path)?;
    println!("归档已写入 {:?}", archive_path);

    let mut archive = File::from_disk(&archive_path.to_string_lossy(), storage.clone(), mimetyper.clone());
    assert!(archive.meta.packed);

    println!("\n正在列出归档条目...");
    archive.files();
    for (name, entry) in archive.packet.iter() {
        println!("  - {} ({} 字节, crc32: {:?})", name, entry.length, entry.file.hashes.digest_of("crc32"));
    }
    assert_eq!(archive.packet.len(), 2);

    // 嵌套内容只在真正读取时才解压。
    println!("\n正在通过惰性条目流读取一个条目...");
    let readme = archive.internal_file("docs/readme.md").unwrap();
    let mut text = Vec::new();
    for block in readme.content_controller_mut().unwrap().blocks() {
        text.extend(block?);
    }
    println!("  docs/readme.md -> {:?}", String::from_utf8_lossy(&text));

    // --- 整体解压 ---
    let out = tempdir()?;
    println!("\n正在解压归档到 {:?}...", out.path());
    let accepted = archive.extract(Some(&out.path().to_string_lossy()), false)?;
    assert!(accepted);
    println!("  解压结果: {:?}", storage.list_files(&out.path().join("data").to_string_lossy())?);

    // --- 序列化对象,不携带内容 ---
    println!("\n正在序列化归档对象(不含内容)...");
    archive.generate_hashes(false);
    let json = serializer::to_json(&mut archive, &SerializeOptions::default())?;
    println!("  载荷大小: {} 个字符", json.len());

    let restored = serializer::from_json(&json, storage.clone(), mimetyper.clone())?;
    assert_eq!(restored.hashes.digest_of("sha256"), archive.hashes.digest_of("sha256"));
    assert_eq!(restored.packet.names(), archive.packet.names());
    println!("还原的对象携带同样的摘要和包条目。");

    // --- 经同一个会话保存两个同名对象 ---
    println!("\n正在通过共享会话把两个对象存成同一个名字...");
    let drop_dir = tempdir()?;
    let mut session = RenameSession::new();

    let mut first = File::from_content(
        ContentSource::Text("第一份内容".to_string()),
        &Default::default(),
        storage.clone(),
        mimetyper.clone(),
    );
    first.filename = Some("report".to_string());
    first.extension = Some("txt".to_string());
    first.save_to = Some(drop_dir.path().to_string_lossy().into_owned());
    first.state.renaming = true;
    first.save_with(&SaveOptions::default(), &mut session)?;

    let mut second = File::from_content(
        ContentSource::Text("第二份内容".to_string()),
        &Default::default(),
        storage.clone(),
        mimetyper,
    );
    second.filename = Some("report".to_string());
    second.extension = Some("txt".to_string());
    second.save_to = Some(drop_dir.path().to_string_lossy().into_owned());
    second.state.adding = false;
    second.state.changing = true;
    second.state.renaming = true;
    second.save_with(
        &SaveOptions {
            allow_update: true,
            allow_rename: true,
            ..SaveOptions::default()
        },
        &mut session,
    )?;

    println!("  第一个保住了: {:?}", first.complete_filename());
    println!("  第二个改成了: {:?}", second.complete_filename());
    assert_eq!(second.complete_filename().as_deref(), Some("report (1).txt"));
    println!("  目录内容: {:?}", storage.list_files(&drop_dir.path().to_string_lossy())?);

    println!("\n示例运行成功!");
    Ok(())
}
