use std::fs;
use std::sync::Arc;

use tempfile::tempdir;

use filejacket::storage::LocalStorage;
use filejacket::{File, KnownMimeTyper, SaveOptions, Storage};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // 1. 创建一个临时目录存放源文件。
    let dir = tempdir()?;
    let source_path = dir.path().join("notes.txt");
    fs::write(&source_path, "来自 filejacket 示例的问候!\n第二行。\n")?;
    println!("源文件已写入: {:?}", source_path);

    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new());
    let mimetyper = KnownMimeTyper::new_arc();

    // --- 从路径构建文件对象 ---
    println!("\n正在从路径构建文件对象...");
    let mut file = File::from_disk(&source_path.to_string_lossy(), storage.clone(), mimetyper.clone());
    println!("文件对象就绪!");
    println!("  - 文件名:   {:?}", file.filename);
    println!("  - 扩展名:   {:?}", file.extension);
    println!("  - mimetype: {:?}", file.mime_type);
    println!("  - 长度:     {} 字节", file.length);
    assert_eq!(file.filename.as_deref(), Some("notes"));
    assert_eq!(file.mime_type.as_deref(), Some("text/plain"));

    // --- 生成摘要 ---
    println!("\n正在对内容生成摘要...");
    file.generate_hashes(false);
    let sha256 = file.hashes.digest_of("sha256").unwrap().to_string();
    let crc32 = file.hashes.digest_of("crc32").unwrap().to_string();
    println!("  - sha256: {}", sha256);
    println!("  - crc32:  {}", crc32);

    // --- 保存到新目录,并落盘摘要旁车 ---
    let target = tempdir()?;
    println!("\n正在保存到 {:?},附带摘要清单...", target.path());
    file.save_to = Some(target.path().to_string_lossy().into_owned());
    file.save(&SaveOptions {
        save_hashes: true,
        ..SaveOptions::default()
    })?;
    println!("保存完成!目录中现在有:");
    for name in storage.list_files(&target.path().to_string_lossy())? {
        println!("  - {}", name);
    }

    // --- 重新装载并校验 ---
    println!("\n正在重新装载保存的副本...");
    let saved_path = target.path().join("notes.txt");
    let mut reloaded = File::from_disk(&saved_path.to_string_lossy(), storage, mimetyper);
    println!(
        "从旁车清单装回的摘要: {:?}",
        reloaded.hashes.digest_of("sha256")
    );
    assert_eq!(reloaded.hashes.digest_of("sha256"), Some(sha256.as_str()));

    let wholesome = reloaded.is_content_wholesome()?;
    println!("内容对照全部摘要校验: {:?}", wholesome);
    assert_eq!(wholesome, Some(true));

    println!("\n示例运行成功!");
    Ok(())
}
