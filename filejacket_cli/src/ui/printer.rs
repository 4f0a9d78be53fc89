//! Functions for printing file objects to the console.

use filejacket::file::FileMetadata;
use filejacket::pipeline::ProcessorFailure;
use filejacket::File;

use crate::ui::formatter::{describe_state, display_name, format_size, format_time};

/// 打印单个文件对象的详细信息
pub fn print_file_details(file: &File) {
    println!("----------------------------------------");
    println!("  Name:         {}", display_name(file));
    if let Some(mime_type) = file.mime_type.as_deref() {
        let file_type = file.file_type.as_deref().unwrap_or("unknown");
        println!("  Type:         {} ({})", file_type, mime_type);
    }
    if let Some(path) = file.path.as_deref() {
        println!("  Path:         {}", path);
    }
    if let Some(save_to) = file.save_to.as_deref() {
        println!("  Save To:      {}", save_to);
    }
    println!(
        "  Size:         {} ({} bytes)",
        format_size(file.length),
        file.length
    );
    if let Some(id) = file.id.as_deref() {
        println!("  Storage Id:   {}", id);
    }
    println!("  Created:      {}", format_time(file.create_date));
    println!("  Updated:      {}", format_time(file.update_date));
    println!("  State:        {}", describe_state(&file.state));

    let flags = collect_flags(&file.meta);
    if !flags.is_empty() {
        println!("  Flags:        {}", flags.join(", "));
    }

    if !file.hashes.is_empty() {
        println!("  Digests:");
        for (name, record) in file.hashes.iter() {
            println!("    - {}: {}", name, record.digest);
        }
    }
    println!("----------------------------------------");
}

/// 打印摘要表 (hash 命令用)
pub fn print_digests(file: &File) {
    for (name, record) in file.hashes.iter() {
        println!("  {:<8} {}", name, record.digest);
    }
}

/// 打印包内条目列表
///
/// 格式: {crc32 摘要} {大小} {条目路径},与归档自带的校验值一起给出。
pub fn print_packet_entries(file: &File) {
    println!(
        "Contents of '{}' ({} entries, {} unpacked):",
        display_name(file),
        file.packet.len(),
        format_size(file.packet.unpacked_length())
    );
    if file.packet.is_empty() {
        println!("(empty)");
        return;
    }
    for (internal_path, entry) in file.packet.iter() {
        let crc32 = entry.file.hashes.digest_of("crc32").unwrap_or("-");
        println!(
            "{:<12} {:>10}  {}",
            crc32,
            format_size(entry.length),
            internal_path
        );
    }
}

/// 把管线错误作为警告打印到 stderr
pub fn print_pipeline_warnings(failures: &[ProcessorFailure]) {
    for failure in failures {
        eprintln!("Warning: {} failed: {}", failure.processor, failure.error);
    }
}

/// 收集已置位的元数据旗标
fn collect_flags(meta: &FileMetadata) -> Vec<&'static str> {
    let mut flags = Vec::new();
    if meta.packed {
        flags.push("packed");
    }
    if meta.compressed {
        flags.push("compressed");
    }
    if meta.lossless {
        flags.push("lossless");
    }
    if !meta.hashable {
        flags.push("unhashable");
    }
    if meta.internal {
        flags.push("internal");
    }
    if meta.checksum {
        flags.push("checksum");
    }
    if meta.loaded {
        flags.push("loaded");
    }
    flags
}
