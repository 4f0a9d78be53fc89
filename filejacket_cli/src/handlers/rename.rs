use std::path::Path;

use filejacket::{ConfigurationError, File, FileError};

use crate::core::helpers::load_file;
use crate::errors::CliError;

/// Main handler for the `rename` command.
/// Previews the next collision-free name for the file; with `--apply`
/// the file and its digest manifests are renamed on disk.
//
// // `rename` 命令的主处理器。
// // 预览下一个不冲突的文件名;加 `--apply` 时文件和它的
// // 摘要清单会真正在磁盘上改名。
pub fn handle_rename(path: &Path, apply: bool) -> Result<(), CliError> {
    let mut file = load_file(path)?;

    let old_complete = file
        .complete_filename()
        .ok_or(FileError::from(ConfigurationError::MissingFilename))?;

    file.rename_to_free_name(None)?;

    let new_complete = file
        .complete_filename()
        .ok_or(FileError::from(ConfigurationError::MissingFilename))?;

    if new_complete == old_complete {
        println!(
            "'{}' does not collide with anything; nothing to rename.",
            old_complete
        );
        return Ok(());
    }

    if !apply {
        println!(
            "'{}' is taken; the next free name is '{}'.",
            old_complete, new_complete
        );
        println!("(preview only; pass --apply to rename on disk)");
        return Ok(());
    }

    let manifests = apply_rename(&mut file, &old_complete, &new_complete)?;
    println!("Renamed '{}' -> '{}'.", old_complete, new_complete);
    if manifests > 0 {
        println!("Updated {} digest manifest(s).", manifests);
    }
    Ok(())
}

/// Renames the file on the storage and rewrites its digest manifests,
/// dropping the manifests that still carry the old name.
//
// // 在存储上执行改名;摘要清单落盘到新名字,旧名字的
// // 清单文件随后删掉。
fn apply_rename(file: &mut File, old_complete: &str, new_complete: &str) -> Result<usize, CliError> {
    let storage = file.storage_arc();
    let directory = file
        .save_to
        .clone()
        .ok_or(FileError::from(ConfigurationError::MissingSaveTo))?;

    let old_path = storage.join(&directory, old_complete);
    let new_path = storage.join(&directory, new_complete);
    storage.rename_path(&old_path, &new_path)?;

    // 独占旁车清单换了名字;共享的 CHECKSUM 清单只重写文本。
    let stale: Vec<String> = file
        .hashes
        .iter()
        .filter(|(_, record)| !record.sidecar.meta.checksum)
        .map(|(name, _)| storage.join(&directory, &format!("{}.{}", old_complete, name)))
        .collect();

    let manifests = file.hashes.len();
    file.hashes.save(true)?;
    for manifest_path in stale {
        if storage.is_file(&manifest_path) {
            storage.delete(&manifest_path)?;
        }
    }
    Ok(manifests)
}
