use std::path::{Path, PathBuf};

use filejacket::{ConfigurationError, File, FileError};

use crate::core::helpers::load_file;
use crate::errors::CliError;
use crate::ui::printer;

/// Main handler for the `unpack` command.
/// Lists the entries of an archive, or decompresses them into a
/// destination directory.
//
// // `unpack` 命令的主处理器。
// // 列出归档条目,或把它们解压到目标目录。
pub fn handle_unpack(
    path: &Path,
    list: bool,
    destination: Option<PathBuf>,
    force: bool,
) -> Result<(), CliError> {
    let mut file = load_file(path)?;

    if !file.meta.packed {
        return Err(CliError::NotAnArchive(path.to_path_buf()));
    }

    if list {
        let _ = file.files();
        printer::print_pipeline_warnings(file.packet.pipeline.errors());
        printer::print_packet_entries(&file);
        return Ok(());
    }

    let destination = destination.map(|p| p.to_string_lossy().into_owned());
    let accepted = file.extract(destination.as_deref(), force)?;
    if !accepted {
        printer::print_pipeline_warnings(file.packet.pipeline.errors());
        return Err(CliError::UnpackRejected(path.to_path_buf()));
    }

    let target = match destination {
        Some(destination) => destination,
        None => default_destination(&file)?,
    };
    println!("Extracted {} entries to '{}'.", file.packet.len(), target);
    printer::print_pipeline_warnings(file.packet.pipeline.errors());
    Ok(())
}

/// 默认解压目的地:save_to 下以文件名主干命名的目录。
fn default_destination(file: &File) -> Result<String, CliError> {
    let storage = file.storage_arc();
    let save_to = file
        .save_to
        .as_deref()
        .ok_or(FileError::from(ConfigurationError::MissingSaveTo))?;
    let filename = file
        .filename
        .as_deref()
        .ok_or(FileError::from(ConfigurationError::MissingFilename))?;
    Ok(storage.join(save_to, filename))
}
