use std::path::Path;

use filejacket::pipelines::hasher::HasherKind;
use filejacket::{File, FileError};

use crate::core::helpers::load_file;
use crate::errors::CliError;
use crate::ui::formatter::display_name;
use crate::ui::printer;

/// Main handler for the `hash` command.
/// Without flags it runs the digest chain and prints the results;
/// `--check` instead verifies the content against the digests recorded
/// in manifests next to the file.
//
// // `hash` 命令的主处理器。
// // 默认运行摘要链并打印结果;`--check` 改为校验内容与
// // 文件旁清单里记录的摘要是否一致。
pub fn handle_hash(path: &Path, check: bool, force: bool, write: bool) -> Result<(), CliError> {
    let mut file = load_file(path)?;

    if check {
        return check_digests(&mut file, path);
    }

    file.generate_hashes(force);
    printer::print_pipeline_warnings(file.pipelines.hash.errors());
    if file.hashes.is_empty() {
        println!("No digests could be generated for '{}'.", display_name(&file));
        return Ok(());
    }

    println!("Digests for '{}':", display_name(&file));
    printer::print_digests(&file);

    if write {
        file.hashes.save(true)?;
        println!(
            "Wrote {} digest manifest(s) next to the file.",
            file.hashes.len()
        );
    }
    Ok(())
}

/// Verifies every recorded digest against the content, one by one.
/// A single mismatch marks the content as damaged; a run where nothing
/// could be verified is reported as an error too.
//
// // 逐一校验记录在案的摘要;任何一个不符就判定内容损坏,
// // 一个都没能校验上同样按错误上报。
fn check_digests(file: &mut File, path: &Path) -> Result<(), CliError> {
    if file.hashes.is_empty() {
        return Err(CliError::NoDigests(path.to_path_buf()));
    }

    println!(
        "Checking {} recorded digest(s) against the content...",
        file.hashes.len()
    );

    let names: Vec<String> = file.hashes.names().map(str::to_string).collect();
    let mut verified = false;
    let mut damaged = false;
    for name in names {
        let Some(hasher) = HasherKind::from_name(&name) else {
            continue;
        };
        match hasher.check_hash(file, None).map_err(FileError::from)? {
            Some(true) => {
                verified = true;
                println!("  {:<8} OK", name);
            }
            Some(false) => {
                damaged = true;
                println!("  {:<8} MISMATCH", name);
            }
            None => println!("  {:<8} (not verifiable)", name),
        }
    }

    if damaged {
        return Err(CliError::IntegrityFailure(path.to_path_buf()));
    }
    if !verified {
        return Err(CliError::NoDigests(path.to_path_buf()));
    }
    println!("Content is intact.");
    Ok(())
}
