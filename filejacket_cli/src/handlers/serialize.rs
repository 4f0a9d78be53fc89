use std::fs;
use std::path::{Path, PathBuf};

use filejacket::serializer;
use filejacket::SerializeOptions;

use crate::core::helpers::load_file;
use crate::errors::CliError;

/// Main handler for the `serialize` command.
/// Dumps the file object as JSON, optionally embedding the content as
/// base64, to stdout or to an output file.
//
// // `serialize` 命令的主处理器。
// // 把文件对象导出为 JSON,可选内嵌 base64 内容,写到
// // 标准输出或指定文件。
pub fn handle_serialize(
    path: &Path,
    content: bool,
    pretty: bool,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let mut file = load_file(path)?;

    // 包文件先列出条目,让包模型一起进入序列化结果。
    if file.meta.packed {
        let _ = file.files();
    }

    let options = SerializeOptions {
        include_content: content,
    };
    let text = if pretty {
        let value = serializer::to_value(&mut file, &options)?;
        serde_json::to_string_pretty(&value)?
    } else {
        serializer::to_json(&mut file, &options)?
    };

    match output {
        Some(output) => {
            fs::write(&output, text)?;
            println!("Serialized '{}' to '{}'.", path.display(), output.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}
