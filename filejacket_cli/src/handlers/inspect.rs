use std::mem;
use std::path::Path;

use filejacket::pipelines::render::RenderTarget;
use filejacket::{File, PipelineContext, ProcessorOptions};

use crate::core::helpers::load_file;
use crate::errors::CliError;
use crate::ui::printer;

/// Main handler for the `inspect` command.
/// Builds the file object from disk and prints the extracted aggregate.
/// Failures of individual attribute sources show up as warnings rather
/// than aborting the command.
//
// // `inspect` 命令的主处理器。
// // 从磁盘构建文件对象并打印抽取结果;单个属性源的失败
// // 只作为警告显示,不会中断命令。
pub fn handle_inspect(path: &Path, preview: bool) -> Result<(), CliError> {
    let mut file = load_file(path)?;

    printer::print_pipeline_warnings(file.pipelines.extract.errors());
    printer::print_file_details(&file);

    if preview {
        print_preview(&mut file)?;
    }
    Ok(())
}

/// Runs the render chain for a preview excerpt and prints it.
//
// // 运行渲染链生成预览摘录并打印;渲染器不认识的类型会
// // 拒绝渲染,此时只提示没有预览。
fn print_preview(file: &mut File) -> Result<(), CliError> {
    let mut ctx = PipelineContext::with_options(ProcessorOptions {
        render_target: Some(RenderTarget::Preview),
        ..ProcessorOptions::default()
    });
    let mut render = mem::take(&mut file.pipelines.render);
    render.run(file, &mut ctx);
    file.pipelines.render = render;

    let Some(text) = preview_text(file)? else {
        println!("No preview is available for this file type.");
        return Ok(());
    };
    println!("--- Preview ---");
    println!("{}", text);
    println!("---------------");
    Ok(())
}

/// 取出渲染好的预览文本,没有就返回 None。
fn preview_text(file: &mut File) -> Result<Option<String>, CliError> {
    let Some(preview) = file.preview.as_mut() else {
        return Ok(None);
    };
    let Some(content) = preview.content_controller_mut() else {
        return Ok(None);
    };
    let mut bytes: Vec<u8> = Vec::new();
    for block in content.blocks() {
        bytes.extend(block?);
    }
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}
