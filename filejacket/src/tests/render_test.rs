use std::sync::Arc;

use crate::content::source::ContentSource;
use crate::file::File;
use crate::mimetype::KnownMimeTyper;
use crate::pipeline::{PipelineContext, ProcessorOptions};
use crate::pipelines::render::{RenderKind, RenderTarget};
use crate::storage::{LocalStorage, Storage};

fn storage() -> Arc<dyn Storage> {
    Arc::new(LocalStorage::new())
}

fn text_file(extension: &str, text: &str) -> File {
    let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
    file.filename = Some("notes".to_string());
    file.extension = Some(extension.to_string());
    file.set_content(ContentSource::Text(text.to_string()));
    file
}

#[test]
fn test_snippet_preview_defaults() {
    let mut file = text_file("txt", "short body");
    let mut ctx = PipelineContext::new();

    let produced = RenderKind::Snippet
        .process(&mut file, &ProcessorOptions::default(), &mut ctx)
        .unwrap();
    assert!(produced);

    let preview = file.preview.as_ref().unwrap();
    assert_eq!(preview.filename.as_deref(), Some("notes.preview"));
    assert_eq!(preview.extension.as_deref(), Some("txt"));
    assert_eq!(preview.mime_type.as_deref(), Some("text/plain"));
    assert_eq!(preview.length, 10);
    assert!(preview.meta.internal);
    assert!(file.actions.was_previewed);
    assert!(!file.actions.preview);
}

#[test]
fn test_snippet_budget_truncates() {
    let mut file = text_file("md", "abcdefghij");
    let mut ctx = PipelineContext::new();
    let options = ProcessorOptions {
        snippet_budget: Some(4),
        ..ProcessorOptions::default()
    };

    RenderKind::Snippet.process(&mut file, &options, &mut ctx).unwrap();
    assert_eq!(file.preview.as_ref().unwrap().length, 4);
}

#[test]
fn test_snippet_thumbnail_target() {
    let mut file = text_file("log", "line one\nline two");
    let mut ctx = PipelineContext::new();
    let options = ProcessorOptions {
        render_target: Some(RenderTarget::Thumbnail),
        ..ProcessorOptions::default()
    };

    RenderKind::Snippet.process(&mut file, &options, &mut ctx).unwrap();

    assert!(file.preview.is_none());
    let thumbnail = file.thumbnail.as_ref().unwrap();
    assert_eq!(thumbnail.filename.as_deref(), Some("notes.thumbnail"));
    assert!(file.actions.was_thumbnailed);
}

#[test]
fn test_snippet_refuses_foreign_extension() {
    let mut file = text_file("png", "not really an image");
    let mut ctx = PipelineContext::new();

    // 扩展名不在允许表里是预期情况,返回 false 而不是错误。
    let produced = RenderKind::Snippet
        .process(&mut file, &ProcessorOptions::default(), &mut ctx)
        .unwrap();
    assert!(!produced);
    assert!(file.preview.is_none());
}

#[test]
fn test_snippet_strips_torn_multibyte_tail() {
    // 每个汉字占三字节,预算 4 会把第二个字切成半截。
    let mut file = text_file("txt", "你好世界");
    let mut ctx = PipelineContext::new();
    let options = ProcessorOptions {
        snippet_budget: Some(4),
        ..ProcessorOptions::default()
    };

    RenderKind::Snippet.process(&mut file, &options, &mut ctx).unwrap();

    let preview = file.preview.as_deref_mut().unwrap();
    assert_eq!(preview.length, 3);
    let buffer = preview
        .content_controller_mut()
        .unwrap()
        .content_as_buffer()
        .unwrap();
    let mut data = Vec::new();
    buffer.read_to_end(&mut data).unwrap();
    assert_eq!(data, "你".as_bytes());
}

#[test]
fn test_snippet_resets_host_cursor() {
    let mut file = text_file("txt", "full body stays readable");
    let mut ctx = PipelineContext::new();
    RenderKind::Snippet
        .process(&mut file, &ProcessorOptions::default(), &mut ctx)
        .unwrap();

    // 渲染读过开头之后,宿主内容必须仍可从头读取。
    let content = file.content_controller_mut().unwrap();
    let buffer = content.content_as_buffer().unwrap();
    let mut data = Vec::new();
    buffer.read_to_end(&mut data).unwrap();
    assert_eq!(data, b"full body stays readable");
}
