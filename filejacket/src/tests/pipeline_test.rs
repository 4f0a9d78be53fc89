use std::sync::Arc;

use crate::content::source::ContentSource;
use crate::errors::ConfigurationError;
use crate::file::File;
use crate::mimetype::KnownMimeTyper;
use crate::pipeline::{
    Pipeline, PipelineContext, ProcessorBinding, ProcessorError, ProcessorKind, ProcessorOptions,
};
use crate::pipelines::comparer::ComparerKind;
use crate::pipelines::hasher::HasherKind;
use crate::pipelines::render::RenderKind;
use crate::storage::{LocalStorage, Storage};

fn storage() -> Arc<dyn Storage> {
    Arc::new(LocalStorage::new())
}

fn text_file(filename: Option<&str>, extension: &str, text: &str) -> File {
    let mut file = File::bare(storage(), KnownMimeTyper::new_arc());
    file.filename = filename.map(str::to_string);
    file.extension = Some(extension.to_string());
    file.set_content(ContentSource::Text(text.to_string()));
    file
}

fn render_binding() -> ProcessorBinding {
    ProcessorBinding::new(ProcessorKind::Render(RenderKind::Snippet))
}

#[test]
fn test_run_captures_errors_and_continues() {
    // 有扩展名没有文件名:校验通过,渲染阶段抛配置错误。
    let mut file = text_file(None, "txt", "body");
    file.save_to = Some("/tmp/jacket".to_string());
    let mut pipeline = Pipeline::new(vec![
        render_binding(),
        ProcessorBinding::new(ProcessorKind::Hash(HasherKind::Crc32)),
    ]);

    let mut ctx = PipelineContext::new();
    pipeline.run(&mut file, &mut ctx);

    // 1. 失败被记录,处理器名可追溯。
    assert_eq!(pipeline.errors().len(), 1);
    assert_eq!(pipeline.errors()[0].processor, "snippet-render");
    assert!(matches!(
        pipeline.errors()[0].error,
        ProcessorError::Configuration(ConfigurationError::MissingFilename)
    ));

    // 2. 失败按 false 处理,后面的散列器照常跑完。
    assert_eq!(pipeline.current_index(), Some(1));
    assert!(file.hashes.contains("crc32"));

    pipeline.clear_errors();
    assert!(pipeline.errors().is_empty());
}

#[test]
fn test_stopper_halts_on_truthy_result() {
    let mut file = text_file(Some("notes"), "txt", "snippet body");
    // 渲染族默认就是 stopper,命中真值后散列器不再运行。
    let mut pipeline = Pipeline::new(vec![
        render_binding(),
        ProcessorBinding::new(ProcessorKind::Hash(HasherKind::Sha256)),
    ]);

    let mut ctx = PipelineContext::new();
    pipeline.run(&mut file, &mut ctx);

    assert_eq!(pipeline.current_index(), Some(0));
    assert_eq!(pipeline.last_result(), Some(true));
    assert!(file.preview.is_some());
    assert!(file.hashes.is_empty());
}

#[test]
fn test_falsy_results_do_not_stop_without_stop_value() {
    // 扩展名不在摘录允许表里,两次渲染都返回 false,不触发停止。
    let mut file = text_file(Some("image"), "png", "not text");
    let mut pipeline = Pipeline::new(vec![render_binding(), render_binding()]);

    let mut ctx = PipelineContext::new();
    pipeline.run(&mut file, &mut ctx);

    assert_eq!(pipeline.current_index(), Some(1));
    assert_eq!(pipeline.last_result(), Some(false));
    assert!(file.preview.is_none());
    assert!(pipeline.errors().is_empty());
}

#[test]
fn test_stopper_with_false_stop_value_halts_on_falsy_result() {
    // 摘录渲染不认识 png:结果为 false,正好命中配置的停止值。
    let mut file = text_file(Some("image"), "png", "bytes");
    let mut pipeline = Pipeline::new(vec![
        render_binding().with_stop_value(Some(false)),
        ProcessorBinding::new(ProcessorKind::Hash(HasherKind::Sha256)),
    ]);

    let mut ctx = PipelineContext::new();
    pipeline.run(&mut file, &mut ctx);

    assert_eq!(pipeline.current_index(), Some(0));
    assert_eq!(pipeline.last_result(), Some(false));
    assert!(file.hashes.is_empty());
}

#[test]
fn test_call_site_options_win_over_binding_overrides() {
    let mut file = text_file(Some("notes"), "txt", "abcdefgh");
    let binding = render_binding().with_overrides(ProcessorOptions {
        snippet_budget: Some(4),
        ..ProcessorOptions::default()
    });
    let mut pipeline = Pipeline::new(vec![binding]);

    // 1. 调用方给出的预算覆盖绑定自带的。
    let mut ctx = PipelineContext::with_options(ProcessorOptions {
        snippet_budget: Some(2),
        ..ProcessorOptions::default()
    });
    pipeline.run(&mut file, &mut ctx);
    assert_eq!(file.preview.as_ref().unwrap().length, 2);

    // 2. 调用方不给时回落到绑定覆盖。
    let mut ctx = PipelineContext::new();
    pipeline.run(&mut file, &mut ctx);
    assert_eq!(file.preview.as_ref().unwrap().length, 4);
}

#[test]
fn test_evaluate_short_circuits_on_first_disagreement() {
    let mut subject = File::bare(storage(), KnownMimeTyper::new_arc());
    subject.length = 5;
    let mut same = File::bare(storage(), KnownMimeTyper::new_arc());
    same.length = 5;
    let mut different = File::bare(storage(), KnownMimeTyper::new_arc());
    different.length = 6;

    let pipeline = Pipeline::new(vec![ProcessorBinding::new(ProcessorKind::Compare(
        ComparerKind::Size,
    ))]);

    assert_eq!(pipeline.evaluate(&subject, &[&same, &different]), Some(false));
    assert_eq!(pipeline.evaluate(&subject, &[&same, &same]), Some(true));
}

#[test]
fn test_evaluate_verdict_is_last_comparer() {
    // 尺寸一致但内容未缓存:数据比较器答不出来,整体结论是证据不足。
    let mut subject = text_file(Some("a"), "txt", "abc");
    subject.length = 3;
    let mut candidate = text_file(Some("b"), "txt", "abc");
    candidate.length = 3;

    let pipeline = Pipeline::new(vec![
        ProcessorBinding::new(ProcessorKind::Compare(ComparerKind::Size)),
        ProcessorBinding::new(ProcessorKind::Compare(ComparerKind::Data)),
    ]);

    assert_eq!(pipeline.evaluate(&subject, &[&candidate]), None);
}

#[test]
fn test_evaluate_stops_on_configured_stop_value() {
    let mut subject = File::bare(storage(), KnownMimeTyper::new_arc());
    subject.filename = Some("same".to_string());
    subject.extension = Some("txt".to_string());
    subject.length = 5;
    let mut candidate = File::bare(storage(), KnownMimeTyper::new_arc());
    candidate.filename = Some("same".to_string());
    candidate.extension = Some("txt".to_string());
    candidate.length = 9;

    // 比较族默认停止值是 Some(false):尺寸断定不同后,名字比较器不再运行。
    let pipeline = Pipeline::new(vec![
        ProcessorBinding::new(ProcessorKind::Compare(ComparerKind::Size)),
        ProcessorBinding::new(ProcessorKind::Compare(ComparerKind::Name)),
    ]);
    assert_eq!(pipeline.evaluate(&subject, &[&candidate]), Some(false));

    // 尺寸一致时链条走到名字比较器,得到相同的结论。
    candidate.length = 5;
    assert_eq!(pipeline.evaluate(&subject, &[&candidate]), Some(true));
}

#[test]
fn test_from_ids_applies_family_contracts() {
    let pipeline = Pipeline::from_ids(&["sha256-hasher", "zip-package"]).unwrap();
    // 散列器默认跑完整条链,包处理器命中格式后停止。
    assert!(!pipeline.bindings()[0].stopper);
    assert!(pipeline.bindings()[1].stopper);

    assert!(matches!(
        Pipeline::from_ids(&["no-such-processor"]),
        Err(ConfigurationError::UnknownRegistryId(_))
    ));
}

#[test]
fn test_clone_keeps_bindings_but_drops_run_state() {
    let mut file = text_file(None, "txt", "body");
    let mut pipeline = Pipeline::new(vec![render_binding()]);
    let mut ctx = PipelineContext::new();
    pipeline.run(&mut file, &mut ctx);
    assert!(!pipeline.errors().is_empty());
    assert!(pipeline.last_result().is_some());

    let copy = pipeline.clone();
    assert_eq!(copy.len(), 1);
    assert!(copy.errors().is_empty());
    assert_eq!(copy.last_result(), None);
    assert_eq!(copy.current_index(), None);
}
