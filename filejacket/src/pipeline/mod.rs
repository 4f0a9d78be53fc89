//! Pipeline engine that chains processors over a file object.
//!
//! A [`Pipeline`] holds an ordered list of [`ProcessorBinding`] entries. Each
//! binding pairs a processor with its own option overrides and a stopper
//! contract. Failures raised by a processor are captured into the pipeline's
//! error list and the run continues with the next binding.
//!
//! // 处理器按顺序执行,stopper 命中停止值时提前结束,单个处理器报错不会中断整条流水线。

pub mod registry;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::ContentError;
use crate::errors::{
    AmbiguityError, ConfigurationError, OperationNotAllowedError, ValidationError,
};
use crate::file::File;
use crate::pipelines::extractor::package::ExtractError;
use crate::pipelines::hasher::{HashError, HashSession};
use crate::pipelines::render::RenderTarget;
use crate::pipelines::renamer::{RenameError, RenameSession};

pub use registry::{ProcessorFamily, ProcessorKind};

/// Failure raised by a single processor step.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotAllowed(#[from] OperationNotAllowedError),
    #[error(transparent)]
    Ambiguity(#[from] AmbiguityError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error(transparent)]
    Rename(#[from] RenameError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Attribute the renamer family resolves the working directory from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathTarget {
    /// Directory portion of the file's full path.
    #[default]
    Path,
    /// The directory the file will be saved to.
    SaveTo,
}

/// Typed options consumed by processors.
///
/// Every field is optional. A binding can carry its own overrides and the
/// call site can pass another set; [`ProcessorOptions::merged_over`] resolves
/// them with the call-site value winning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessorOptions {
    /// Allow extractors to overwrite fields that are already populated.
    pub overrider: Option<bool>,
    /// HTTP-header-like map consumed by the metadata extractors.
    pub headers: Option<BTreeMap<String, String>>,
    /// Candidate URLs consumed by the URL extractors.
    pub urls: Option<Vec<String>>,
    /// Let hashers look for a digest in a sidecar manifest before computing.
    pub try_loading_from_file: Option<bool>,
    /// Scan the whole directory for manifest files instead of the known names.
    pub full_check: Option<bool>,
    /// Walk parent directories until a manifest is found or the root is hit.
    pub full_loop_check: Option<bool>,
    /// Digest to verify against instead of the one recorded on the file.
    pub compare_to_digest: Option<String>,
    /// Directory source used by renamers.
    pub path_target: Option<PathTarget>,
    /// Replaces the session's reserved names for this invocation.
    pub reserved_names: Option<Vec<String>>,
    /// Destination directory for package decompression.
    pub decompress_to: Option<String>,
    /// Use the last URL path segment even when no known extension matched.
    pub url_fallback: Option<bool>,
    /// Byte budget for snippet renderers.
    pub snippet_budget: Option<usize>,
    /// Which derived representation a render processor should produce.
    pub render_target: Option<RenderTarget>,
}

impl ProcessorOptions {
    /// Merges two option sets. Fields set on `self` win over `base`.
    ///
    /// // 合并规则:调用方参数优先于绑定自身的覆盖项。
    pub fn merged_over(&self, base: &ProcessorOptions) -> ProcessorOptions {
        ProcessorOptions {
            overrider: self.overrider.or(base.overrider),
            headers: self.headers.clone().or_else(|| base.headers.clone()),
            urls: self.urls.clone().or_else(|| base.urls.clone()),
            try_loading_from_file: self.try_loading_from_file.or(base.try_loading_from_file),
            full_check: self.full_check.or(base.full_check),
            full_loop_check: self.full_loop_check.or(base.full_loop_check),
            compare_to_digest: self
                .compare_to_digest
                .clone()
                .or_else(|| base.compare_to_digest.clone()),
            path_target: self.path_target.or(base.path_target),
            reserved_names: self
                .reserved_names
                .clone()
                .or_else(|| base.reserved_names.clone()),
            decompress_to: self
                .decompress_to
                .clone()
                .or_else(|| base.decompress_to.clone()),
            url_fallback: self.url_fallback.or(base.url_fallback),
            snippet_budget: self.snippet_budget.or(base.snippet_budget),
            render_target: self.render_target.or(base.render_target),
        }
    }
}

/// One processor plus its stopper contract and per-binding overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorBinding {
    pub kind: ProcessorKind,
    /// Whether a matching result halts the pipeline at this binding.
    pub stopper: bool,
    /// Result value that triggers the halt. Unset means any truthy result.
    pub stop_value: Option<bool>,
    #[serde(default)]
    pub overrides: ProcessorOptions,
}

impl ProcessorBinding {
    /// Creates a binding with the stopper contract the processor family
    /// declares by default.
    pub fn new(kind: ProcessorKind) -> ProcessorBinding {
        ProcessorBinding {
            stopper: kind.default_stopper(),
            stop_value: kind.default_stop_value(),
            overrides: ProcessorOptions::default(),
            kind,
        }
    }

    pub fn with_overrides(mut self, overrides: ProcessorOptions) -> ProcessorBinding {
        self.overrides = overrides;
        self
    }

    pub fn with_stop_value(mut self, stop_value: Option<bool>) -> ProcessorBinding {
        self.stop_value = stop_value;
        self
    }

    pub fn registry_id(&self) -> &'static str {
        self.kind.registry_id()
    }

    fn matches_stop(&self, result: bool) -> bool {
        match self.stop_value {
            Some(stop_value) => result == stop_value,
            None => result,
        }
    }
}

/// Captured failure of one binding, kept in the pipeline's error list.
#[derive(Debug)]
pub struct ProcessorFailure {
    /// Registry id of the processor that failed.
    pub processor: &'static str,
    pub error: ProcessorError,
}

/// Mutable state shared with processors for the duration of one run.
///
/// Sessions replace what used to be hidden global registries: callers that
/// need rename reservations or hash caches to survive across several files
/// pass the same session into every run.
#[derive(Default)]
pub struct PipelineContext<'a> {
    /// Call-site options, merged over each binding's overrides.
    pub options: ProcessorOptions,
    pub rename_session: Option<&'a mut RenameSession>,
    pub hash_session: Option<&'a mut HashSession>,
}

impl<'a> PipelineContext<'a> {
    pub fn new() -> PipelineContext<'a> {
        PipelineContext::default()
    }

    pub fn with_options(options: ProcessorOptions) -> PipelineContext<'a> {
        PipelineContext {
            options,
            ..PipelineContext::default()
        }
    }
}

/// Ordered sequence of processor bindings.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Pipeline {
    bindings: Vec<ProcessorBinding>,
    #[serde(skip)]
    errors: Vec<ProcessorFailure>,
    #[serde(skip)]
    last_result: Option<bool>,
    #[serde(skip)]
    current: Option<usize>,
}

impl Clone for Pipeline {
    /// Clones the binding list only. Errors and run state belong to the
    /// pipeline instance that produced them and do not travel with a copy.
    fn clone(&self) -> Pipeline {
        Pipeline::new(self.bindings.clone())
    }
}

impl Pipeline {
    pub fn new(bindings: Vec<ProcessorBinding>) -> Pipeline {
        Pipeline {
            bindings,
            errors: Vec::new(),
            last_result: None,
            current: None,
        }
    }

    /// Builds a pipeline from registry ids, using each processor's default
    /// stopper contract.
    pub fn from_ids(ids: &[&str]) -> Result<Pipeline, ConfigurationError> {
        let mut bindings = Vec::with_capacity(ids.len());
        for id in ids {
            bindings.push(ProcessorBinding::new(ProcessorKind::resolve(id)?));
        }
        Ok(Pipeline::new(bindings))
    }

    pub fn bindings(&self) -> &[ProcessorBinding] {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut [ProcessorBinding] {
        &mut self.bindings
    }

    pub fn push(&mut self, binding: ProcessorBinding) {
        self.bindings.push(binding);
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Result of the binding that last ran.
    pub fn last_result(&self) -> Option<bool> {
        self.last_result
    }

    /// Binding that last ran, if any run happened yet.
    pub fn current(&self) -> Option<&ProcessorBinding> {
        self.current.and_then(|index| self.bindings.get(index))
    }

    /// Position of the binding that last ran.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Failures captured so far. The list accumulates across runs until
    /// [`Pipeline::clear_errors`] is called.
    pub fn errors(&self) -> &[ProcessorFailure] {
        &self.errors
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Runs every binding in order against `file`.
    ///
    /// Call-site options in `ctx` win over per-binding overrides. A stopper
    /// binding halts the run when its result matches the configured stop
    /// value, or any truthy result when no stop value is set. Errors are
    /// captured, counted as a falsy result and the run continues.
    pub fn run(&mut self, file: &mut File, ctx: &mut PipelineContext<'_>) {
        for index in 0..self.bindings.len() {
            let binding = self.bindings[index].clone();
            let options = ctx.options.merged_over(&binding.overrides);
            self.current = Some(index);

            // 1. 执行处理器,出错时记录到错误列表并视为 false 继续。
            let result = match binding.kind.execute(file, &options, ctx) {
                Ok(result) => result,
                Err(error) => {
                    log::warn!(
                        "processor {} failed: {error}",
                        binding.registry_id()
                    );
                    self.errors.push(ProcessorFailure {
                        processor: binding.registry_id(),
                        error,
                    });
                    false
                }
            };

            // 2. 记录本次结果,再判断 stopper 是否命中停止值。
            self.last_result = Some(result);
            if binding.stopper && binding.matches_stop(result) {
                break;
            }
        }
    }

    /// Evaluates the comparer bindings of this pipeline against a list of
    /// candidates without mutating anything.
    ///
    /// Each comparer checks `subject` against every candidate, short
    /// circuiting on the first result that is not a definite "same". `None`
    /// means the chain had not enough data to decide; it never triggers a
    /// stop value match, so the next comparer still gets a chance.
    pub fn evaluate(&self, subject: &File, candidates: &[&File]) -> Option<bool> {
        let mut verdict: Option<bool> = None;

        for binding in &self.bindings {
            if binding.kind.family() != ProcessorFamily::Compare {
                continue;
            }

            let mut result = Some(true);
            for candidate in candidates {
                let step = binding.kind.compare(subject, candidate);
                if step != Some(true) {
                    result = step;
                    break;
                }
            }

            verdict = result;
            if binding.stopper {
                let stops = match (result, binding.stop_value) {
                    (Some(value), Some(stop_value)) => value == stop_value,
                    (Some(value), None) => value,
                    (None, _) => false,
                };
                if stops {
                    break;
                }
            }
        }

        verdict
    }
}
