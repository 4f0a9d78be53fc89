//! Render processors that derive preview representations from content.
//!
//! A render run reads the head of the content and produces a small derived
//! file object attached to the host as its preview or thumbnail. Extension
//! validation failing is an expected outcome, swallowed into a `false`
//! processor result; everything else surfaces.
//!
//! // 渲染器:截取内容开头生成派生文件,挂到宿主的 preview/thumbnail 上。
//! // 扩展名不符是预期情况,吞成 false;其余错误照常上抛。

use serde::{Deserialize, Serialize};

use crate::content::source::ContentSource;
use crate::errors::{ConfigurationError, ValidationError};
use crate::file::File;
use crate::pipeline::{PipelineContext, ProcessorError, ProcessorOptions};

/// Which derived representation a render run produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderTarget {
    #[default]
    Preview,
    Thumbnail,
}

/// Text-like extensions the snippet render accepts.
const SNIPPET_EXTENSIONS: &[&str] = &[
    "css", "csv", "htm", "html", "js", "json", "log", "md", "toml", "txt", "xml", "yaml", "yml",
];

const DEFAULT_PREVIEW_BYTES: usize = 512;
const DEFAULT_THUMBNAIL_BYTES: usize = 128;

/// Representation builder runnable in a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    /// Head-of-content excerpt for text-like files.
    Snippet,
}

impl RenderKind {
    pub fn registry_id(&self) -> &'static str {
        match self {
            RenderKind::Snippet => "snippet-render",
        }
    }

    pub fn from_registry_id(id: &str) -> Option<RenderKind> {
        match id {
            "snippet-render" => Some(RenderKind::Snippet),
            _ => None,
        }
    }

    /// Checks that this render can work with the file's extension.
    pub fn validate(&self, file: &File) -> Result<(), ValidationError> {
        match self {
            RenderKind::Snippet => {
                let extension = file.extension.clone().unwrap_or_default();
                if !SNIPPET_EXTENSIONS.contains(&extension.as_str()) {
                    return Err(ValidationError::ExtensionNotAllowed {
                        extension,
                        processor: "snippet-render",
                    });
                }
                Ok(())
            }
        }
    }

    /// Builds the derived representation and attaches it to the host.
    ///
    /// // 从内容开头截取片段,构造派生文件并挂到宿主,登记动作完成。
    pub fn render(
        &self,
        file: &mut File,
        options: &ProcessorOptions,
    ) -> Result<(), ProcessorError> {
        let target = options.render_target.unwrap_or_default();
        let limit = options.snippet_budget.unwrap_or(match target {
            RenderTarget::Preview => DEFAULT_PREVIEW_BYTES,
            RenderTarget::Thumbnail => DEFAULT_THUMBNAIL_BYTES,
        });

        let stem = file
            .filename
            .clone()
            .ok_or(ConfigurationError::MissingFilename)?;

        // 1. 读取内容开头一段作为摘录。
        let content = file
            .content
            .as_mut()
            .ok_or(ConfigurationError::MissingContent)?;
        content.reset()?;
        let snippet = content.read(Some(limit.max(1)))?.unwrap_or_default();
        content.reset()?;

        // 截断可能落在多字节字符中间,去掉结尾的替换符。
        let mut text = String::from_utf8_lossy(&snippet).into_owned();
        while text.ends_with('\u{FFFD}') {
            text.pop();
        }

        // 2. 构造派生文件:<主干>.preview.txt 或 <主干>.thumbnail.txt。
        let suffix = match target {
            RenderTarget::Preview => "preview",
            RenderTarget::Thumbnail => "thumbnail",
        };
        let mut derived = File::bare(file.storage_arc(), file.mimetyper_arc());
        derived.filename = Some(format!("{stem}.{suffix}"));
        derived.extension = Some("txt".to_string());
        derived.mime_type = Some("text/plain".to_string());
        derived.file_type = Some("text".to_string());
        derived.length = text.len() as u64;
        derived.meta.internal = true;
        derived.set_content(ContentSource::Text(text));

        // 3. 挂到宿主并登记动作完成。
        match target {
            RenderTarget::Preview => {
                file.preview = Some(Box::new(derived));
                file.actions.previewed();
            }
            RenderTarget::Thumbnail => {
                file.thumbnail = Some(Box::new(derived));
                file.actions.thumbnailed();
            }
        }
        Ok(())
    }

    /// Pipeline entry point. A failed extension validation is consumed
    /// into a `false` result instead of an error.
    pub(crate) fn process(
        &self,
        file: &mut File,
        options: &ProcessorOptions,
        _ctx: &mut PipelineContext<'_>,
    ) -> Result<bool, ProcessorError> {
        if self.validate(file).is_err() {
            return Ok(false);
        }
        self.render(file, options)?;
        Ok(true)
    }
}
