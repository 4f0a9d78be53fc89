use std::path::PathBuf;

/// Raised when a required collaborator or field was never set up.
///
/// Configuration problems are fatal for the call that hits them and are
/// never retried, in contrast to validation problems which a pipeline
/// absorbs into a `false` result.
///
/// // 配置错误:缺少必要的协作对象或字段,属于致命错误,不会被流水线吸收。
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("No path was set for this file, the operation needs one")]
    MissingPath,

    #[error("No save-to directory was set for this file")]
    MissingSaveTo,

    #[error("No filename was set for this file")]
    MissingFilename,

    #[error("No extension was set for this file")]
    MissingExtension,

    #[error("The path of this file points to a directory, not a file")]
    PathIsDirectory,

    #[error("No semantic type was resolved for this file yet")]
    MissingFileType,

    #[error("The '{0}' pipeline is empty or was never configured")]
    MissingPipeline(&'static str),

    #[error("Required input '{0}' was not provided for this processor")]
    MissingInput(&'static str),

    #[error("No content was attached to this file")]
    MissingContent,

    #[error(
        "The active cache policy cannot materialize content; \
         use the buffer accessor instead"
    )]
    CachelessMaterialization,

    #[error("Unknown registry identifier '{0}'")]
    UnknownRegistryId(String),
}

/// Recoverable rejection of an input, e.g. an extension outside a
/// processor's allow-list. A pipeline turns these into a `false`
/// processor result instead of surfacing them.
///
/// // 校验错误:可恢复,流水线会把它转换为 false 结果而不是抛出。
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Extension '{extension}' is not handled by {processor}")]
    ExtensionNotAllowed {
        extension: String,
        processor: &'static str,
    },

    #[error("Extension '{extension}' is not registered for any known mimetype")]
    UnknownExtension { extension: String },

    #[error(
        "Extension '{extension}' does not belong to the known mimetype \
         '{mime_type}' of this file"
    )]
    MimetypeMismatch {
        extension: String,
        mime_type: String,
    },

    #[error("A complete filename cannot be empty")]
    EmptyFilename,
}

/// A call that the current policy or state forbids outright. These are
/// fatal for the call, always surfaced, never downgraded.
///
/// // 操作被拒绝:对本次调用是致命的,永远直接上抛,不做降级处理。
#[derive(Debug, thiserror::Error)]
#[error("Operation {operation} is not allowed: {reason}")]
pub struct OperationNotAllowedError {
    pub operation: &'static str,
    pub reason: String,
}

impl OperationNotAllowedError {
    pub fn new(operation: &'static str, reason: impl Into<String>) -> Self {
        OperationNotAllowedError {
            operation,
            reason: reason.into(),
        }
    }
}

/// Raised when independent sources disagree about the same fact, e.g.
/// two checksum manifests listing different digests for one filename.
/// Ambiguity is never silently resolved.
///
/// // 歧义错误:多个来源对同一事实给出不同答案,永远不自动裁决。
#[derive(Debug, thiserror::Error)]
#[error(
    "Multiple sources disagree about '{subject}': \
     {candidates:?} (from {origins:?})"
)]
pub struct AmbiguityError {
    pub subject: String,
    pub candidates: Vec<String>,
    pub origins: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_not_allowed_display() {
        let error = OperationNotAllowedError::new("save", "file already exists");
        assert_eq!(
            error.to_string(),
            "Operation save is not allowed: file already exists"
        );
    }

    #[test]
    fn test_ambiguity_lists_all_candidates() {
        let error = AmbiguityError {
            subject: "img.png".to_string(),
            candidates: vec!["abc".to_string(), "def".to_string()],
            origins: vec![PathBuf::from("a.sha256"), PathBuf::from("b.sha256")],
        };
        let rendered = error.to_string();
        assert!(rendered.contains("img.png"));
        assert!(rendered.contains("abc"));
        assert!(rendered.contains("def"));
    }
}
