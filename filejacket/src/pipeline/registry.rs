//! Closed registry of processors addressable by stable string ids.
//!
//! Serialized pipelines store nothing but these ids; deserializing
//! resolves each id back to its typed processor. Adding a processor
//! means adding an enum variant here, not registering into a mutable
//! global table.
//!
//! // 处理器注册表:封闭枚举,按稳定字符串 id 解析。序列化只存 id,
//! // 新处理器靠加变体而不是往全局表里注册。

use std::fmt;

use serde::de::{self, Deserialize, Deserializer};
use serde::{Serialize, Serializer};

use crate::errors::{ConfigurationError, OperationNotAllowedError};
use crate::file::File;
use crate::pipeline::{PipelineContext, ProcessorError, ProcessorOptions};
use crate::pipelines::comparer::ComparerKind;
use crate::pipelines::extractor::ExtractorKind;
use crate::pipelines::extractor::package::PackageExtractorKind;
use crate::pipelines::hasher::HasherKind;
use crate::pipelines::renamer::RenamerKind;
use crate::pipelines::render::RenderKind;

/// The processor families a pipeline can mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorFamily {
    /// Attribute sources filling in file fields.
    Extract,
    /// Archive listers and decompressors.
    Package,
    /// Same-file deciders, run through `evaluate` only.
    Compare,
    /// Digest generators.
    Hash,
    /// Free-name finders.
    Rename,
    /// Derived-representation builders.
    Render,
}

/// One concrete processor, typed by family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorKind {
    Extract(ExtractorKind),
    Package(PackageExtractorKind),
    Compare(ComparerKind),
    Hash(HasherKind),
    Rename(RenamerKind),
    Render(RenderKind),
}

impl ProcessorKind {
    /// The stable identifier this processor serializes as.
    pub fn registry_id(&self) -> &'static str {
        match self {
            ProcessorKind::Extract(kind) => kind.registry_id(),
            ProcessorKind::Package(kind) => kind.registry_id(),
            ProcessorKind::Compare(kind) => kind.registry_id(),
            ProcessorKind::Hash(kind) => kind.registry_id(),
            ProcessorKind::Rename(kind) => kind.registry_id(),
            ProcessorKind::Render(kind) => kind.registry_id(),
        }
    }

    /// Looks an id up across every family.
    pub fn resolve(id: &str) -> Result<ProcessorKind, ConfigurationError> {
        if let Some(kind) = ExtractorKind::from_registry_id(id) {
            return Ok(ProcessorKind::Extract(kind));
        }
        if let Some(kind) = PackageExtractorKind::from_registry_id(id) {
            return Ok(ProcessorKind::Package(kind));
        }
        if let Some(kind) = ComparerKind::from_registry_id(id) {
            return Ok(ProcessorKind::Compare(kind));
        }
        if let Some(kind) = HasherKind::from_registry_id(id) {
            return Ok(ProcessorKind::Hash(kind));
        }
        if let Some(kind) = RenamerKind::from_registry_id(id) {
            return Ok(ProcessorKind::Rename(kind));
        }
        if let Some(kind) = RenderKind::from_registry_id(id) {
            return Ok(ProcessorKind::Render(kind));
        }
        Err(ConfigurationError::UnknownRegistryId(id.to_string()))
    }

    pub fn family(&self) -> ProcessorFamily {
        match self {
            ProcessorKind::Extract(_) => ProcessorFamily::Extract,
            ProcessorKind::Package(_) => ProcessorFamily::Package,
            ProcessorKind::Compare(_) => ProcessorFamily::Compare,
            ProcessorKind::Hash(_) => ProcessorFamily::Hash,
            ProcessorKind::Rename(_) => ProcessorFamily::Rename,
            ProcessorKind::Render(_) => ProcessorFamily::Render,
        }
    }

    /// Whether a binding of this family halts its pipeline by default.
    ///
    /// Extractors and hashers are additive, every step should get its
    /// chance; the other families look for one winning processor.
    ///
    /// // 抽取器和哈希器是累加式的,默认跑完整条链;其余家族找到一个
    /// // 能干活的就停。
    pub fn default_stopper(&self) -> bool {
        match self.family() {
            ProcessorFamily::Extract | ProcessorFamily::Hash => false,
            ProcessorFamily::Package
            | ProcessorFamily::Compare
            | ProcessorFamily::Rename
            | ProcessorFamily::Render => true,
        }
    }

    /// Result value that triggers the default halt. Comparers stop on
    /// a definite "different"; the other stopping families stop on the
    /// first success.
    pub fn default_stop_value(&self) -> Option<bool> {
        match self.family() {
            ProcessorFamily::Compare => Some(false),
            _ => None,
        }
    }

    /// Runs the processor against `file`.
    ///
    /// Comparers are excluded: they answer three-way questions over a
    /// subject and candidates, which the mutating run loop cannot
    /// express. [`crate::pipeline::Pipeline::evaluate`] is their entry
    /// point.
    pub fn execute(
        &self,
        file: &mut File,
        options: &ProcessorOptions,
        ctx: &mut PipelineContext<'_>,
    ) -> Result<bool, ProcessorError> {
        match self {
            ProcessorKind::Extract(kind) => kind.process(file, options, ctx),
            ProcessorKind::Package(kind) => kind.process(file, options, ctx),
            ProcessorKind::Hash(kind) => kind.process(file, options, ctx),
            ProcessorKind::Rename(kind) => kind.process(file, options, ctx),
            ProcessorKind::Render(kind) => kind.process(file, options, ctx),
            ProcessorKind::Compare(_) => Err(OperationNotAllowedError::new(
                "compare",
                "comparers only run through the evaluate entry point",
            )
            .into()),
        }
    }

    /// Three-way comparison for comparer processors; `None` for every
    /// other family.
    pub fn compare(&self, subject: &File, candidate: &File) -> Option<bool> {
        match self {
            ProcessorKind::Compare(kind) => kind.compare(subject, candidate),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.registry_id())
    }
}

impl Serialize for ProcessorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.registry_id())
    }
}

impl<'de> Deserialize<'de> for ProcessorKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<ProcessorKind, D::Error> {
        let id = String::deserialize(deserializer)?;
        ProcessorKind::resolve(&id).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_covers_every_family() {
        let cases = [
            ("filename-from-path", ProcessorFamily::Extract),
            ("zip-package", ProcessorFamily::Package),
            ("size-comparer", ProcessorFamily::Compare),
            ("sha256-hasher", ProcessorFamily::Hash),
            ("windows-renamer", ProcessorFamily::Rename),
            ("snippet-render", ProcessorFamily::Render),
        ];
        for (id, family) in cases {
            let kind = ProcessorKind::resolve(id).unwrap();
            assert_eq!(kind.family(), family);
            assert_eq!(kind.registry_id(), id);
        }
    }

    #[test]
    fn test_resolve_rejects_unknown_id() {
        assert!(matches!(
            ProcessorKind::resolve("nonexistent"),
            Err(ConfigurationError::UnknownRegistryId(_))
        ));
    }

    #[test]
    fn test_ids_round_trip_through_serde() {
        let kind = ProcessorKind::Hash(HasherKind::Crc32);
        let encoded = serde_json::to_string(&kind).unwrap();
        let decoded: ProcessorKind = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, kind);
    }

    #[test]
    fn test_comparers_refuse_the_mutating_entry_point() {
        let kind = ProcessorKind::Compare(ComparerKind::Size);
        assert!(kind.default_stopper());
        assert_eq!(kind.default_stop_value(), Some(false));
    }
}
