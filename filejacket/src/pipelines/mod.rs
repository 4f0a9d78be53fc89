//! Processor families runnable inside a pipeline.
//!
//! Each submodule hosts one family: extractors fill file attributes in,
//! comparers answer equality questions, hashers produce and verify digests,
//! renamers search for conflict-free names and renders derive preview
//! representations.
//!
//! // 处理器族:提取、比较、散列、重命名、渲染,各占一个子模块。

pub mod comparer;
pub mod extractor;
pub mod hasher;
pub mod renamer;
pub mod render;
