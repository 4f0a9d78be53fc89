//! Comparer processors that answer whether two file objects are the same.
//!
//! Every comparer is a pure three-way question: `Some(true)` means same by
//! this criterion, `Some(false)` means definitely different, `None` means
//! the objects carry too little data to decide. Comparers never mutate and
//! never force content materialization; the caller decides whether to load
//! content before asking.
//!
//! // 比较器:三值回答,Some(true) 相同、Some(false) 不同、None 数据不足。
//! // 比较器自身从不物化内容,要不要先加载由调用方决定。

use crate::content::controller::FileContent;
use crate::file::File;

/// Criterion used to compare two file objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparerKind {
    /// Broad type ("text", "image", ...) derived from the mimetype.
    Type,
    /// Content length in bytes.
    Size,
    /// Binary flag of the attached content.
    Binary,
    /// Digests for every algorithm both sides carry.
    Hash,
    /// Complete filename.
    Name,
    /// Raw content bytes, only when both sides hold a cached copy.
    Data,
}

impl ComparerKind {
    pub fn registry_id(&self) -> &'static str {
        match self {
            ComparerKind::Type => "type-comparer",
            ComparerKind::Size => "size-comparer",
            ComparerKind::Binary => "binary-comparer",
            ComparerKind::Hash => "hash-comparer",
            ComparerKind::Name => "name-comparer",
            ComparerKind::Data => "data-comparer",
        }
    }

    pub fn from_registry_id(id: &str) -> Option<ComparerKind> {
        match id {
            "type-comparer" => Some(ComparerKind::Type),
            "size-comparer" => Some(ComparerKind::Size),
            "binary-comparer" => Some(ComparerKind::Binary),
            "hash-comparer" => Some(ComparerKind::Hash),
            "name-comparer" => Some(ComparerKind::Name),
            "data-comparer" => Some(ComparerKind::Data),
            _ => None,
        }
    }

    /// Answers whether `subject` and `candidate` are the same under this
    /// criterion.
    pub fn compare(&self, subject: &File, candidate: &File) -> Option<bool> {
        match self {
            ComparerKind::Type => match (&subject.file_type, &candidate.file_type) {
                (Some(ours), Some(theirs)) => Some(ours == theirs),
                _ => None,
            },

            // 长度为零视作未知或空,两边都有实际长度才可比。
            ComparerKind::Size => {
                if subject.length > 0 && candidate.length > 0 {
                    Some(subject.length == candidate.length)
                } else {
                    None
                }
            }

            ComparerKind::Binary => match (subject.is_binary(), candidate.is_binary()) {
                (Some(ours), Some(theirs)) => Some(ours == theirs),
                _ => None,
            },

            ComparerKind::Hash => {
                let mut shared = false;
                for (name, record) in subject.hashes.iter() {
                    if let Some(theirs) = candidate.hashes.digest_of(name) {
                        shared = true;
                        if !record.digest.eq_ignore_ascii_case(theirs) {
                            return Some(false);
                        }
                    }
                }
                // 没有共同算法就无从判断。
                shared.then_some(true)
            }

            ComparerKind::Name => {
                match (subject.complete_filename(), candidate.complete_filename()) {
                    (Some(ours), Some(theirs)) => Some(ours == theirs),
                    _ => None,
                }
            }

            // 仅当双方缓存里都有完整副本时才按字节比较。
            ComparerKind::Data => {
                let ours = subject.content.as_ref().and_then(FileContent::peek_bytes)?;
                let theirs = candidate
                    .content
                    .as_ref()
                    .and_then(FileContent::peek_bytes)?;
                Some(ours == theirs)
            }
        }
    }
}
