use std::sync::Arc;

use crate::content::source::ContentSource;
use crate::content::{CacheKind, ContentConfig};
use crate::file::File;
use crate::mimetype::KnownMimeTyper;
use crate::pipelines::comparer::ComparerKind;
use crate::storage::{LocalStorage, Storage};

fn storage() -> Arc<dyn Storage> {
    Arc::new(LocalStorage::new())
}

fn bare() -> File {
    File::bare(storage(), KnownMimeTyper::new_arc())
}

/// 附带已缓存内容的文件,数据比较器只认缓存里的完整副本。
fn cached_file(data: &[u8]) -> File {
    let mut file = bare();
    file.set_content_with_config(
        ContentSource::Bytes(data.to_vec()),
        ContentConfig {
            cache: CacheKind::Memory,
            ..ContentConfig::default()
        },
    );
    if let Some(content) = file.content_controller_mut() {
        content.content_as_bytes().unwrap();
    }
    file
}

#[test]
fn test_type_comparer_requires_both_types() {
    let mut subject = bare();
    let mut candidate = bare();
    assert_eq!(ComparerKind::Type.compare(&subject, &candidate), None);

    subject.file_type = Some("image".to_string());
    assert_eq!(ComparerKind::Type.compare(&subject, &candidate), None);

    candidate.file_type = Some("image".to_string());
    assert_eq!(ComparerKind::Type.compare(&subject, &candidate), Some(true));

    candidate.file_type = Some("video".to_string());
    assert_eq!(ComparerKind::Type.compare(&subject, &candidate), Some(false));
}

#[test]
fn test_size_comparer_treats_zero_as_unknown() {
    let mut subject = bare();
    let mut candidate = bare();
    // 长度零既可能是空文件也可能是还没统计,都不做判断。
    assert_eq!(ComparerKind::Size.compare(&subject, &candidate), None);

    subject.length = 10;
    assert_eq!(ComparerKind::Size.compare(&subject, &candidate), None);

    candidate.length = 10;
    assert_eq!(ComparerKind::Size.compare(&subject, &candidate), Some(true));

    candidate.length = 11;
    assert_eq!(ComparerKind::Size.compare(&subject, &candidate), Some(false));
}

#[test]
fn test_binary_comparer_uses_content_kind() {
    let mut subject = bare();
    let mut candidate = bare();
    assert_eq!(ComparerKind::Binary.compare(&subject, &candidate), None);

    subject.set_content(ContentSource::Text("text".to_string()));
    candidate.set_content(ContentSource::Text("other".to_string()));
    assert_eq!(ComparerKind::Binary.compare(&subject, &candidate), Some(true));

    candidate.set_content(ContentSource::Bytes(vec![0, 1, 2]));
    assert_eq!(
        ComparerKind::Binary.compare(&subject, &candidate),
        Some(false)
    );
}

#[test]
fn test_hash_comparer_needs_a_shared_algorithm() {
    let mut subject = bare();
    let mut candidate = bare();
    subject.hashes.insert("sha256".to_string(), "AA11".to_string(), bare());
    candidate.hashes.insert("crc32".to_string(), "BB22".to_string(), bare());

    // 没有共同算法,无从比较。
    assert_eq!(ComparerKind::Hash.compare(&subject, &candidate), None);

    // 共同算法且摘要一致(大小写不敏感)。
    candidate
        .hashes
        .insert("sha256".to_string(), "aa11".to_string(), bare());
    assert_eq!(ComparerKind::Hash.compare(&subject, &candidate), Some(true));

    // 任何一个共同算法不一致立即判不同。
    subject.hashes.insert("crc32".to_string(), "CC33".to_string(), bare());
    assert_eq!(ComparerKind::Hash.compare(&subject, &candidate), Some(false));
}

#[test]
fn test_name_comparer_uses_complete_filenames() {
    let mut subject = bare();
    let mut candidate = bare();
    assert_eq!(ComparerKind::Name.compare(&subject, &candidate), None);

    subject.filename = Some("report".to_string());
    subject.extension = Some("txt".to_string());
    candidate.filename = Some("report".to_string());
    candidate.extension = Some("txt".to_string());
    assert_eq!(ComparerKind::Name.compare(&subject, &candidate), Some(true));

    candidate.extension = Some("md".to_string());
    assert_eq!(ComparerKind::Name.compare(&subject, &candidate), Some(false));
}

#[test]
fn test_data_comparer_needs_cached_copies() {
    let subject = cached_file(b"identical bytes");
    let candidate = cached_file(b"identical bytes");
    assert_eq!(ComparerKind::Data.compare(&subject, &candidate), Some(true));

    let different = cached_file(b"other bytes");
    assert_eq!(ComparerKind::Data.compare(&subject, &different), Some(false));

    // 未缓存的一方让数据比较器弃权,它从不物化内容。
    let mut lazy = bare();
    lazy.set_content(ContentSource::Bytes(b"identical bytes".to_vec()));
    assert_eq!(ComparerKind::Data.compare(&subject, &lazy), None);
}
