use std::io::Cursor;

use crate::content::packet::FilePacket;
use crate::content::source::ContentSource;
use crate::content::{CacheKind, ContentConfig, ContentError, FileContent};
use crate::errors::ConfigurationError;
use crate::file::File;
use crate::mimetype::KnownMimeTyper;
use crate::storage::local::LocalStorage;

fn stream(data: &[u8]) -> ContentSource {
    ContentSource::BinaryStream(Box::new(Cursor::new(data.to_vec())))
}

fn config(cache: CacheKind, block_size: usize) -> ContentConfig {
    ContentConfig {
        block_size,
        cache,
        ..ContentConfig::default()
    }
}

#[test]
fn test_stream_source_upgrades_to_memory_cache() {
    // 不可回卷的流配了 none 策略也必须升级,否则永远只能读一遍。
    let content = FileContent::new(stream(b"abc"), config(CacheKind::None, 8));
    assert_eq!(content.cache_kind(), CacheKind::Memory);
    assert!(!content.is_seekable());
    assert!(content.is_binary());
}

#[test]
fn test_block_iteration_caches_and_swaps_buffer() {
    let mut content = FileContent::new(stream(b"0123456789"), config(CacheKind::None, 4));

    // 1. 第一轮迭代按块吐出并写通缓存。
    let blocks: Vec<Vec<u8>> = content.blocks().map(|block| block.unwrap()).collect();
    assert_eq!(blocks, vec![b"0123".to_vec(), b"4567".to_vec(), b"89".to_vec()]);

    // 2. 耗尽后换入缓存缓冲,整体副本可窥视。
    assert!(content.is_cached());
    assert_eq!(content.peek_bytes(), Some(b"0123456789".to_vec()));

    // 3. 第二轮迭代走缓存缓冲,数据一致。
    let again: Vec<u8> = content
        .blocks()
        .flat_map(|block| block.unwrap())
        .collect();
    assert_eq!(again, b"0123456789");
}

#[test]
fn test_seekable_source_with_none_cache_refuses_materialization() {
    let mut content = FileContent::new(
        ContentSource::Text("hello".to_string()),
        ContentConfig::default(),
    );

    // 物化需要缓存策略,无缓存时是配置错误而不是内容为空。
    assert!(matches!(
        content.content(),
        Err(ContentError::Configuration(
            ConfigurationError::CachelessMaterialization
        ))
    ));

    // 缓冲视图不受影响。
    let buffer = content.content_as_buffer().unwrap();
    let mut data = Vec::new();
    buffer.read_to_end(&mut data).unwrap();
    assert_eq!(data, b"hello");
}

#[test]
fn test_none_cache_rejects_every_data_call() {
    use crate::content::cache::{CacheStrategy, NoCache};

    let mut cache = NoCache;
    // 写入被静默忽略,数据类调用无论之前发生过什么都被拒。
    cache.save_and_return(b"data").unwrap();
    for _ in 0..2 {
        assert!(matches!(
            cache.load_from_cache(),
            Err(ContentError::NotAllowed(_))
        ));
        assert!(matches!(
            cache.load_buffer_from_cache(),
            Err(ContentError::NotAllowed(_))
        ));
        assert!(matches!(cache.consume(), Err(ContentError::NotAllowed(_))));
    }
    assert!(!cache.is_cached());
}

#[test]
fn test_stream_buffer_view_rereads_from_the_start() {
    let mut content = FileContent::new(stream(b"stream data"), config(CacheKind::Memory, 4));
    assert!(!content.is_seekable());

    // 两次取缓冲视图都要从头读出完整数据,第二次走缓存回卷。
    for _ in 0..2 {
        let buffer = content.content_as_buffer().unwrap();
        let mut data = Vec::new();
        buffer.read_to_end(&mut data).unwrap();
        assert_eq!(data, b"stream data");
    }
}

#[test]
fn test_read_refuses_mid_iteration() {
    let mut content = FileContent::new(
        ContentSource::Text("block by block".to_string()),
        config(CacheKind::None, 5),
    );

    assert_eq!(content.next_block().unwrap(), Some(b"block".to_vec()));
    assert!(matches!(
        content.read(Some(3)),
        Err(ContentError::IterationInProgress)
    ));

    // 回卷放弃半截迭代之后,单块读取恢复可用。
    content.reset().unwrap();
    assert_eq!(content.read(Some(3)).unwrap(), Some(b"blo".to_vec()));
}

#[test]
fn test_read_overrides_block_size_for_one_call() {
    let mut content = FileContent::new(
        ContentSource::Text("hello world".to_string()),
        config(CacheKind::None, 256),
    );

    assert_eq!(content.read(Some(5)).unwrap(), Some(b"hello".to_vec()));
    assert_eq!(content.read(Some(5)).unwrap(), Some(b" worl".to_vec()));
    assert_eq!(content.block_size(), 256);
}

#[test]
fn test_force_cache_materializes_seekable_source() {
    let mut content = FileContent::new(
        ContentSource::Text("cached text".to_string()),
        ContentConfig {
            force_cache: true,
            ..ContentConfig::default()
        },
    );

    assert_eq!(content.cache_kind(), CacheKind::Memory);
    let payload = content.content().unwrap();
    assert_eq!(payload.as_bytes(), b"cached text");
    assert_eq!(content.peek_bytes(), Some(b"cached text".to_vec()));
}

#[test]
fn test_tempfile_cache_round_trip() {
    let mut content = FileContent::new(
        ContentSource::Bytes(vec![7u8; 600]),
        config(CacheKind::TempFile, 256),
    );
    assert_eq!(content.cache_kind(), CacheKind::TempFile);

    // 驱动到耗尽,临时文件里应有完整副本。
    while content.next_block().unwrap().is_some() {}
    assert!(content.is_cached());
    assert_eq!(content.peek_bytes(), Some(vec![7u8; 600]));
    assert_eq!(content.content_as_bytes().unwrap(), vec![7u8; 600]);
}

#[test]
fn test_reset_discards_partial_cache() {
    let mut content = FileContent::new(
        ContentSource::Text("0123456789".to_string()),
        ContentConfig {
            block_size: 4,
            cache: CacheKind::Memory,
            force_cache: false,
        },
    );

    // 半截迭代后回卷,缓存必须清空,否则重迭代会写出重复数据。
    assert!(content.next_block().unwrap().is_some());
    content.reset().unwrap();
    assert!(!content.is_cached());
    assert_eq!(content.peek_bytes(), None);

    while content.next_block().unwrap().is_some() {}
    assert_eq!(content.peek_bytes(), Some(b"0123456789".to_vec()));
}

#[test]
fn test_base64_without_cache_goes_through_buffer() {
    let mut content = FileContent::new(
        ContentSource::Text("hi".to_string()),
        ContentConfig::default(),
    );
    assert_eq!(content.content_as_base64().unwrap(), "aGk=");
}

#[test]
fn test_packet_insert_replaces_and_tracks_length() {
    let storage = std::sync::Arc::new(LocalStorage::new());
    let mut packet = FilePacket::new();

    let mut first = File::bare(storage.clone(), KnownMimeTyper::new_arc());
    first.length = 10;
    packet.insert("docs/a.txt", first);

    let mut second = File::bare(storage.clone(), KnownMimeTyper::new_arc());
    second.length = 4;
    packet.insert("docs/b.txt", second);
    assert_eq!(packet.unpacked_length(), 14);

    // 同路径重复登记按替换处理,总长度跟着修正。
    let mut replacement = File::bare(storage, KnownMimeTyper::new_arc());
    replacement.length = 7;
    packet.insert("docs/a.txt", replacement);
    assert_eq!(packet.len(), 2);
    assert_eq!(packet.unpacked_length(), 11);
}

#[test]
fn test_packet_reset_archives_history() {
    let storage = std::sync::Arc::new(LocalStorage::new());
    let mut packet = FilePacket::new();
    packet.insert(
        "one.txt",
        File::bare(storage.clone(), KnownMimeTyper::new_arc()),
    );
    packet.insert(
        "two.txt",
        File::bare(storage.clone(), KnownMimeTyper::new_arc()),
    );

    packet.reset();
    assert!(packet.is_empty());
    assert_eq!(packet.unpacked_length(), 0);
    assert_eq!(packet.history_len(), 1);
    assert_eq!(packet.history_snapshot(0).map(|entries| entries.len()), Some(2));

    // 空表再 reset 不会追加空快照。
    packet.reset();
    assert_eq!(packet.history_len(), 1);

    packet.insert("three.txt", File::bare(storage, KnownMimeTyper::new_arc()));
    packet.clean_history();
    assert_eq!(packet.history_len(), 0);
    assert_eq!(packet.len(), 1);
}
