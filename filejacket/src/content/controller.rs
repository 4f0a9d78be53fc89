use log::debug;

use crate::errors::ConfigurationError;

use super::cache::{CacheStrategy, MemoryCache, strategy_for};
use super::source::{ActiveBuffer, ContentSource, ReadSeek};
use super::{BufferAdapter, CacheKind, ContentConfig, ContentError, Payload};

/// Owns a buffer plus a cache strategy and drives block iteration over
/// the content of one file.
///
/// State machine per instance: fresh → streaming (each step reads one
/// block) → exhausted (buffer auto-reset to the first position) →
/// optionally cached, where reads come from the strategy's materialized
/// buffer instead of the spent original. Swapping in the cache buffer
/// is the only way a non-seekable source becomes re-readable.
///
/// // 内容控制器:分块迭代、耗尽后自动回卷、不可 seek 来源经缓存换入后才可重读。
pub struct FileContent {
    adapter: BufferAdapter,
    buffer: ActiveBuffer,
    cache: Box<dyn CacheStrategy>,
    block_size: usize,
    /// Set while the iteration protocol is mid-stream; `read` refuses
    /// to run concurrently with it because both share the same cursor.
    iterating: bool,
}

impl FileContent {
    /// Builds a controller from one of the closed content sources.
    ///
    /// A non-seekable source (or `force_cache`) upgrades the cache
    /// policy to in-memory: without a cache such a source could never
    /// be read twice.
    pub fn new(source: ContentSource, config: ContentConfig) -> FileContent {
        let adapter = if source.is_binary() {
            BufferAdapter::binary()
        } else {
            BufferAdapter::text()
        };

        let cache_kind = if !source.seekable() || config.force_cache {
            CacheKind::Memory
        } else {
            config.cache
        };

        FileContent {
            adapter,
            buffer: source.into_active(),
            cache: strategy_for(cache_kind),
            block_size: config.block_size.max(1),
            iterating: false,
        }
    }

    pub fn is_binary(&self) -> bool {
        self.adapter.binary
    }

    pub fn is_seekable(&self) -> bool {
        self.buffer.seekable()
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn adapter(&self) -> &BufferAdapter {
        &self.adapter
    }

    pub fn cache_kind(&self) -> CacheKind {
        self.cache.kind()
    }

    /// Whether a complete copy of the content sits in the cache.
    pub fn is_cached(&self) -> bool {
        self.cache.is_cached()
    }

    /// A read-only copy of the content, available only once the cache
    /// holds a complete one. Never drives iteration.
    ///
    /// // 只读窥视缓存副本,不推进游标;副本不完整时返回 None。
    pub fn peek_bytes(&self) -> Option<Vec<u8>> {
        self.cache.peek()
    }

    /// Seeks the buffer back to the first position when it can seek.
    /// Abandons any iteration that was mid-stream.
    pub fn reset(&mut self) -> Result<(), ContentError> {
        // 可回卷的缓冲回到起点后,半截缓存必须丢弃,否则重新迭代会重复写入;
        // 不可回卷的流并未真正回卷,缓存照常继续累积。
        if self.buffer.seekable() && !self.cache.is_cached() {
            self.cache.discard();
        }
        self.buffer.rewind_if_possible()?;
        self.iterating = false;
        Ok(())
    }

    /// One iteration step: reads the next block, writing it through to
    /// the cache while the content is not fully cached yet.
    ///
    /// Returns `Ok(None)` at exhaustion, after swapping in the cache
    /// buffer (when the strategy holds one) and rewinding to position
    /// zero so the content can be consumed again.
    pub(crate) fn next_block(&mut self) -> Result<Option<Vec<u8>>, ContentError> {
        self.iterating = true;

        // 1. 从当前缓冲读取一个块。
        let block = self.buffer.read_block(self.block_size)?;

        if block.is_empty() {
            // 2. 耗尽:未完成缓存时,把缓冲换成缓存生成的可 seek 缓冲。
            if !self.cache.is_cached() {
                match self.cache.load_buffer_from_cache() {
                    Ok(buffer) => {
                        debug!("content exhausted, swapping in {:?} cache buffer", self.cache.kind());
                        self.buffer = ActiveBuffer::Seekable(buffer);
                        self.cache.set_cached();
                    }
                    // 无缓存策略:保持原缓冲不变。
                    Err(ContentError::NotAllowed(_)) => {}
                    Err(other) => return Err(other),
                }
            }

            // 3. 回卷到起始位置,迭代结束。
            self.buffer.rewind_if_possible()?;
            self.iterating = false;
            return Ok(None);
        }

        // 4. 写入缓存;已缓存时此刻读的就是缓存缓冲,不再重复写。
        if !self.cache.is_cached() {
            self.cache.save_and_return(&block)?;
        }

        Ok(Some(block))
    }

    /// External cursor over the content blocks, starting at the
    /// current position.
    pub fn blocks(&mut self) -> ContentCursor<'_> {
        ContentCursor {
            content: self,
            done: false,
        }
    }

    /// Full materialization through the cache strategy.
    ///
    /// Drives the iteration to completion, then loads the stored copy.
    /// With the none strategy this fails with a configuration error
    /// pointing the caller at [`FileContent::content_as_buffer`].
    pub fn content(&mut self) -> Result<Payload, ContentError> {
        // 1. 无缓存策略无法物化,这是配置问题而不是内容为空。
        if let Err(ContentError::NotAllowed(_)) = self.cache.consume() {
            return Err(ContentError::Configuration(
                ConfigurationError::CachelessMaterialization,
            ));
        }

        // 2. 将剩余内容全部驱动进缓存。
        while self.next_block()?.is_some() {}

        // 3. 从缓存读取完整内容。
        let bytes = self.cache.load_from_cache()?;
        self.adapter.payload_from(bytes)
    }

    /// The content as raw bytes, materializing via the cache.
    pub fn content_as_bytes(&mut self) -> Result<Vec<u8>, ContentError> {
        Ok(self.content()?.into_bytes())
    }

    /// A seekable view of the content, positioned at the start.
    ///
    /// Seekable buffers are handed out directly. A non-seekable source
    /// is materialized first; when the configured strategy cannot store
    /// data, an in-memory strategy is swapped in as fallback so the
    /// view can still be produced.
    pub fn content_as_buffer(&mut self) -> Result<&mut dyn ReadSeek, ContentError> {
        let seekable = self.buffer.seekable();

        if !seekable && self.cache.is_cached() {
            return Err(ContentError::CacheNotSeekable);
        }

        if !seekable {
            match self.content() {
                Ok(_) => {}
                Err(ContentError::Configuration(_)) => {
                    // 配置的策略存不了数据,换入内存缓存作为后备再物化一次。
                    debug!("cache strategy cannot materialize, falling back to memory cache");
                    self.cache = Box::new(MemoryCache::default());
                    while self.next_block()?.is_some() {}
                }
                Err(other) => return Err(other),
            }
            // 物化过程的耗尽路径已把缓冲换成缓存缓冲。
        }

        self.buffer.rewind_if_possible()?;
        self.buffer
            .as_read_seek()
            .ok_or(ContentError::CacheNotSeekable)
    }

    /// Base64 (standard alphabet) of the whole content.
    pub fn content_as_base64(&mut self) -> Result<String, ContentError> {
        match self.content() {
            Ok(payload) => Ok(self.adapter.to_base64(payload.as_bytes())),
            Err(ContentError::Configuration(_)) | Err(ContentError::Empty) => {
                // 物化被策略拒绝时改走缓冲视图。
                let mut data = Vec::new();
                let buffer = self.content_as_buffer()?;
                std::io::Read::read_to_end(buffer, &mut data)?;
                Ok(self.adapter.to_base64(&data))
            }
            Err(other) => Err(other),
        }
    }

    /// Reads one block of `size` bytes by temporarily overriding the
    /// block size, or the whole content when `size` is `None`.
    ///
    /// Refuses to run while a block iteration is mid-stream: both share
    /// the same underlying cursor and interleaving them loses data.
    pub fn read(&mut self, size: Option<usize>) -> Result<Option<Vec<u8>>, ContentError> {
        if self.iterating {
            return Err(ContentError::IterationInProgress);
        }

        let Some(size) = size else {
            return Ok(Some(self.content()?.into_bytes()));
        };

        let original_block_size = self.block_size;
        self.block_size = size.max(1);
        let block = self.next_block();
        self.block_size = original_block_size;
        // next_block 把迭代标记置位,单块读取结束后要清掉。
        self.iterating = false;

        block
    }
}

impl std::fmt::Debug for FileContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileContent")
            .field("binary", &self.adapter.binary)
            .field("block_size", &self.block_size)
            .field("cache", &self.cache.kind())
            .field("cached", &self.cache.is_cached())
            .field("seekable", &self.buffer.seekable())
            .finish()
    }
}

/// External cursor over the blocks of a [`FileContent`].
///
/// Holds the controller borrowed for the whole iteration, so a
/// conflicting `read` cannot even compile while the cursor lives; the
/// runtime `iterating` flag covers a cursor that was dropped
/// mid-stream.
pub struct ContentCursor<'a> {
    content: &'a mut FileContent,
    done: bool,
}

impl Iterator for ContentCursor<'_> {
    type Item = Result<Vec<u8>, ContentError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.content.next_block() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}
