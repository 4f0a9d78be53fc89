use std::io::{self, Cursor, Read, Seek};

/// Random-access byte stream. Blanket-implemented so plain files,
/// cursors and cache buffers all qualify.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// A stream that may defer expensive work until first use, e.g. an
/// archive entry that only decompresses once read or seeked.
///
/// `seekable` must report the real capability of the backend without
/// forcing materialization.
pub trait LazyReadSeek: Read + Seek {
    fn seekable(&self) -> bool;

    /// View as a plain random-access stream.
    fn as_read_seek(&mut self) -> &mut dyn ReadSeek;
}

/// Closed set of origins a file's content can be built from.
///
/// Callers pick a variant instead of the core probing stream
/// capabilities at runtime: the raw variants are seekable by
/// construction, the stream variants never are, and the lazy variant
/// answers for itself.
///
/// // 内容来源的封闭枚举:原始值天然可 seek,流式来源不可,惰性条目自行上报。
pub enum ContentSource {
    /// Raw text, kept in memory.
    Text(String),
    /// Raw bytes, kept in memory.
    Bytes(Vec<u8>),
    /// A non-seekable stream of UTF-8 text.
    TextStream(Box<dyn Read>),
    /// A non-seekable stream of bytes.
    BinaryStream(Box<dyn Read>),
    /// A lazily-materialized stream, e.g. an entry inside an archive.
    Lazy(Box<dyn LazyReadSeek>),
}

impl ContentSource {
    /// Whether the bytes behind this source carry text or binary data.
    pub fn is_binary(&self) -> bool {
        match self {
            ContentSource::Text(_) | ContentSource::TextStream(_) => false,
            ContentSource::Bytes(_) | ContentSource::BinaryStream(_) | ContentSource::Lazy(_) => {
                true
            }
        }
    }

    /// Whether random access works without caching first.
    pub fn seekable(&self) -> bool {
        match self {
            ContentSource::Text(_) | ContentSource::Bytes(_) => true,
            ContentSource::TextStream(_) | ContentSource::BinaryStream(_) => false,
            ContentSource::Lazy(inner) => inner.seekable(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ContentSource::Text(value) => value.is_empty(),
            ContentSource::Bytes(value) => value.is_empty(),
            _ => false,
        }
    }

    pub(crate) fn into_active(self) -> ActiveBuffer {
        match self {
            ContentSource::Text(value) => {
                ActiveBuffer::Seekable(Box::new(Cursor::new(value.into_bytes())))
            }
            ContentSource::Bytes(value) => ActiveBuffer::Seekable(Box::new(Cursor::new(value))),
            ContentSource::TextStream(stream) | ContentSource::BinaryStream(stream) => {
                ActiveBuffer::Stream(stream)
            }
            ContentSource::Lazy(inner) => ActiveBuffer::Lazy(inner),
        }
    }
}

impl std::fmt::Debug for ContentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ContentSource::Text(_) => "Text",
            ContentSource::Bytes(_) => "Bytes",
            ContentSource::TextStream(_) => "TextStream",
            ContentSource::BinaryStream(_) => "BinaryStream",
            ContentSource::Lazy(_) => "Lazy",
        };
        f.write_str(label)
    }
}

/// The buffer a controller actually reads from. Starts out as the
/// converted [`ContentSource`] and gets swapped for a cache-backed
/// buffer once a non-seekable stream is exhausted.
pub(crate) enum ActiveBuffer {
    Seekable(Box<dyn ReadSeek>),
    Stream(Box<dyn Read>),
    Lazy(Box<dyn LazyReadSeek>),
}

impl Read for ActiveBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ActiveBuffer::Seekable(inner) => inner.read(buf),
            ActiveBuffer::Stream(inner) => inner.read(buf),
            ActiveBuffer::Lazy(inner) => inner.read(buf),
        }
    }
}

impl ActiveBuffer {
    pub(crate) fn seekable(&self) -> bool {
        match self {
            ActiveBuffer::Seekable(_) => true,
            ActiveBuffer::Stream(_) => false,
            ActiveBuffer::Lazy(inner) => inner.seekable(),
        }
    }

    /// Reads up to `size` bytes, looping over short reads so a block is
    /// only smaller than `size` at the end of the stream.
    pub(crate) fn read_block(&mut self, size: usize) -> io::Result<Vec<u8>> {
        let mut block = vec![0u8; size];
        let mut filled = 0;
        while filled < size {
            let read = self.read(&mut block[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        block.truncate(filled);
        Ok(block)
    }

    /// Seeks back to the first position when the buffer supports it.
    pub(crate) fn rewind_if_possible(&mut self) -> io::Result<()> {
        match self {
            ActiveBuffer::Seekable(inner) => inner.rewind(),
            ActiveBuffer::Lazy(inner) if inner.seekable() => inner.rewind(),
            _ => Ok(()),
        }
    }

    pub(crate) fn as_read_seek(&mut self) -> Option<&mut dyn ReadSeek> {
        match self {
            ActiveBuffer::Seekable(inner) => Some(inner.as_mut()),
            ActiveBuffer::Lazy(inner) => Some(inner.as_read_seek()),
            ActiveBuffer::Stream(_) => None,
        }
    }
}
