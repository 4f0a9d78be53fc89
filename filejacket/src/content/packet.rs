use crate::common::constants::PACKET_HISTORY_LIMIT;
use crate::file::File;
use crate::pipeline::Pipeline;
use crate::pipelines::extractor::package::default_unpack_pipeline;

/// Ordered mapping of internal path → nested file for the entries of
/// an archive-like file.
///
/// Lookup ignores insertion order, iteration preserves it. Resetting
/// archives the current mapping into a bounded history before
/// clearing, so a re-listing never silently discards entries.
///
/// // 包内容:内部路径到嵌套文件的有序映射,reset 前先归档进历史。
#[derive(Debug)]
pub struct FilePacket {
    entries: Vec<(String, PacketEntry)>,
    /// Total unpacked size of the current entries in bytes.
    length: u64,
    history: Vec<Vec<(String, PacketEntry)>>,
    /// Unpack chain run whenever the entries get (re)listed.
    pub pipeline: Pipeline,
}

impl Default for FilePacket {
    fn default() -> FilePacket {
        FilePacket {
            entries: Vec::new(),
            length: 0,
            history: Vec::new(),
            pipeline: default_unpack_pipeline(),
        }
    }
}

/// One nested file plus its unpacked byte length.
#[derive(Debug)]
pub struct PacketEntry {
    pub file: File,
    pub length: u64,
}

impl FilePacket {
    pub fn new() -> FilePacket {
        FilePacket::default()
    }

    /// Registers a nested file under its internal path, replacing any
    /// previous entry for the same path.
    pub fn insert(&mut self, internal_path: impl Into<String>, file: File) {
        let internal_path = internal_path.into();
        let length = file.length;
        if let Some(position) = self.position_of(&internal_path) {
            let removed = self.entries.remove(position);
            self.length -= removed.1.length;
        }
        self.length += length;
        self.entries.push((internal_path, PacketEntry { file, length }));
    }

    fn position_of(&self, internal_path: &str) -> Option<usize> {
        self.entries.iter().position(|(key, _)| key == internal_path)
    }

    pub fn get(&self, internal_path: &str) -> Option<&PacketEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key == internal_path)
            .map(|(_, entry)| entry)
    }

    pub fn get_mut(&mut self, internal_path: &str) -> Option<&mut PacketEntry> {
        self.entries
            .iter_mut()
            .find(|(key, _)| key == internal_path)
            .map(|(_, entry)| entry)
    }

    /// Entry at the given insertion position.
    pub fn get_index(&self, index: usize) -> Option<&PacketEntry> {
        self.entries.get(index).map(|(_, entry)| entry)
    }

    pub fn contains(&self, internal_path: &str) -> bool {
        self.position_of(internal_path).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total unpacked size of the current entries.
    pub fn unpacked_length(&self) -> u64 {
        self.length
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PacketEntry)> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(key, _)| key.as_str()).collect()
    }

    pub fn files(&self) -> impl Iterator<Item = &File> {
        self.entries.iter().map(|(_, entry)| &entry.file)
    }

    pub fn files_mut(&mut self) -> impl Iterator<Item = &mut File> {
        self.entries.iter_mut().map(|(_, entry)| &mut entry.file)
    }

    pub fn lengths(&self) -> Vec<u64> {
        self.entries.iter().map(|(_, entry)| entry.length).collect()
    }

    /// Archives the current mapping into history and starts empty.
    ///
    /// History is bounded: the oldest snapshot is dropped once the
    /// limit is reached.
    pub fn reset(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        if self.history.len() == PACKET_HISTORY_LIMIT {
            self.history.remove(0);
        }
        self.history.push(std::mem::take(&mut self.entries));
        self.length = 0;
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Entries of a history snapshot, newest last.
    pub fn history_snapshot(&self, index: usize) -> Option<&[(String, PacketEntry)]> {
        self.history.get(index).map(|snapshot| snapshot.as_slice())
    }

    pub fn clean_history(&mut self) {
        self.history.clear();
    }
}
