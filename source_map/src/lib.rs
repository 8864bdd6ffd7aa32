//! Source mapping for multi-unit synthesis passes
//!
//! Tracks every translation unit the engine sees (hand-written sources and
//! generated artifacts alike), keyed both by a dense `FileId` and by the unit
//! path the host uses. Provides byte-offset to line/column conversion for
//! diagnostics.

use std::collections::HashMap;
use std::fmt;

/// Represents a position in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
    pub byte_offset: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize, byte_offset: usize) -> Self {
        Self {
            line,
            column,
            byte_offset,
        }
    }
}

/// Represents a span of source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub start: SourcePosition,
    pub end: SourcePosition,
    pub file_id: FileId,
}

impl SourceSpan {
    pub fn new(start: SourcePosition, end: SourcePosition, file_id: FileId) -> Self {
        Self {
            start,
            end,
            file_id,
        }
    }

    /// A span that points at no real file, used for whole-program diagnostics
    pub fn unknown() -> Self {
        Self {
            start: SourcePosition::default(),
            end: SourcePosition::default(),
            file_id: FileId::UNKNOWN,
        }
    }
}

/// Unique identifier for a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(usize);

impl FileId {
    pub const UNKNOWN: FileId = FileId(usize::MAX);

    pub fn new(id: usize) -> Self {
        Self(id)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

/// Information about a source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
    pub line_starts: Vec<usize>,
}

impl SourceFile {
    /// Create a new source file with precomputed line starts
    pub fn new(name: String, content: String) -> Self {
        let line_starts = compute_line_starts(&content);
        Self {
            name,
            content,
            line_starts,
        }
    }

    /// Get a specific line from the source file (1-based line numbers)
    pub fn get_line(&self, line_number: usize) -> Option<&str> {
        if line_number == 0 || line_number > self.line_starts.len() {
            return None;
        }

        let start = self.line_starts[line_number - 1];
        let end = if line_number < self.line_starts.len() {
            self.line_starts[line_number]
        } else {
            self.content.len()
        };

        Some(self.content[start..end].trim_end_matches(['\n', '\r']))
    }

    /// Convert a byte offset to line and column (1-based)
    pub fn offset_to_line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.content.len());
        let line_index = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };

        let line_start = self.line_starts.get(line_index).copied().unwrap_or(0);
        (line_index + 1, offset - line_start + 1)
    }

    /// Create a SourcePosition from a byte offset
    pub fn offset_to_position(&self, offset: usize) -> SourcePosition {
        let (line, column) = self.offset_to_line_col(offset);
        SourcePosition::new(line, column, offset)
    }
}

/// Manages the text of every unit in a program.
///
/// Files are addressable by `FileId` and by unit path. Replacing a path keeps
/// its id so spans recorded before an incremental rebuild still resolve to the
/// right file name.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: HashMap<FileId, SourceFile>,
    by_name: HashMap<String, FileId>,
    next_id: usize,
}

impl SourceMap {
    /// Create a new empty source map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source file and return its FileId. Adding a name that is already
    /// present replaces its content and reuses the id.
    pub fn add_file(&mut self, name: String, content: String) -> FileId {
        if let Some(&existing) = self.by_name.get(&name) {
            self.files.insert(existing, SourceFile::new(name, content));
            return existing;
        }

        let file_id = FileId(self.next_id);
        self.next_id += 1;

        self.by_name.insert(name.clone(), file_id);
        self.files.insert(file_id, SourceFile::new(name, content));

        file_id
    }

    /// Drop a file by name, returning its id if it was present
    pub fn remove_file(&mut self, name: &str) -> Option<FileId> {
        let file_id = self.by_name.remove(name)?;
        self.files.remove(&file_id);
        Some(file_id)
    }

    /// Look up the id assigned to a unit path
    pub fn file_id(&self, name: &str) -> Option<FileId> {
        self.by_name.get(name).copied()
    }

    /// Get a source file by its FileId
    pub fn get_file(&self, file_id: FileId) -> Option<&SourceFile> {
        self.files.get(&file_id)
    }

    /// Get a specific line from a file (1-based line numbers)
    pub fn get_line(&self, file_id: FileId, line_number: usize) -> Option<&str> {
        self.get_file(file_id)?.get_line(line_number)
    }

    /// Convert a byte offset to line and column for a specific file
    pub fn offset_to_line_col(&self, file_id: FileId, offset: usize) -> Option<(usize, usize)> {
        self.get_file(file_id)
            .map(|file| file.offset_to_line_col(offset))
    }

    /// Create a SourceSpan from file, start offset, and end offset
    pub fn span_from_offsets(
        &self,
        file_id: FileId,
        start: usize,
        end: usize,
    ) -> Option<SourceSpan> {
        let file = self.get_file(file_id)?;
        let start_pos = file.offset_to_position(start);
        let end_pos = file.offset_to_position(end);
        Some(SourceSpan::new(start_pos, end_pos, file_id))
    }

    /// Get the number of files in the source map
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the source map is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Compute line start offsets for a source text
fn compute_line_starts(source: &str) -> Vec<usize> {
    let mut line_starts = vec![0];

    for (i, ch) in source.char_indices() {
        if ch == '\n' {
            line_starts.push(i + 1);
        }
    }

    line_starts
}
