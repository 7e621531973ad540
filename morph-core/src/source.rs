//! Source registry: file text by id, line citations, and origin maps for
//! generated units

use crate::ast::Position;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Identity of a registered source text
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub String);

impl FileId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Maps positions in a generated text back to the source it was produced from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginMap {
    /// File the original positions refer to
    pub file: FileId,
    /// (generated, original) pairs sorted by generated position
    entries: Vec<(Position, Position)>,
    /// Lines of prelude emitted ahead of the unit
    pub prelude_lines: u32,
    pub line_delta: u32,
    pub col_delta: u32,
}

impl OriginMap {
    pub fn new(file: FileId, prelude_lines: u32, line_delta: u32, col_delta: u32) -> Self {
        Self {
            file,
            entries: Vec::new(),
            prelude_lines,
            line_delta,
            col_delta,
        }
    }

    pub fn push(&mut self, generated: Position, original: Position) {
        self.entries.push((generated, original));
    }

    /// Sorts entries; entries at equal generated positions keep insertion order
    pub fn finish(mut self) -> Self {
        self.entries.sort_by_key(|(generated, _)| *generated);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maps a generated position to its original position.
    ///
    /// The last entry at or before `pos` wins. Positions on the same line as
    /// that entry keep their column offset from it. Positions preceding every
    /// entry fall back to the uniform line and column deltas.
    pub fn lookup(&self, pos: Position) -> Option<Position> {
        let idx = self.entries.partition_point(|(generated, _)| *generated <= pos);
        if idx > 0 {
            let (generated, original) = self.entries[idx - 1];
            if generated.line == pos.line {
                return Some(Position::new(
                    original.line,
                    original.col + (pos.col - generated.col),
                ));
            }
            return Some(original);
        }
        if pos.line > self.prelude_lines {
            return Some(Position::new(
                pos.line - self.prelude_lines + self.line_delta,
                pos.col + self.col_delta,
            ));
        }
        None
    }
}

#[derive(Debug)]
struct SourceFile {
    text: Rc<str>,
    origin: Option<OriginMap>,
}

/// Shared registry of source texts, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    files: Rc<RefCell<FxHashMap<FileId, SourceFile>>>,
    /// Last number handed out per generated-file stem
    fresh: Rc<RefCell<FxHashMap<String, u32>>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the text for a file
    pub fn register(&self, file: FileId, text: impl Into<Rc<str>>) {
        debug!("Registered source: {}", file);
        self.files.borrow_mut().insert(
            file,
            SourceFile {
                text: text.into(),
                origin: None,
            },
        );
    }

    /// Registers a generated text along with the map back to its origin
    pub fn register_generated(&self, file: FileId, text: impl Into<Rc<str>>, origin: OriginMap) {
        debug!("Registered generated source: {} (from {})", file, origin.file);
        self.files.borrow_mut().insert(
            file,
            SourceFile {
                text: text.into(),
                origin: Some(origin),
            },
        );
    }

    /// Reserves an unused id of the form `<{stem}#{n}>`, numbering from 1 per
    /// stem. Every clone of the registry draws from the same counters.
    pub fn fresh_file(&self, stem: &str) -> FileId {
        let mut fresh = self.fresh.borrow_mut();
        let last = fresh.entry(stem.to_string()).or_insert(0);
        loop {
            *last += 1;
            let file = FileId::new(format!("<{stem}#{last}>"));
            if !self.contains(&file) {
                return file;
            }
        }
    }

    pub fn contains(&self, file: &FileId) -> bool {
        self.files.borrow().contains_key(file)
    }

    pub fn text(&self, file: &FileId) -> Option<Rc<str>> {
        self.files.borrow().get(file).map(|f| f.text.clone())
    }

    /// Returns a single 1-based line without its terminator
    pub fn get_line(&self, file: &FileId, line: u32) -> Option<String> {
        if line == 0 {
            return None;
        }
        let files = self.files.borrow();
        let text = &files.get(file)?.text;
        text.lines().nth(line as usize - 1).map(str::to_string)
    }

    pub fn origin(&self, file: &FileId) -> Option<OriginMap> {
        self.files.borrow().get(file)?.origin.clone()
    }

    /// Follows origin maps until reaching a file that was not generated.
    ///
    /// Returns `None` when `file` itself is not generated.
    pub fn resolve_origin(&self, file: &FileId, pos: Position) -> Option<(FileId, Position)> {
        const MAX_CHAIN: usize = 32;
        let mut current = (file.clone(), pos);
        let mut resolved = None;
        for _ in 0..MAX_CHAIN {
            let Some(origin) = self.origin(&current.0) else {
                break;
            };
            let Some(mapped) = origin.lookup(current.1) else {
                break;
            };
            current = (origin.file.clone(), mapped);
            resolved = Some(current.clone());
        }
        resolved
    }
}
