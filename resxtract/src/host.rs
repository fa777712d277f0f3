//! Collaborator interfaces and the optimistic commit loop.
//!
//! The host owns the source documents and the project. Rewriters never keep
//! offsets across attempts: each attempt takes a fresh [`Snapshot`], computes
//! the new text from it and asks the host to commit against that snapshot's
//! generation.

use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::Serialize;

use crate::{error::Error, namespace::ProjectInfo};

/// How many times a commit is attempted before giving up.
pub const DEFAULT_ATTEMPTS: usize = 5;

/// A half-open byte range `[start, end)` into a snapshot's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Checks that the span is ordered, in range and on character boundaries.
    pub fn validate(&self, text: &str) -> Result<(), Error> {
        if self.start > self.end || self.end > text.len() {
            return Err(Error::invalid_selection(format!(
                "{}..{} is out of range for {} bytes",
                self.start,
                self.end,
                text.len()
            )));
        }
        if !text.is_char_boundary(self.start) || !text.is_char_boundary(self.end) {
            return Err(Error::invalid_selection(format!(
                "{}..{} splits a character",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

/// One generation of a host-owned document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub generation: u64,
    pub text: String,
    pub selection: Span,
}

impl Snapshot {
    pub fn selected_text(&self) -> Result<&str, Error> {
        self.selection.validate(&self.text)?;
        Ok(&self.text[self.selection.start..self.selection.end])
    }
}

/// A single replacement in snapshot coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub span: Span,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(span: Span, replacement: impl Into<String>) -> Self {
        TextEdit {
            span,
            replacement: replacement.into(),
        }
    }
}

/// Applies non-overlapping edits to `text`, all computed against the same snapshot.
pub fn apply_edits(text: &str, mut edits: Vec<TextEdit>) -> Result<String, Error> {
    for edit in &edits {
        edit.span.validate(text)?;
    }
    edits.sort_by_key(|e| e.span.start);
    for pair in edits.windows(2) {
        if pair[0].span.end > pair[1].span.start {
            return Err(Error::invalid_selection("edits overlap"));
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for edit in &edits {
        out.push_str(&text[cursor..edit.span.start]);
        out.push_str(&edit.replacement);
        cursor = edit.span.end;
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

/// The editor side: open documents and their selections.
pub trait DocumentHost {
    /// The current generation of `document`, with the user's selection.
    fn snapshot(&self, document: &Path) -> Result<Snapshot, Error>;

    /// Replaces the document text if it is still at `generation`.
    ///
    /// Returns `Ok(false)` when the document has moved on.
    fn try_commit(&self, document: &Path, generation: u64, text: &str) -> Result<bool, Error>;
}

/// The project side: identity, metadata and file enumeration.
pub trait ProjectModel {
    fn info(&self) -> ProjectInfo;

    /// All project files with the given extension (without the dot), recursively.
    fn files_with_extension(&self, extension: &str) -> Result<Vec<PathBuf>, Error>;
}

/// Re-runs accessor generation for a resource file.
pub trait Regenerator {
    fn regenerate(&self, resource_file: &Path) -> Result<(), Error>;
}

/// A [`Regenerator`] that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRegeneration;

impl Regenerator for NoRegeneration {
    fn regenerate(&self, _resource_file: &Path) -> Result<(), Error> {
        Ok(())
    }
}

/// Runs `rewrite` against fresh snapshots until a commit succeeds.
///
/// Errors from `rewrite` abort immediately; only a moved generation is
/// retried. Returns the committed text.
pub fn commit_with_retry<H, F>(
    host: &H,
    document: &Path,
    attempts: usize,
    mut rewrite: F,
) -> Result<String, Error>
where
    H: DocumentHost + ?Sized,
    F: FnMut(&Snapshot) -> Result<String, Error>,
{
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        let snapshot = host.snapshot(document)?;
        let text = rewrite(&snapshot)?;
        if host.try_commit(document, snapshot.generation, &text)? {
            tracing::info!(document = %document.display(), attempt, "committed edit");
            return Ok(text);
        }
        tracing::debug!(
            document = %document.display(),
            attempt,
            generation = snapshot.generation,
            "document changed before commit, retrying"
        );
    }
    Err(Error::EditConflict(attempts))
}

#[derive(Debug)]
struct MemoryState {
    generation: u64,
    text: String,
    selection: Span,
    interference: usize,
}

/// A single in-memory document, useful for tests and embedding.
///
/// With [`MemoryHost::with_interference`], the first `n` commits are rejected
/// and the host inserts a line at the top of the document instead, shifting
/// the selection like an editor would.
#[derive(Debug)]
pub struct MemoryHost {
    path: PathBuf,
    state: Mutex<MemoryState>,
}

/// Line inserted by [`MemoryHost`] when simulating concurrent edits.
pub const INTERFERENCE_LINE: &str = "// edited elsewhere\n";

impl MemoryHost {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>, selection: Span) -> Self {
        MemoryHost {
            path: path.into(),
            state: Mutex::new(MemoryState {
                generation: 1,
                text: text.into(),
                selection,
                interference: 0,
            }),
        }
    }

    pub fn with_interference(self, commits_to_reject: usize) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.interference = commits_to_reject;
        }
        self
    }

    pub fn text(&self) -> String {
        self.state
            .lock()
            .map(|s| s.text.clone())
            .unwrap_or_default()
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().map(|s| s.generation).unwrap_or_default()
    }

    fn check_path(&self, document: &Path) -> Result<(), Error> {
        if document == self.path {
            Ok(())
        } else {
            Err(Error::host(format!(
                "document {} is not open",
                document.display()
            )))
        }
    }
}

impl DocumentHost for MemoryHost {
    fn snapshot(&self, document: &Path) -> Result<Snapshot, Error> {
        self.check_path(document)?;
        let state = self
            .state
            .lock()
            .map_err(|_| Error::host("document state poisoned"))?;
        Ok(Snapshot {
            generation: state.generation,
            text: state.text.clone(),
            selection: state.selection,
        })
    }

    fn try_commit(&self, document: &Path, generation: u64, text: &str) -> Result<bool, Error> {
        self.check_path(document)?;
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::host("document state poisoned"))?;

        if state.interference > 0 {
            state.interference -= 1;
            state.text.insert_str(0, INTERFERENCE_LINE);
            state.selection.start += INTERFERENCE_LINE.len();
            state.selection.end += INTERFERENCE_LINE.len();
            state.generation += 1;
        }
        if state.generation != generation {
            return Ok(false);
        }
        state.text = text.to_string();
        state.generation += 1;
        Ok(true)
    }
}
