use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use resxtract::traits::write_atomically;
use resxtract::{DocumentHost, Error, Snapshot, Span};

/// How the selection is given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Byte offsets `START..END`.
    Span(Span),
    /// The first occurrence of a text.
    Find(String),
}

impl Selection {
    fn locate(&self, text: &str) -> Result<Span, Error> {
        let span = match self {
            Selection::Span(span) => *span,
            Selection::Find(needle) => {
                if needle.is_empty() {
                    return Err(Error::invalid_selection("search text is empty"));
                }
                let start = text.find(needle.as_str()).ok_or_else(|| {
                    Error::invalid_selection(format!("`{}` does not occur in the document", needle))
                })?;
                Span::new(start, start + needle.len())
            }
        };
        span.validate(text)?;
        Ok(span)
    }
}

/// Parses `START..END` into a span.
pub fn parse_span(value: &str) -> Result<Span, String> {
    let (start, end) = value
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got '{}'", value))?;
    let start: usize = start
        .trim()
        .parse()
        .map_err(|e| format!("invalid start '{}': {}", start, e))?;
    let end: usize = end
        .trim()
        .parse()
        .map_err(|e| format!("invalid end '{}': {}", end, e))?;
    if start > end {
        return Err(format!("start {} is after end {}", start, end));
    }
    Ok(Span::new(start, end))
}

/// A single document on disk.
///
/// The generation of the document is a hash of its content, so a commit is
/// refused when the file changed after the snapshot was taken.
#[derive(Debug, Clone)]
pub struct FsDocumentHost {
    path: PathBuf,
    selection: Selection,
}

impl FsDocumentHost {
    pub fn new(path: impl Into<PathBuf>, selection: Selection) -> Self {
        Self {
            path: path.into(),
            selection,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_path(&self, document: &Path) -> Result<(), Error> {
        if document == self.path {
            Ok(())
        } else {
            Err(Error::host(format!("document {} is not open", document.display())))
        }
    }
}

fn generation_of(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

impl DocumentHost for FsDocumentHost {
    fn snapshot(&self, document: &Path) -> Result<Snapshot, Error> {
        self.check_path(document)?;
        let text = fs::read_to_string(&self.path)?;
        let selection = self.selection.locate(&text)?;
        Ok(Snapshot {
            generation: generation_of(&text),
            text,
            selection,
        })
    }

    fn try_commit(&self, document: &Path, generation: u64, text: &str) -> Result<bool, Error> {
        self.check_path(document)?;
        let current = fs::read_to_string(&self.path)?;
        if generation_of(&current) != generation {
            return Ok(false);
        }
        write_atomically(&self.path, text.as_bytes())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_span() {
        assert_eq!(parse_span("3..8").unwrap(), Span::new(3, 8));
        assert_eq!(parse_span(" 0 .. 0 ").unwrap(), Span::new(0, 0));
        assert!(parse_span("8..3").is_err());
        assert!(parse_span("3-8").is_err());
        assert!(parse_span("a..b").is_err());
    }

    #[test]
    fn test_find_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Form.cs");
        fs::write(&path, "var s = \"Hello\";").unwrap();

        let host = FsDocumentHost::new(&path, Selection::Find("Hello".to_string()));
        let snapshot = host.snapshot(&path).unwrap();
        assert_eq!(snapshot.selection, Span::new(9, 14));
        assert_eq!(snapshot.selected_text().unwrap(), "Hello");

        let missing = FsDocumentHost::new(&path, Selection::Find("Bye".to_string()));
        assert!(matches!(
            missing.snapshot(&path),
            Err(Error::InvalidSelection(_))
        ));
    }

    #[test]
    fn test_commit_refused_after_external_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Form.cs");
        fs::write(&path, "one").unwrap();

        let host = FsDocumentHost::new(&path, Selection::Span(Span::new(0, 3)));
        let snapshot = host.snapshot(&path).unwrap();
        fs::write(&path, "two").unwrap();
        assert!(!host.try_commit(&path, snapshot.generation, "three").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");

        let snapshot = host.snapshot(&path).unwrap();
        assert!(host.try_commit(&path, snapshot.generation, "three").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "three");
    }
}
