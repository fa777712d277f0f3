//! Traits for reading and writing resource documents.

use std::{
    fs::{self, File},
    io::{BufRead, BufReader, Cursor, Write},
    path::Path,
};

use crate::error::Error;

/// A trait for parsing and writing one resource document from/to one file.
///
/// Writing to a path never leaves a half-written file behind: the document is
/// rendered into a temporary file next to the target and renamed over it.
///
/// # Example
///
/// ```rust,no_run
/// use resxtract::traits::Parser;
/// use resxtract::store::ResxDocument;
/// let document = ResxDocument::read_from("Strings.resx")?;
/// document.write_to("Strings.copy.resx")?;
/// Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait Parser {
    /// Parse from any reader.
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error>
    where
        Self: Sized;

    /// Parse from file path.
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let file = File::open(path).map_err(Error::Io)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader)
    }

    /// Write to any writer (file, memory, etc.).
    fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error>;

    /// Atomically replace the file at `path` with this document.
    fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let mut buffer = Vec::new();
        self.to_writer(&mut buffer)?;
        write_atomically(path.as_ref(), &buffer)
    }

    /// Parse from a string.
    fn from_str(s: &str) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(s))
    }

    /// Parse from bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(bytes))
    }
}

/// Writes `bytes` to a temporary file in the target directory, then renames it
/// over `path`. Existing file permissions are carried over.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::Builder::new()
        .prefix(".resxtract-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    if let Ok(metadata) = fs::metadata(path) {
        temp.as_file().set_permissions(metadata.permissions())?;
    }
    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomically_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "old").unwrap();

        write_atomically(&path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_write_atomically_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("a.txt");
        let result = write_atomically(&path, b"x");
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!path.exists());
    }
}
