//! All error types for the resxtract crate.
//!
//! These are returned from every fallible operation (store I/O, culture
//! classification, namespace resolution, source rewriting, etc.). The
//! orchestrator turns any of them into a single user-facing message.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("`{0}` is not a resource file for any known culture")]
    NotAResourceFile(String),

    #[error("key `{key}` already exists in {}", path.display())]
    DuplicateKey { key: String, path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("invalid resource: {0}")]
    InvalidResource(String),

    #[error("{} is outside the project tree {}", path.display(), root.display())]
    OutsideProjectTree { path: PathBuf, root: PathBuf },

    #[error("no token found at offset {0}")]
    TokenNotFound(usize),

    #[error("token `{0}` is not a string literal")]
    NotAStringLiteral(String),

    #[error("markup is not well formed: {0}")]
    NotWellFormed(String),

    #[error("document changed during edit; gave up after {0} attempt(s)")]
    EditConflict(usize),

    #[error("{0} files are not supported")]
    UnsupportedFileKind(String),

    #[error("invalid key `{0}`")]
    InvalidKey(String),

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("no resource stores found in project")]
    NoResourceStores,

    #[error("host error: {0}")]
    Host(String),
}

impl Error {
    /// Creates a new host (collaborator) error.
    pub fn host(message: impl Into<String>) -> Self {
        Error::Host(message.into())
    }

    /// Creates a new selection error.
    pub fn invalid_selection(message: impl Into<String>) -> Self {
        Error::InvalidSelection(message.into())
    }

    /// Returns `true` for conditions detected before anything was written.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::NotAResourceFile(_)
                | Error::DuplicateKey { .. }
                | Error::OutsideProjectTree { .. }
                | Error::InvalidKey(_)
                | Error::UnsupportedFileKind(_)
                | Error::NoResourceStores
        )
    }
}
