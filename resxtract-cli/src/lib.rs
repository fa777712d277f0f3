//! CLI library for testing purposes

pub mod config;
pub mod document;
pub mod project;
pub mod regenerate;

pub use config::{Config, load_config};
pub use document::{FsDocumentHost, Selection, parse_span};
pub use project::{FsProject, open_project};
pub use regenerate::CommandRegenerator;
