#![forbid(unsafe_code)]
//! Move hard-coded strings out of C# and XAML sources into `.resx` resource files.
//!
//! A selected string becomes a new entry in every culture variant of a
//! resource group, and the selection is replaced with a reference to the
//! generated accessor: `App.Properties.Strings.Greeting` in C#, or
//! `{x:Static strings:Strings.Greeting}` in XAML.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use resxtract::{
//!     ExternalizeRequest, Externalizer, MemoryHost, NoRegeneration, ProjectInfo,
//!     ResourceGroup, Span,
//! };
//!
//! let project = ProjectInfo::new("/src/App", "App");
//! let group = ResourceGroup::new(
//!     "/src/App/Properties",
//!     project,
//!     ["/src/App/Properties/Strings.resx", "/src/App/Properties/Strings.ru.resx"],
//! );
//!
//! let document = Path::new("/src/App/Form.cs");
//! let host = MemoryHost::new(document, "var s = \"Hello\";", Span::new(9, 14));
//! let request = ExternalizeRequest::new(document, &group, "Greeting");
//! let outcome = Externalizer::default().externalize(&host, &NoRegeneration, &request);
//! println!("{}", outcome.message());
//! ```
//!
//! # Pieces
//!
//! - [`culture`]: which `.resx` file names belong to which culture
//! - [`store`]: byte-faithful `.resx` reading and appending
//! - [`group`]: discovery of culture variants per folder
//! - [`namespace`]: accessor namespaces from folder structure
//! - [`csharp`] and [`xaml`]: the two document rewriters
//! - [`host`]: the editor and project interfaces plus the optimistic commit loop
//! - [`orchestrator`]: the end-to-end flow

pub mod csharp;
pub mod culture;
pub mod error;
pub mod group;
pub mod host;
pub mod namespace;
pub mod orchestrator;
pub mod store;
pub mod traits;
pub mod xaml;

// Re-export most used types for easy consumption
pub use crate::{
    csharp::{LiteralKind, LiteralRewriter, ReplaceMode},
    culture::{Culture, classify},
    error::Error,
    group::{GroupSummary, ResourceGroup, discover_groups},
    host::{
        DocumentHost, MemoryHost, NoRegeneration, ProjectModel, Regenerator, Snapshot, Span,
        TextEdit, commit_with_retry,
    },
    namespace::{NamespaceResolver, PathCase, ProjectInfo},
    orchestrator::{
        ExternalizeRequest, Externalized, Externalizer, ExternalizerSettings, Outcome,
        RewriterKind, neutral_comment, suggest_key, validate_key,
    },
    store::{ResourceStore, ResxDocument, ResxEntry},
    traits::Parser,
    xaml::{AccessorTarget, MarkupRewriter},
};
