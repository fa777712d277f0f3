//! The externalize-string flow.
//!
//! One request takes a selection in a source or markup document, adds a new
//! entry to every store of a resource group and replaces the selection with a
//! reference to the generated accessor. Everything that can be checked without
//! writing is checked first, including a dry run of the document rewrite.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::{
    csharp::{LiteralRewriter, ReplaceMode},
    error::Error,
    group::ResourceGroup,
    host::{DEFAULT_ATTEMPTS, DocumentHost, Regenerator, Snapshot},
    namespace::{NamespaceResolver, PathCase},
    xaml::{AccessorTarget, MarkupRewriter},
};

lazy_static! {
    static ref KEY_PATTERN: Regex = Regex::new(r"^[\p{L}_][\p{L}\p{N}_]*$").unwrap();
}

/// Characters consumed before [`suggest_key`] stops at the next separator.
const SUGGESTED_KEY_SOFT_LIMIT: usize = 32;

/// Which rewriter handles a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RewriterKind {
    /// General-purpose source: the string literal under the caret is replaced.
    Source,
    /// Markup: the selection becomes an `{x:Static}` reference.
    Markup,
    /// Anything else, with the extension as seen in the file name (`.txt`).
    Unsupported(String),
}

impl RewriterKind {
    pub fn resolve(path: &Path, source_extensions: &[String], markup_extensions: &[String]) -> Self {
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            return RewriterKind::Unsupported(name);
        };
        let matches = |list: &[String]| list.iter().any(|e| e.eq_ignore_ascii_case(extension));

        if matches(source_extensions) {
            RewriterKind::Source
        } else if matches(markup_extensions) {
            RewriterKind::Markup
        } else {
            RewriterKind::Unsupported(format!(".{extension}"))
        }
    }

    fn label(&self) -> &str {
        match self {
            RewriterKind::Source => "source",
            RewriterKind::Markup => "markup",
            RewriterKind::Unsupported(extension) => extension,
        }
    }
}

/// Tunables for [`Externalizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalizerSettings {
    pub path_case: PathCase,
    pub attempts: usize,
    pub source_extensions: Vec<String>,
    pub markup_extensions: Vec<String>,
}

impl Default for ExternalizerSettings {
    fn default() -> Self {
        ExternalizerSettings {
            path_case: PathCase::native(),
            attempts: DEFAULT_ATTEMPTS,
            source_extensions: vec!["cs".to_string()],
            markup_extensions: vec!["xaml".to_string()],
        }
    }
}

/// What to externalize and where.
#[derive(Debug, Clone)]
pub struct ExternalizeRequest<'a> {
    pub document: &'a Path,
    pub group: &'a ResourceGroup,
    pub key: &'a str,
    /// Text per culture name (`"neutral"`, `"ru"`, …). Stores without an
    /// entry get the selected text.
    pub translations: BTreeMap<String, String>,
    /// Stored on the neutral entry only.
    pub comment: Option<String>,
}

impl<'a> ExternalizeRequest<'a> {
    pub fn new(document: &'a Path, group: &'a ResourceGroup, key: &'a str) -> Self {
        ExternalizeRequest {
            document,
            group,
            key,
            translations: BTreeMap::new(),
            comment: None,
        }
    }

    pub fn with_translation(mut self, culture: impl Into<String>, text: impl Into<String>) -> Self {
        self.translations.insert(culture.into(), text.into());
        self
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }
}

/// A completed externalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Externalized {
    pub namespace: String,
    /// The expression that replaced the selection.
    pub reference: String,
    /// Stores that received the new entry.
    pub stores: Vec<PathBuf>,
    /// Set when the accessor could not be regenerated.
    pub regeneration_warning: Option<String>,
}

/// The single user-facing result of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Success {
        message: String,
        warning: Option<String>,
    },
    Failure {
        message: String,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Success { message, .. } | Outcome::Failure { message } => message,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Externalizer {
    settings: ExternalizerSettings,
}

impl Externalizer {
    pub fn new(settings: ExternalizerSettings) -> Self {
        Externalizer { settings }
    }

    pub fn settings(&self) -> &ExternalizerSettings {
        &self.settings
    }

    pub fn resolver(&self) -> NamespaceResolver {
        NamespaceResolver::new(self.settings.path_case)
    }

    pub fn kind_for(&self, document: &Path) -> RewriterKind {
        RewriterKind::resolve(
            document,
            &self.settings.source_extensions,
            &self.settings.markup_extensions,
        )
    }

    /// Runs the request and folds any error into a single message.
    pub fn externalize<H, R>(&self, host: &H, regenerator: &R, request: &ExternalizeRequest<'_>) -> Outcome
    where
        H: DocumentHost + ?Sized,
        R: Regenerator + ?Sized,
    {
        match self.try_externalize(host, regenerator, request) {
            Ok(done) => Outcome::Success {
                message: format!(
                    "added `{}` to {} resource file(s) and replaced the selection with `{}`",
                    request.key,
                    done.stores.len(),
                    done.reference
                ),
                warning: done.regeneration_warning,
            },
            Err(e) => {
                let message = match &e {
                    Error::TokenNotFound(_)
                    | Error::NotAStringLiteral(_)
                    | Error::NotWellFormed(_)
                    | Error::EditConflict(_)
                    | Error::InvalidSelection(_) => format!(
                        "error happened while editing the {} file: {e}",
                        self.kind_for(request.document).label()
                    ),
                    _ => e.to_string(),
                };
                tracing::warn!(document = %request.document.display(), "externalize failed: {e}");
                Outcome::Failure { message }
            }
        }
    }

    /// Runs the request.
    ///
    /// Stores are only written once the key, group, namespace and a dry run of
    /// the document rewrite have all succeeded.
    pub fn try_externalize<H, R>(
        &self,
        host: &H,
        regenerator: &R,
        request: &ExternalizeRequest<'_>,
    ) -> Result<Externalized, Error>
    where
        H: DocumentHost + ?Sized,
        R: Regenerator + ?Sized,
    {
        let kind = self.kind_for(request.document);
        if let RewriterKind::Unsupported(extension) = &kind {
            return Err(Error::UnsupportedFileKind(extension.clone()));
        }

        validate_key(request.key)?;
        let group = request.group;
        let representative = group.representative().ok_or(Error::NoResourceStores)?;
        if group.exists_key(request.key)? {
            return Err(Error::DuplicateKey {
                key: request.key.to_string(),
                path: representative.path().to_path_buf(),
            });
        }
        let namespace = group.resolve_namespace(&self.resolver())?;
        let class_name = group.accessor_name().ok_or(Error::NoResourceStores)?;
        let target = AccessorTarget {
            namespace: &namespace,
            class_name: &class_name,
            key: request.key,
        };

        let snapshot = host.snapshot(request.document)?;
        let selected = snapshot.selected_text()?.to_string();
        if selected.is_empty() {
            return Err(Error::invalid_selection("nothing is selected"));
        }
        self.dry_run(&kind, &snapshot, &target)?;

        let mut stores = Vec::with_capacity(group.stores().len());
        for store in group.stores_neutral_first() {
            let text = request
                .translations
                .get(&store.culture().name())
                .unwrap_or(&selected);
            store.add(request.key, text, request.comment.as_deref())?;
            stores.push(store.path().to_path_buf());
        }

        let reference = self.commit(&kind, host, request.document, &target)?;

        let regeneration_warning = match regenerator.regenerate(representative.path()) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(store = %representative.path().display(), "regeneration failed: {e}");
                Some(format!("accessor regeneration failed: {e}"))
            }
        };

        Ok(Externalized {
            reference,
            namespace,
            stores,
            regeneration_warning,
        })
    }

    /// Computes the rewrite against `snapshot` without committing it.
    fn dry_run(
        &self,
        kind: &RewriterKind,
        snapshot: &Snapshot,
        target: &AccessorTarget<'_>,
    ) -> Result<(), Error> {
        match kind {
            RewriterKind::Source => LiteralRewriter::new(self.settings.attempts)
                .rewrite(
                    &snapshot.text,
                    snapshot.selection.start,
                    &source_reference(target),
                    ReplaceMode::FullToken,
                )
                .map(drop),
            RewriterKind::Markup => MarkupRewriter::new(self.settings.attempts)
                .rewrite(&snapshot.text, snapshot.selection, target)
                .map(drop),
            RewriterKind::Unsupported(extension) => Err(Error::UnsupportedFileKind(extension.clone())),
        }
    }

    /// Commits the rewrite through the matching rewriter and returns the
    /// expression that replaced the selection.
    fn commit<H: DocumentHost + ?Sized>(
        &self,
        kind: &RewriterKind,
        host: &H,
        document: &Path,
        target: &AccessorTarget<'_>,
    ) -> Result<String, Error> {
        match kind {
            RewriterKind::Source => {
                let reference = source_reference(target);
                LiteralRewriter::new(self.settings.attempts).apply(
                    host,
                    document,
                    &reference,
                    ReplaceMode::FullToken,
                )?;
                Ok(reference)
            }
            RewriterKind::Markup => MarkupRewriter::new(self.settings.attempts)
                .apply(host, document, target)
                .map(|(_, reference)| reference),
            RewriterKind::Unsupported(extension) => Err(Error::UnsupportedFileKind(extension.clone())),
        }
    }
}

/// `App.Properties.Strings.Greeting`
fn source_reference(target: &AccessorTarget<'_>) -> String {
    format!("{}.{}.{}", target.namespace, target.class_name, target.key)
}

/// Whether `key` can become a generated member name.
pub fn validate_key(key: &str) -> Result<(), Error> {
    if KEY_PATTERN.is_match(key) {
        Ok(())
    } else {
        Err(Error::InvalidKey(key.to_string()))
    }
}

/// A key derived from selected text: letters and digits kept, everything else
/// turned into `_`, cut at the first separator after 32 characters.
///
/// ```
/// assert_eq!(resxtract::suggest_key("Hello, world!"), "Hello__world");
/// ```
pub fn suggest_key(text: &str) -> String {
    let mut key = String::with_capacity(text.len().min(64));
    for (index, ch) in text.chars().enumerate() {
        if ch.is_alphanumeric() {
            key.push(ch);
        } else {
            if index >= SUGGESTED_KEY_SOFT_LIMIT {
                break;
            }
            key.push('_');
        }
    }

    let key = key.trim_matches('_');
    if key.starts_with(|c: char| c.is_numeric()) {
        format!("_{key}")
    } else {
        key.to_string()
    }
}

/// `Used in Views/MainWindow.xaml document`, relative to `root` when possible.
pub fn neutral_comment(document: &Path, root: &Path) -> String {
    let relative = document.strip_prefix(root).unwrap_or(document);
    format!("Used in {} document", relative.display())
}
