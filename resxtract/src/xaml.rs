//! XAML references to generated resource accessors.
//!
//! The root element is inspected with `quick-xml`, but the document is edited
//! textually: a new `xmlns:` binding is spliced in after the last attribute of
//! the root start tag, so every other byte of the document is preserved.

use std::path::Path;

use quick_xml::{Reader, escape::escape, events::Event};

use crate::{
    error::Error,
    host::{DEFAULT_ATTEMPTS, DocumentHost, Span, TextEdit, apply_edits, commit_with_retry},
};

/// One attribute of the root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootAttribute {
    /// Qualified name, e.g. `xmlns:res` or `x:Class`.
    pub name: String,
    /// Unescaped value.
    pub value: String,
}

impl RootAttribute {
    /// The part of the name after the last `:`.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// The bound prefix when this is an `xmlns:` attribute.
    pub fn xmlns_prefix(&self) -> Option<&str> {
        self.name.strip_prefix("xmlns:")
    }
}

/// The root start tag: where it sits and what it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootElement {
    pub span: Span,
    pub attributes: Vec<RootAttribute>,
    /// Offset right after the last attribute, where new attributes go.
    pub insert_at: usize,
}

impl RootElement {
    /// Parses `text` and returns its root start tag.
    ///
    /// The whole document must be well formed and the root must carry at
    /// least one attribute.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut reader = Reader::from_str(text);
        let mut root = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| Error::NotWellFormed(e.to_string()))?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) if root.is_none() => {
                    let end = reader.buffer_position() as usize;
                    let start = text[..end]
                        .rfind('<')
                        .ok_or_else(|| Error::NotWellFormed("root tag not found".to_string()))?;

                    let mut attributes = Vec::new();
                    for attr in e.attributes().with_checks(false) {
                        let attr = attr.map_err(|e| Error::NotWellFormed(e.to_string()))?;
                        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                        let value = attr
                            .unescape_value()
                            .map_err(|e| Error::NotWellFormed(e.to_string()))?
                            .into_owned();
                        attributes.push(RootAttribute { name, value });
                    }

                    let tag = &text[start..end];
                    let body = tag
                        .strip_suffix("/>")
                        .or_else(|| tag.strip_suffix('>'))
                        .unwrap_or(tag)
                        .trim_end();
                    root = Some(RootElement {
                        span: Span::new(start, end),
                        attributes,
                        insert_at: start + body.len(),
                    });
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let root = root.ok_or_else(|| Error::NotWellFormed("no root element".to_string()))?;
        if root.attributes.is_empty() {
            return Err(Error::NotWellFormed(
                "root element has no attributes".to_string(),
            ));
        }
        Ok(root)
    }

    /// The prefix already bound to `clr-namespace:{namespace}`, if any.
    pub fn existing_prefix(&self, namespace: &str) -> Option<&str> {
        let wanted = clr_namespace(namespace);
        self.attributes
            .iter()
            .filter(|a| a.value == wanted)
            .find_map(RootAttribute::xmlns_prefix)
    }

    /// `base` lower-cased, with the first integer suffix that avoids every
    /// existing attribute local name.
    pub fn mint_prefix(&self, base: &str) -> String {
        let probe = base.to_lowercase();
        let taken = |candidate: &str| self.attributes.iter().any(|a| a.local_name() == candidate);

        if !taken(&probe) {
            return probe;
        }
        (1usize..)
            .map(|i| format!("{probe}{i}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or(probe)
    }
}

/// `clr-namespace:App.Views`
pub fn clr_namespace(namespace: &str) -> String {
    format!("clr-namespace:{namespace}")
}

/// `{x:Static res:Strings.Greeting}`
pub fn static_reference(prefix: &str, class_name: &str, key: &str) -> String {
    format!("{{x:Static {prefix}:{class_name}.{key}}}")
}

/// Where the generated accessor lives and which member to reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorTarget<'a> {
    pub namespace: &'a str,
    pub class_name: &'a str,
    pub key: &'a str,
}

/// Replaces a XAML selection with a `{x:Static}` reference, binding the
/// accessor namespace on the root element when needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkupRewriter {
    attempts: usize,
}

impl Default for MarkupRewriter {
    fn default() -> Self {
        MarkupRewriter {
            attempts: DEFAULT_ATTEMPTS,
        }
    }
}

impl MarkupRewriter {
    pub fn new(attempts: usize) -> Self {
        MarkupRewriter { attempts }
    }

    /// Computes the new text for one snapshot. Nothing is applied unless
    /// every step succeeds.
    pub fn rewrite(
        &self,
        text: &str,
        selection: Span,
        target: &AccessorTarget<'_>,
    ) -> Result<String, Error> {
        self.rewrite_with_reference(text, selection, target)
            .map(|(text, _)| text)
    }

    /// Like [`MarkupRewriter::rewrite`], also returning the inserted reference.
    pub fn rewrite_with_reference(
        &self,
        text: &str,
        selection: Span,
        target: &AccessorTarget<'_>,
    ) -> Result<(String, String), Error> {
        selection.validate(text)?;
        if selection.is_empty() {
            return Err(Error::invalid_selection("nothing is selected"));
        }

        let root = RootElement::parse(text)?;
        let mut edits = Vec::with_capacity(2);

        let prefix = match root.existing_prefix(target.namespace) {
            Some(prefix) => prefix.to_string(),
            None => {
                let prefix = root.mint_prefix(target.class_name);
                let binding = format!(
                    " xmlns:{}=\"{}\"",
                    prefix,
                    escape(clr_namespace(target.namespace).as_str())
                );
                tracing::debug!(prefix = %prefix, namespace = target.namespace, "binding new xmlns prefix");
                edits.push(TextEdit::new(
                    Span::new(root.insert_at, root.insert_at),
                    binding,
                ));
                prefix
            }
        };

        if root.span.overlaps(&selection) {
            return Err(Error::invalid_selection("selection overlaps the root tag"));
        }

        let reference = static_reference(&prefix, target.class_name, target.key);
        edits.push(TextEdit::new(selection, reference.clone()));
        Ok((apply_edits(text, edits)?, reference))
    }

    /// Rewrites the document's current selection and commits, retrying
    /// against fresh snapshots when the document moves on.
    ///
    /// Returns the committed text and the reference that was inserted; the
    /// prefix may differ between attempts if the root element changed.
    pub fn apply<H: DocumentHost + ?Sized>(
        &self,
        host: &H,
        document: &Path,
        target: &AccessorTarget<'_>,
    ) -> Result<(String, String), Error> {
        let mut reference = String::new();
        let text = commit_with_retry(host, document, self.attempts, |snapshot| {
            let (text, inserted) =
                self.rewrite_with_reference(&snapshot.text, snapshot.selection, target)?;
            reference = inserted;
            Ok(text)
        })?;
        Ok((text, reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{INTERFERENCE_LINE, MemoryHost};
    use indoc::indoc;

    const WINDOW: &str = indoc! {r#"
        <Window x:Class="App.MainWindow"
                xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation"
                xmlns:x="http://schemas.microsoft.com/winfx/2006/xaml"
                Title="MainWindow">
            <TextBlock Text="Hello" />
        </Window>
    "#};

    fn target<'a>(namespace: &'a str) -> AccessorTarget<'a> {
        AccessorTarget {
            namespace,
            class_name: "Strings",
            key: "Greeting",
        }
    }

    fn hello(text: &str) -> Span {
        let start = text.find("Hello").unwrap();
        Span::new(start, start + "Hello".len())
    }

    #[test]
    fn test_root_element() {
        let root = RootElement::parse(WINDOW).unwrap();
        assert_eq!(root.span.start, 0);
        assert_eq!(root.attributes.len(), 4);
        assert_eq!(&WINDOW[root.insert_at - 1..root.insert_at], "\"");
        assert!(WINDOW[root.insert_at..].starts_with(">\n"));
    }

    #[test]
    fn test_mints_prefix_and_binds_namespace() {
        let result = MarkupRewriter::default()
            .rewrite(WINDOW, hello(WINDOW), &target("App.Properties"))
            .unwrap();
        assert_eq!(
            result,
            indoc! {r#"
                <Window x:Class="App.MainWindow"
                        xmlns="http://schemas.microsoft.com/winfx/2006/xaml/presentation"
                        xmlns:x="http://schemas.microsoft.com/winfx/2006/xaml"
                        Title="MainWindow" xmlns:strings="clr-namespace:App.Properties">
                    <TextBlock Text="{x:Static strings:Strings.Greeting}" />
                </Window>
            "#}
        );
    }

    #[test]
    fn test_reuses_existing_prefix() {
        let text = "<Page xmlns:res=\"clr-namespace:App.Views\">\n  <Label Content=\"Hello\"/>\n</Page>\n";
        let result = MarkupRewriter::default()
            .rewrite(text, hello(text), &target("App.Views"))
            .unwrap();
        assert_eq!(
            result,
            "<Page xmlns:res=\"clr-namespace:App.Views\">\n  <Label Content=\"{x:Static res:Strings.Greeting}\"/>\n</Page>\n"
        );
    }

    #[test]
    fn test_only_xmlns_attributes_are_reused() {
        let text = "<Page Tag=\"clr-namespace:App.Views\">\n  <Label Content=\"Hello\"/>\n</Page>";
        let root = RootElement::parse(text).unwrap();
        assert_eq!(root.existing_prefix("App.Views"), None);
    }

    #[test]
    fn test_mint_skips_taken_local_names() {
        let text = "<Page xmlns:strings=\"a\" xmlns:strings1=\"b\"><X/></Page>";
        let root = RootElement::parse(text).unwrap();
        assert_eq!(root.mint_prefix("Strings"), "strings2");
        assert_eq!(root.mint_prefix("Errors"), "errors");
    }

    #[test]
    fn test_self_closing_root() {
        let text = "<Label Content=\"Hello\" />";
        let result = MarkupRewriter::default()
            .rewrite(text, Span::new(text.len() - 2, text.len() - 1), &target("App"));
        assert!(matches!(result, Err(Error::InvalidSelection(_))));

        let root = RootElement::parse(text).unwrap();
        assert_eq!(&text[..root.insert_at], "<Label Content=\"Hello\"");
    }

    #[test]
    fn test_root_without_attributes() {
        let text = "<Grid><TextBlock Text=\"Hello\"/></Grid>";
        assert!(matches!(
            MarkupRewriter::default().rewrite(text, hello(text), &target("App")),
            Err(Error::NotWellFormed(_))
        ));
    }

    #[test]
    fn test_malformed_document_is_untouched() {
        let text = "<Grid a=\"1\"><TextBlock Text=\"Hello\"></Grid>";
        assert!(matches!(
            MarkupRewriter::default().rewrite(text, hello(text), &target("App")),
            Err(Error::NotWellFormed(_))
        ));
    }

    #[test]
    fn test_selection_inside_root_tag_is_rejected() {
        let text = "<Grid Title=\"Hello\"><X/></Grid>";
        assert!(matches!(
            MarkupRewriter::default().rewrite(text, hello(text), &target("App")),
            Err(Error::InvalidSelection(_))
        ));
    }

    #[test]
    fn test_empty_selection_is_rejected() {
        assert!(matches!(
            MarkupRewriter::default().rewrite(WINDOW, Span::new(3, 3), &target("App")),
            Err(Error::InvalidSelection(_))
        ));
    }

    #[test]
    fn test_apply_after_interference() {
        let path = Path::new("/MainWindow.xaml");
        let host = MemoryHost::new(path, WINDOW, hello(WINDOW)).with_interference(1);
        let (committed, reference) = MarkupRewriter::default()
            .apply(&host, path, &target("App"))
            .unwrap();
        assert_eq!(reference, "{x:Static strings:Strings.Greeting}");
        assert!(committed.starts_with(INTERFERENCE_LINE));
        assert!(committed.contains("Text=\"{x:Static strings:Strings.Greeting}\""));
        assert!(committed.contains("Title=\"MainWindow\" xmlns:strings=\"clr-namespace:App\">"));
    }
}
