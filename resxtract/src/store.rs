//! Support for `.resx` resource stores.
//!
//! A [`ResxDocument`] keeps the file as an ordered list of nodes: verbatim
//! text (declaration, schema, headers, whitespace, comments) and `<data>`
//! entries carrying their original markup. Rendering concatenates the nodes,
//! so everything that was read comes back out byte-for-byte and only appended
//! entries are produced from scratch.

use std::{
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

use encoding_rs::{UTF_16BE, UTF_16LE, UTF_8};
use quick_xml::{
    Reader,
    escape::{escape, partial_escape},
    events::{BytesStart, Event},
};
use serde::Serialize;

use crate::{
    culture::{self, Culture},
    error::Error,
    traits::Parser,
};

/// One `<data>` entry of a resource store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResxEntry {
    pub name: String,
    pub value: String,
    pub comment: Option<String>,
    /// The `type` attribute, present for non-string resources.
    pub type_name: Option<String>,
    /// The `mimetype` attribute, present for serialized objects.
    pub mime_type: Option<String>,
}

impl ResxEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        ResxEntry {
            name: name.into(),
            value: value.into(),
            comment: None,
            type_name: None,
            mime_type: None,
        }
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Verbatim(String),
    Entry {
        entry: ResxEntry,
        /// Original markup; `None` for entries added in memory.
        raw: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextEncoding {
    Utf8 { bom: bool },
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    fn decode(bytes: &[u8]) -> Result<(String, Self), Error> {
        let invalid = || Error::InvalidResource("file is not valid Unicode text".to_string());
        match encoding_rs::Encoding::for_bom(bytes) {
            Some((encoding, bom_len)) => {
                let text = encoding
                    .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
                    .ok_or_else(invalid)?
                    .into_owned();
                let detected = if encoding == UTF_16LE {
                    TextEncoding::Utf16Le
                } else if encoding == UTF_16BE {
                    TextEncoding::Utf16Be
                } else {
                    debug_assert_eq!(encoding, UTF_8);
                    TextEncoding::Utf8 { bom: true }
                };
                Ok((text, detected))
            }
            None => {
                let text = std::str::from_utf8(bytes).map_err(|_| invalid())?;
                Ok((text.to_string(), TextEncoding::Utf8 { bom: false }))
            }
        }
    }

    fn encode(self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 { bom } => {
                let mut out = Vec::with_capacity(text.len() + 3);
                if bom {
                    out.extend_from_slice(&[0xEF, 0xBB, 0xBF]);
                }
                out.extend_from_slice(text.as_bytes());
                out
            }
            TextEncoding::Utf16Le => {
                let mut out = vec![0xFF, 0xFE];
                out.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
                out
            }
            TextEncoding::Utf16Be => {
                let mut out = vec![0xFE, 0xFF];
                out.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
                out
            }
        }
    }
}

/// An in-memory `.resx` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResxDocument {
    nodes: Vec<Node>,
    /// Node index at which appended entries are inserted.
    insert_at: usize,
    newline: &'static str,
    indent: String,
    encoding: TextEncoding,
    /// Name of a self-closing root (`<root/>`), opened up on the first append.
    empty_root: Option<String>,
}

impl ResxDocument {
    /// Parses resx markup.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut reader = Reader::from_str(text);
        let mut depth = 0usize;
        let mut spans: Vec<(usize, usize, ResxEntry)> = Vec::new();
        let mut last_child_end: Option<usize> = None;
        let mut root_content_start: Option<usize> = None;
        let mut indent: Option<String> = None;
        let mut empty_root: Option<(usize, usize, String)> = None;
        let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };

        loop {
            let start = reader.buffer_position() as usize;
            match reader.read_event()? {
                Event::Start(e) => {
                    if depth == 1 {
                        indent.get_or_insert_with(|| line_indent(text, start));
                        if e.name().as_ref() == b"data" {
                            let mut entry = parse_data_attributes(&e)?;
                            read_data_body(&mut reader, &mut entry)?;
                            let end = reader.buffer_position() as usize;
                            spans.push((start, end, entry));
                            last_child_end = Some(end);
                            continue;
                        }
                    }
                    depth += 1;
                    if depth == 1 {
                        root_content_start = Some(reader.buffer_position() as usize);
                    }
                }
                Event::Empty(e) => {
                    if depth == 0 {
                        if root_content_start.is_none() && empty_root.is_none() {
                            let end = reader.buffer_position() as usize;
                            let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                            empty_root = Some((start, end, name));
                        }
                        continue;
                    }
                    if depth == 1 {
                        indent.get_or_insert_with(|| line_indent(text, start));
                        let end = reader.buffer_position() as usize;
                        if e.name().as_ref() == b"data" {
                            spans.push((start, end, parse_data_attributes(&e)?));
                        }
                        last_child_end = Some(end);
                    }
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if depth == 1 {
                        last_child_end = Some(reader.buffer_position() as usize);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some((start, end, name)) = empty_root {
            let mut nodes = Vec::with_capacity(3);
            if start > 0 {
                nodes.push(Node::Verbatim(text[..start].to_string()));
            }
            nodes.push(Node::Verbatim(text[start..end].to_string()));
            let insert_at = nodes.len();
            if end < text.len() {
                nodes.push(Node::Verbatim(text[end..].to_string()));
            }
            return Ok(ResxDocument {
                nodes,
                insert_at,
                newline,
                indent: "  ".to_string(),
                encoding: TextEncoding::Utf8 { bom: false },
                empty_root: Some(name),
            });
        }

        let insert_point = last_child_end
            .or(root_content_start)
            .ok_or_else(|| Error::InvalidResource("missing root element".to_string()))?;

        let mut nodes = Vec::with_capacity(spans.len() * 2 + 2);
        let mut cursor = 0usize;
        for (start, end, entry) in spans {
            if start > cursor {
                nodes.push(Node::Verbatim(text[cursor..start].to_string()));
            }
            nodes.push(Node::Entry {
                entry,
                raw: Some(text[start..end].to_string()),
            });
            cursor = end;
        }
        if insert_point > cursor {
            nodes.push(Node::Verbatim(text[cursor..insert_point].to_string()));
            cursor = insert_point;
        }
        let insert_at = nodes.len();
        if cursor < text.len() {
            nodes.push(Node::Verbatim(text[cursor..].to_string()));
        }

        Ok(ResxDocument {
            nodes,
            insert_at,
            newline,
            indent: indent.unwrap_or_else(|| "  ".to_string()),
            encoding: TextEncoding::Utf8 { bom: false },
            empty_root: None,
        })
    }

    /// All entries in file order.
    pub fn entries(&self) -> impl Iterator<Item = &ResxEntry> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Entry { entry, .. } => Some(entry),
            Node::Verbatim(_) => None,
        })
    }

    pub fn find_entry(&self, name: &str) -> Option<&ResxEntry> {
        self.entries().find(|e| e.name == name)
    }

    /// Keys are compared case-sensitively.
    pub fn contains_key(&self, name: &str) -> bool {
        self.find_entry(name).is_some()
    }

    /// Appends an entry after the last child of the root element.
    pub fn push_entry(&mut self, entry: ResxEntry) -> Result<(), Error> {
        if entry.name.is_empty() {
            return Err(Error::InvalidKey(entry.name));
        }
        if self.contains_key(&entry.name) {
            return Err(Error::DuplicateKey {
                key: entry.name,
                path: PathBuf::new(),
            });
        }
        if let Some(name) = self.empty_root.take() {
            if let Some(Node::Verbatim(tag)) = self.nodes.get_mut(self.insert_at - 1) {
                let current = tag.as_str();
                let open = current.strip_suffix("/>").unwrap_or(current).trim_end().to_string();
                *tag = format!("{open}>");
            }
            let close = Node::Verbatim(format!("{}</{}>", self.newline, name));
            self.nodes.insert(self.insert_at, close);
        }
        let gap = Node::Verbatim(format!("{}{}", self.newline, self.indent));
        self.nodes.insert(self.insert_at, gap);
        self.nodes
            .insert(self.insert_at + 1, Node::Entry { entry, raw: None });
        self.insert_at += 2;
        Ok(())
    }

    /// Renders the document as text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Verbatim(text) => out.push_str(text),
                Node::Entry { raw: Some(raw), .. } => out.push_str(raw),
                Node::Entry { entry, raw: None } => out.push_str(&self.render_entry(entry)),
            }
        }
        out
    }

    /// Renders the document in its original encoding (BOM included).
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encoding.encode(&self.render())
    }

    fn render_entry(&self, entry: &ResxEntry) -> String {
        let nl = self.newline;
        let outer = &self.indent;
        let inner = self.indent.repeat(2);

        let mut out = format!("<data name=\"{}\"", escape(entry.name.as_str()));
        if let Some(type_name) = &entry.type_name {
            out.push_str(&format!(" type=\"{}\"", escape(type_name.as_str())));
        }
        if let Some(mime_type) = &entry.mime_type {
            out.push_str(&format!(" mimetype=\"{}\"", escape(mime_type.as_str())));
        }
        out.push_str(" xml:space=\"preserve\">");
        out.push_str(&format!(
            "{nl}{inner}<value>{}</value>",
            partial_escape(entry.value.as_str())
        ));
        if let Some(comment) = &entry.comment {
            out.push_str(&format!(
                "{nl}{inner}<comment>{}</comment>",
                partial_escape(comment.as_str())
            ));
        }
        out.push_str(&format!("{nl}{outer}</data>"));
        out
    }
}

impl Parser for ResxDocument {
    /// Parse from any reader, detecting a UTF-8 or UTF-16 byte order mark.
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let (text, encoding) = TextEncoding::decode(&bytes)?;
        let mut document = ResxDocument::parse(&text)?;
        document.encoding = encoding;
        Ok(document)
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        writer.write_all(&self.to_bytes()).map_err(Error::Io)
    }
}

/// Whitespace between the start of the line and `offset`, if that is all there is.
fn line_indent(text: &str, offset: usize) -> String {
    let line_start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let prefix = &text[line_start..offset];
    if !prefix.is_empty() && prefix.chars().all(|c| c == ' ' || c == '\t') {
        prefix.to_string()
    } else {
        "  ".to_string()
    }
}

fn parse_data_attributes(e: &BytesStart) -> Result<ResxEntry, Error> {
    let mut name = None;
    let mut type_name = None;
    let mut mime_type = None;

    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|e| Error::InvalidResource(e.to_string()))?;
        match attr.key.as_ref() {
            b"name" => name = Some(attr.unescape_value()?.to_string()),
            b"type" => type_name = Some(attr.unescape_value()?.to_string()),
            b"mimetype" => mime_type = Some(attr.unescape_value()?.to_string()),
            _ => {}
        }
    }
    let name = name.ok_or_else(|| Error::InvalidResource("data tag missing 'name'".to_string()))?;

    Ok(ResxEntry {
        name,
        value: String::new(),
        comment: None,
        type_name,
        mime_type,
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Value,
    Comment,
}

/// Reads the children of a `<data>` element up to and including `</data>`.
fn read_data_body(reader: &mut Reader<&[u8]>, entry: &mut ResxEntry) -> Result<(), Error> {
    let mut depth = 0usize;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                if depth == 1 {
                    field = match e.name().as_ref() {
                        b"value" => Some(Field::Value),
                        b"comment" => {
                            entry.comment = Some(String::new());
                            Some(Field::Comment)
                        }
                        _ => None,
                    };
                }
            }
            Event::Empty(e) if depth == 0 && e.name().as_ref() == b"comment" => {
                entry.comment = Some(String::new());
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                push_field(entry, field, &text);
            }
            Event::CData(t) => {
                let text = std::str::from_utf8(&t)
                    .map_err(|e| Error::InvalidResource(e.to_string()))?;
                push_field(entry, field, text);
            }
            Event::End(_) => {
                if depth == 0 {
                    return Ok(());
                }
                depth -= 1;
                if depth == 0 {
                    field = None;
                }
            }
            Event::Eof => {
                return Err(Error::InvalidResource(format!(
                    "unexpected end of file inside data '{}'",
                    entry.name
                )));
            }
            _ => {}
        }
    }
}

fn push_field(entry: &mut ResxEntry, field: Option<Field>, text: &str) {
    match field {
        Some(Field::Value) => entry.value.push_str(text),
        Some(Field::Comment) => {
            if let Some(comment) = entry.comment.as_mut() {
                comment.push_str(text);
            }
        }
        None => {}
    }
}

/// One culture-specific `.resx` file on disk.
///
/// The store holds no open handle: every operation reads the file afresh and
/// [`ResourceStore::add`] rewrites it atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceStore {
    path: PathBuf,
    culture: Culture,
}

impl ResourceStore {
    pub fn new(path: impl Into<PathBuf>, culture: Culture) -> Self {
        ResourceStore {
            path: path.into(),
            culture,
        }
    }

    /// Creates a store for `path`, classifying its culture from the file name.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let culture = culture::classify_path(path)?;
        Ok(ResourceStore::new(path, culture))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn culture(&self) -> &Culture {
        &self.culture
    }

    pub fn is_neutral(&self) -> bool {
        self.culture.is_neutral()
    }

    /// File name without the `.resx` extension, e.g. `Strings.ru`.
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string()
    }

    pub fn read(&self) -> Result<ResxDocument, Error> {
        ResxDocument::read_from(&self.path)
    }

    pub fn entries(&self) -> Result<Vec<ResxEntry>, Error> {
        Ok(self.read()?.entries().cloned().collect())
    }

    /// Read-only scan for `name`.
    pub fn exists_key(&self, name: &str) -> Result<bool, Error> {
        Ok(self.read()?.contains_key(name))
    }

    /// Appends a new entry and rewrites the whole file.
    ///
    /// The comment is only stored for the neutral culture. On any error the
    /// file on disk is left untouched.
    pub fn add(&self, name: &str, value: &str, comment: Option<&str>) -> Result<(), Error> {
        let mut document = self.read()?;
        let comment = comment
            .filter(|_| self.is_neutral())
            .map(str::to_string);

        document
            .push_entry(ResxEntry::new(name, value).with_comment(comment))
            .map_err(|e| match e {
                Error::DuplicateKey { key, .. } => Error::DuplicateKey {
                    key,
                    path: self.path.clone(),
                },
                other => other,
            })?;
        document.write_to(&self.path)?;

        tracing::info!(
            store = %self.path.display(),
            culture = %self.culture,
            key = name,
            "added resource entry"
        );
        Ok(())
    }
}
