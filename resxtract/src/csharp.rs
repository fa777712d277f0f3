//! C# string literal location and replacement.
//!
//! [`tokenize`] is a lexer, not a parser: it splits source text into tokens
//! with byte spans so that the literal under the caret can be found and
//! replaced without touching anything else. Interpolated strings are lexed
//! (holes included) but are not treated as string literals.

use std::path::Path;

use crate::{
    error::Error,
    host::{DEFAULT_ATTEMPTS, DocumentHost, Span, TextEdit, apply_edits, commit_with_retry},
};

/// The lexical form of a string literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    /// `"a\tb"`
    Regular,
    /// `@"C:\dir"`
    Verbatim,
    /// `"""text"""`
    SingleLineRaw,
    /// `"""` on its own line, content lines, closing `"""`.
    MultiLineRaw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringLiteral {
    pub kind: LiteralKind,
    /// Number of quotes in each delimiter (1 for regular and verbatim).
    pub quotes: usize,
    /// `"u8"` or `"U8"` when the literal is a UTF-8 literal.
    pub utf8_suffix: Option<&'static str>,
    pub terminated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    LineComment,
    BlockComment,
    Directive,
    Identifier,
    Number,
    Char,
    String(StringLiteral),
    Interpolated,
    Punctuation,
}

impl TokenKind {
    /// Whitespace and comments, which belong to no token.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Splits C# source into tokens covering the whole text.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut lexer = Lexer { text, pos: 0 };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token() {
        tokens.push(token);
    }
    tokens
}

/// The non-trivia token whose span contains `offset`.
pub fn token_at(tokens: &[Token], offset: usize) -> Option<&Token> {
    tokens
        .iter()
        .find(|t| t.span.contains(offset))
        .filter(|t| !t.kind.is_trivia())
}

struct Lexer<'a> {
    text: &'a str,
    pos: usize,
}

impl Lexer<'_> {
    fn peek(&self, ahead: usize) -> Option<u8> {
        self.text.as_bytes().get(self.pos + ahead).copied()
    }

    fn eat_while(&mut self, mut pred: impl FnMut(u8) -> bool) {
        while let Some(b) = self.peek(0) {
            if !pred(b) {
                break;
            }
            self.pos += 1;
        }
    }

    fn eat_line(&mut self) {
        self.eat_while(|b| b != b'\n' && b != b'\r');
    }

    fn quote_run(&self, at: usize) -> usize {
        self.text.as_bytes()[at..]
            .iter()
            .take_while(|&&b| b == b'"')
            .count()
    }

    fn at_line_start(&self, offset: usize) -> bool {
        let line_start = self.text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
        self.text[line_start..offset]
            .bytes()
            .all(|b| b == b' ' || b == b'\t')
    }

    fn next_token(&mut self) -> Option<Token> {
        let start = self.pos;
        let b = self.peek(0)?;

        let kind = match b {
            b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c => {
                self.eat_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c));
                TokenKind::Whitespace
            }
            b'/' if self.peek(1) == Some(b'/') => {
                self.eat_line();
                TokenKind::LineComment
            }
            b'/' if self.peek(1) == Some(b'*') => {
                self.pos = match self.text[start + 2..].find("*/") {
                    Some(i) => start + 2 + i + 2,
                    None => self.text.len(),
                };
                TokenKind::BlockComment
            }
            b'#' if self.at_line_start(start) => {
                self.eat_line();
                TokenKind::Directive
            }
            b'"' => TokenKind::String(self.string()),
            b'@' if self.peek(1) == Some(b'"') => {
                self.pos += 1;
                TokenKind::String(self.verbatim())
            }
            b'@' if self.peek(1) == Some(b'$') => {
                self.pos += 1;
                self.interpolated(true)
            }
            b'$' => self.interpolated(false),
            b'\'' => {
                self.char_literal();
                TokenKind::Char
            }
            b'0'..=b'9' => {
                self.number();
                TokenKind::Number
            }
            b'.' if matches!(self.peek(1), Some(b'0'..=b'9')) => {
                self.number();
                TokenKind::Number
            }
            b'@' if self.ident_start_at(start + 1) => {
                self.pos += 1;
                self.identifier();
                TokenKind::Identifier
            }
            _ if self.ident_start_at(start) => {
                self.identifier();
                TokenKind::Identifier
            }
            _ => {
                let ch = self.text[start..].chars().next()?;
                self.pos += ch.len_utf8();
                if ch.is_whitespace() {
                    TokenKind::Whitespace
                } else {
                    TokenKind::Punctuation
                }
            }
        };

        Some(Token {
            kind,
            span: Span::new(start, self.pos),
        })
    }

    fn ident_start_at(&self, offset: usize) -> bool {
        self.text[offset..]
            .chars()
            .next()
            .is_some_and(|c| c == '_' || c.is_alphabetic())
    }

    fn identifier(&mut self) {
        for ch in self.text[self.pos..].chars() {
            if ch == '_' || ch.is_alphanumeric() {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
    }

    fn number(&mut self) {
        loop {
            match self.peek(0) {
                Some(b) if b.is_ascii_alphanumeric() || b == b'_' => self.pos += 1,
                Some(b'.') if matches!(self.peek(1), Some(b'0'..=b'9')) => self.pos += 1,
                _ => break,
            }
        }
    }

    fn char_literal(&mut self) {
        self.pos += 1;
        while let Some(b) = self.peek(0) {
            match b {
                b'\\' => self.pos += 2,
                b'\'' => {
                    self.pos += 1;
                    return;
                }
                b'\n' | b'\r' => return,
                _ => self.pos += 1,
            }
        }
        self.pos = self.pos.min(self.text.len());
    }

    /// At a `"`: regular or raw literal.
    fn string(&mut self) -> StringLiteral {
        let quotes = self.quote_run(self.pos);
        if quotes >= 3 {
            return self.raw(quotes);
        }
        if quotes == 2 {
            self.pos += 2;
            return self.finish(LiteralKind::Regular, 1, true);
        }

        self.pos += 1;
        while let Some(b) = self.peek(0) {
            match b {
                b'\\' => self.pos = (self.pos + 2).min(self.text.len()),
                b'"' => {
                    self.pos += 1;
                    return self.finish(LiteralKind::Regular, 1, true);
                }
                b'\n' | b'\r' => break,
                _ => self.pos += 1,
            }
        }
        self.finish(LiteralKind::Regular, 1, false)
    }

    /// At the `"` of `@"`.
    fn verbatim(&mut self) -> StringLiteral {
        self.pos += 1;
        while let Some(b) = self.peek(0) {
            if b == b'"' {
                if self.peek(1) == Some(b'"') {
                    self.pos += 2;
                    continue;
                }
                self.pos += 1;
                return self.finish(LiteralKind::Verbatim, 1, true);
            }
            self.pos += 1;
        }
        self.finish(LiteralKind::Verbatim, 1, false)
    }

    /// At the first of `quotes` opening quotes.
    fn raw(&mut self, quotes: usize) -> StringLiteral {
        self.pos += quotes;
        let rest_of_line = &self.text[self.pos..];
        let line_end = rest_of_line.find('\n');
        let kind = match line_end {
            Some(i) if rest_of_line[..i].trim().is_empty() => LiteralKind::MultiLineRaw,
            _ => LiteralKind::SingleLineRaw,
        };

        let terminated = self.skip_to_quote_run(quotes);
        self.finish(kind, quotes, terminated)
    }

    /// Advances past the first run of at least `quotes` quotes.
    fn skip_to_quote_run(&mut self, quotes: usize) -> bool {
        while self.pos < self.text.len() {
            let run = self.quote_run(self.pos);
            if run >= quotes {
                self.pos += quotes;
                return true;
            }
            self.pos += run.max(1);
        }
        self.pos = self.text.len();
        false
    }

    fn finish(&mut self, kind: LiteralKind, quotes: usize, terminated: bool) -> StringLiteral {
        let mut utf8_suffix = None;
        if terminated {
            let rest = &self.text[self.pos..];
            for suffix in ["u8", "U8"] {
                if rest.starts_with(suffix) && !self.ident_continues_at(self.pos + 2) {
                    utf8_suffix = Some(suffix);
                    self.pos += 2;
                    break;
                }
            }
        }
        StringLiteral {
            kind,
            quotes,
            utf8_suffix,
            terminated,
        }
    }

    fn ident_continues_at(&self, offset: usize) -> bool {
        self.text
            .get(offset..)
            .and_then(|s| s.chars().next())
            .is_some_and(|c| c == '_' || c.is_alphanumeric())
    }

    /// At the `$` run (after an optional leading `@`).
    fn interpolated(&mut self, mut verbatim: bool) -> TokenKind {
        let dollars = self.text.as_bytes()[self.pos..]
            .iter()
            .take_while(|&&b| b == b'$')
            .count();
        self.pos += dollars;
        if self.peek(0) == Some(b'@') {
            verbatim = true;
            self.pos += 1;
        }
        if self.peek(0) != Some(b'"') {
            return TokenKind::Punctuation;
        }

        let quotes = self.quote_run(self.pos);
        if quotes >= 3 && !verbatim {
            self.pos += quotes;
            self.skip_to_quote_run(quotes);
            return TokenKind::Interpolated;
        }

        self.pos += 1;
        while let Some(b) = self.peek(0) {
            match b {
                b'\\' if !verbatim => self.pos = (self.pos + 2).min(self.text.len()),
                b'"' if verbatim && self.peek(1) == Some(b'"') => self.pos += 2,
                b'"' => {
                    self.pos += 1;
                    break;
                }
                b'\n' | b'\r' if !verbatim => break,
                b'{' if self.peek(1) == Some(b'{') => self.pos += 2,
                b'{' => {
                    self.pos += 1;
                    self.skip_hole();
                }
                _ => self.pos += 1,
            }
        }
        TokenKind::Interpolated
    }

    /// Skips an interpolation hole up to and including its closing `}`.
    fn skip_hole(&mut self) {
        let mut depth = 1usize;
        while let Some(token) = self.next_token() {
            if token.kind == TokenKind::Punctuation {
                match &self.text[token.span.start..token.span.end] {
                    "{" => depth += 1,
                    "}" => {
                        depth -= 1;
                        if depth == 0 {
                            return;
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Escapes text for a regular `"…"` literal.
pub fn escape_regular(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 2);
    for ch in content.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Builds a literal of the same form as `original` holding `content`.
///
/// `original_text` is the source text of the original token; it supplies the
/// newline style and closing indentation of multi-line raw literals.
pub fn render_literal(original: &StringLiteral, original_text: &str, content: &str) -> String {
    let suffix = original.utf8_suffix.unwrap_or("");
    match original.kind {
        LiteralKind::Regular => format!("\"{}\"{}", escape_regular(content), suffix),
        LiteralKind::Verbatim => format!("@\"{}\"{}", content.replace('"', "\"\""), suffix),
        LiteralKind::SingleLineRaw | LiteralKind::MultiLineRaw => {
            render_raw(original, original_text, content, suffix)
        }
    }
}

fn render_raw(original: &StringLiteral, original_text: &str, content: &str, suffix: &str) -> String {
    let longest_run = content
        .split(|c| c != '"')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let delimiter = "\"".repeat(original.quotes.max(longest_run + 1).max(3));

    let single_line_ok = !content.is_empty()
        && !content.contains(['\n', '\r'])
        && !content.starts_with('"')
        && !content.ends_with('"');
    if original.kind == LiteralKind::SingleLineRaw && single_line_ok {
        return format!("{delimiter}{content}{delimiter}{suffix}");
    }

    let newline = if original_text.contains("\r\n") { "\r\n" } else { "\n" };
    let indent = closing_indent(original_text);
    let mut out = delimiter.clone();
    for line in content.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        out.push_str(newline);
        if !line.is_empty() {
            out.push_str(indent);
            out.push_str(line);
        }
    }
    out.push_str(newline);
    out.push_str(indent);
    out.push_str(&delimiter);
    out.push_str(suffix);
    out
}

/// Whitespace before the closing delimiter of a multi-line raw literal.
fn closing_indent(original_text: &str) -> &str {
    match original_text.rfind('\n') {
        Some(i) => {
            let last_line = &original_text[i + 1..];
            let width = last_line
                .bytes()
                .take_while(|&b| b == b' ' || b == b'\t')
                .count();
            &last_line[..width]
        }
        None => "",
    }
}

/// How the literal under the caret is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceMode {
    /// Replace the whole token with an expression, verbatim.
    FullToken,
    /// Keep the literal form and replace only its content.
    Content,
}

/// Replaces the string literal at a caret position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralRewriter {
    attempts: usize,
}

impl Default for LiteralRewriter {
    fn default() -> Self {
        LiteralRewriter {
            attempts: DEFAULT_ATTEMPTS,
        }
    }
}

impl LiteralRewriter {
    pub fn new(attempts: usize) -> Self {
        LiteralRewriter { attempts }
    }

    /// Finds the string literal whose token contains `offset`.
    pub fn find_literal(text: &str, offset: usize) -> Result<(Span, StringLiteral), Error> {
        let tokens = tokenize(text);
        let token = token_at(&tokens, offset).ok_or(Error::TokenNotFound(offset))?;
        match token.kind {
            TokenKind::String(literal) => Ok((token.span, literal)),
            _ => Err(Error::NotAStringLiteral(
                text[token.span.start..token.span.end].to_string(),
            )),
        }
    }

    /// Computes the new text for one snapshot.
    pub fn rewrite(
        &self,
        text: &str,
        offset: usize,
        replacement: &str,
        mode: ReplaceMode,
    ) -> Result<String, Error> {
        let (span, literal) = Self::find_literal(text, offset)?;
        let new_token = match mode {
            ReplaceMode::FullToken => replacement.to_string(),
            ReplaceMode::Content => {
                render_literal(&literal, &text[span.start..span.end], replacement)
            }
        };
        apply_edits(text, vec![TextEdit::new(span, new_token)])
    }

    /// Rewrites the literal at the document's selection start and commits it,
    /// retrying against fresh snapshots when the document moves on.
    pub fn apply<H: DocumentHost + ?Sized>(
        &self,
        host: &H,
        document: &Path,
        replacement: &str,
        mode: ReplaceMode,
    ) -> Result<String, Error> {
        commit_with_retry(host, document, self.attempts, |snapshot| {
            self.rewrite(&snapshot.text, snapshot.selection.start, replacement, mode)
        })
    }
}
