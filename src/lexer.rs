use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::io;
use std::io::Read;
use std::mem;
use std::path;
use std::str;

use crate::errors::{SyntaxError, SyntaxErrorKind};
use crate::types::Delimiter;

/// A token is one semantic unit read from the `.bib` source. For an entry
///
/// ```tex
/// @Book{works:4,
///   author = {Shakespeare, William},
///   pages  = "1" # ps,
/// }
/// ```
///
/// the lexer emits: (RecordStart("book"), OpenRecord, RecordKey("works:4"),
/// FieldName("author"), Literal("Shakespeare, William"), FieldName("pages"),
/// Number("1"), MacroName("ps"), CloseRecord). Consecutive value tokens
/// between two field names are the `#`-joined fragments of one value.
/// Token is just the data contract between lexer and parser and not meant
/// to be externally visible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Token {
    RecordStart(String),
    OpenRecord,
    RecordKey(String),
    FieldName(String),
    Literal { text: String, delimiter: Delimiter },
    Number(String),
    MacroName(String),
    CloseRecord,
    Comment(String),
    EndOfFile,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Entry,
    StringDef,
    Preamble,
}

#[derive(PartialEq, Eq)]
pub(crate) enum LexingState {
    Junk,
    ReadingType,
    WaitForOpen,
    ReadingKey,
    WaitForComma,
    ReadingName,
    WaitForAssign,
    ReadingValueStart,
    ReadingBraced,
    ReadingQuoted,
    ReadingNumber,
    ReadingMacro,
    WaitForConcatOrEnd,
}

impl fmt::Display for LexingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Junk => "waiting for the next record",
                Self::ReadingType => "reading the record type after '@'",
                Self::ReadingKey => "reading the citation key",
                Self::WaitForOpen => "expecting '{' or '(' to open the record",
                Self::WaitForComma => "expecting ',' after the citation key",
                Self::ReadingName => "reading a field name",
                Self::WaitForAssign => "expecting '=' after the field name",
                Self::ReadingValueStart => "reading the start of a field value",
                Self::ReadingBraced => "reading brace-delimited field data",
                Self::ReadingQuoted => "reading quote-delimited field data",
                Self::ReadingNumber => "reading a numeric field value",
                Self::ReadingMacro => "reading a macro reference",
                Self::WaitForConcatOrEnd => "expecting ',', '#', or the closing delimiter",
            }
        )
    }
}

// Identifier characters for record types, field names, and macro names:
// printable ASCII minus BibTeX's reserved set.
fn is_id_char(chr: char) -> bool {
    matches!(chr, '!'..='~')
        && !matches!(
            chr,
            '"' | '#' | '%' | '\'' | '(' | ')' | ',' | '=' | '{' | '}'
        )
}

pub(crate) struct LexingIterator<'s> {
    src: &'s str,
    next_tokens: VecDeque<Token>,
    lineno: usize,
    colno: usize,
    line_start: usize, // byte offset of the current line, for error context
    state: LexingState,
    record_kind: RecordKind,
    closing: char, // '}' or ')' depending on how the record was opened
    current_id: Option<String>,
    arg_cache: String, // accumulates junk text and token arguments
    brace_level: usize,
    escaped: bool, // previous char was an odd backslash (quoted data only)
    eof: bool,
    failed: bool,
}

impl<'s> LexingIterator<'s> {
    /// lex() runs the state machine over the entire source, pushing the
    /// generated tokens to `self.next_tokens`.
    fn lex(&mut self) -> Option<SyntaxError> {
        let src = self.src;
        for (off, chr) in src.char_indices() {
            if let Err(err) = self.step(chr) {
                return Some(err);
            }
            if chr == '\n' {
                self.lineno += 1;
                self.colno = 0;
                self.line_start = off + 1;
            } else {
                self.colno += 1;
            }
        }

        if self.state != LexingState::Junk {
            return Some(SyntaxError {
                kind: SyntaxErrorKind::UnexpectedEof(self.state.to_string()),
                lineno: self.lineno,
                colno: self.colno,
                current_line: self.current_line(),
                current_id: self.current_id.clone(),
            });
        }

        self.flush_junk();
        self.next_tokens.push_back(Token::EndOfFile);
        self.eof = true;
        None
    }

    fn step(&mut self, chr: char) -> Result<(), SyntaxError> {
        match self.state {
            // between records; everything up to the next '@' is free text
            LexingState::Junk => {
                if chr == '@' {
                    self.flush_junk();
                    self.state = LexingState::ReadingType;
                } else {
                    self.arg_cache.push(chr);
                }
            }
            // expecting an identifier, e.g. “book” or “string”
            LexingState::ReadingType => {
                if is_id_char(chr) {
                    self.arg_cache.push(chr.to_ascii_lowercase());
                } else if (chr.is_whitespace() || chr == '{' || chr == '(')
                    && !self.arg_cache.is_empty()
                {
                    let kind = mem::take(&mut self.arg_cache);
                    if kind == "comment" {
                        // BibTeX does nothing with what comes after a
                        // @comment; it is inter-record noise again.
                        self.state = LexingState::Junk;
                        if !chr.is_whitespace() {
                            self.arg_cache.push(chr);
                        }
                    } else {
                        self.record_kind = match kind.as_str() {
                            "string" => RecordKind::StringDef,
                            "preamble" => RecordKind::Preamble,
                            _ => RecordKind::Entry,
                        };
                        self.next_tokens.push_back(Token::RecordStart(kind));
                        if chr.is_whitespace() {
                            self.state = LexingState::WaitForOpen;
                        } else {
                            self.open_record(chr);
                        }
                    }
                } else {
                    return Err(self.unexpected(chr, "reading the record type after '@'"));
                }
            }
            // expecting “{” or “(”
            LexingState::WaitForOpen => {
                if chr.is_whitespace() {
                    // ignore
                } else if chr == '{' || chr == '(' {
                    self.open_record(chr);
                } else {
                    return Err(self.unexpected(chr, "expecting '{' or '(' to open the record"));
                }
            }
            // expecting e.g. “DBLP:books/lib/Knuth97”
            LexingState::ReadingKey => {
                if chr == ',' || chr == self.closing {
                    if self.arg_cache.is_empty() {
                        return Err(self.unexpected(chr, "reading the citation key"));
                    }
                    self.finish_key(chr);
                } else if chr.is_whitespace() {
                    if !self.arg_cache.is_empty() {
                        self.state = LexingState::WaitForComma;
                    }
                } else {
                    self.arg_cache.push(chr);
                }
            }
            LexingState::WaitForComma => {
                if chr.is_whitespace() {
                    // ignore
                } else if chr == ',' || chr == self.closing {
                    self.finish_key(chr);
                } else {
                    return Err(self.unexpected(chr, "expecting ',' after the citation key"));
                }
            }
            // a field name, or the macro name of a @string definition
            LexingState::ReadingName => {
                if is_id_char(chr) {
                    self.arg_cache.push(chr.to_ascii_lowercase());
                } else if chr == '=' {
                    if self.arg_cache.is_empty() {
                        return Err(self.unexpected(chr, "reading a field name"));
                    }
                    self.finish_name();
                } else if chr == self.closing
                    && self.arg_cache.is_empty()
                    && self.record_kind == RecordKind::Entry
                {
                    // trailing comma before the close
                    self.close_record();
                } else if chr.is_whitespace() {
                    if !self.arg_cache.is_empty() {
                        self.state = LexingState::WaitForAssign;
                    }
                } else {
                    return Err(self.unexpected(chr, "reading a field name"));
                }
            }
            LexingState::WaitForAssign => {
                if chr.is_whitespace() {
                    // ignore
                } else if chr == '=' {
                    self.finish_name();
                } else {
                    return Err(self.unexpected(chr, "expecting '=' after the field name"));
                }
            }
            LexingState::ReadingValueStart => {
                if chr.is_whitespace() {
                    // ignore
                } else if chr == '{' {
                    self.brace_level = 0;
                    self.state = LexingState::ReadingBraced;
                } else if chr == '"' {
                    self.brace_level = 0;
                    self.escaped = false;
                    self.state = LexingState::ReadingQuoted;
                } else if chr.is_ascii_digit() {
                    self.arg_cache.push(chr);
                    self.state = LexingState::ReadingNumber;
                } else if is_id_char(chr) {
                    self.arg_cache.push(chr.to_ascii_lowercase());
                    self.state = LexingState::ReadingMacro;
                } else {
                    return Err(self.unexpected(chr, "reading the start of a field value"));
                }
            }
            // the value terminates at the matching '}' at depth zero
            LexingState::ReadingBraced => {
                if chr == '{' {
                    self.brace_level += 1;
                    self.arg_cache.push(chr);
                } else if chr == '}' {
                    if self.brace_level == 0 {
                        self.finish_literal(Delimiter::Braces);
                    } else {
                        self.brace_level -= 1;
                        self.arg_cache.push(chr);
                    }
                } else {
                    self.arg_cache.push(chr);
                }
            }
            // braces nest inside quoted data; an unescaped '"' at brace
            // depth zero terminates the value
            LexingState::ReadingQuoted => {
                if chr == '{' {
                    self.brace_level += 1;
                    self.arg_cache.push(chr);
                    self.escaped = false;
                } else if chr == '}' {
                    if self.brace_level == 0 {
                        return Err(self.unexpected(chr, "reading quote-delimited field data"));
                    }
                    self.brace_level -= 1;
                    self.arg_cache.push(chr);
                    self.escaped = false;
                } else if chr == '"' && self.brace_level == 0 && !self.escaped {
                    self.finish_literal(Delimiter::Quotes);
                } else {
                    self.escaped = chr == '\\' && !self.escaped;
                    self.arg_cache.push(chr);
                }
            }
            LexingState::ReadingNumber => {
                if chr.is_ascii_digit() {
                    self.arg_cache.push(chr);
                } else if chr.is_whitespace() {
                    let digits = mem::take(&mut self.arg_cache);
                    self.next_tokens.push_back(Token::Number(digits));
                    self.state = LexingState::WaitForConcatOrEnd;
                } else if chr == ',' || chr == '#' || chr == self.closing {
                    let digits = mem::take(&mut self.arg_cache);
                    self.next_tokens.push_back(Token::Number(digits));
                    self.after_value(chr)?;
                } else {
                    return Err(self.unexpected(chr, "reading a numeric field value"));
                }
            }
            LexingState::ReadingMacro => {
                if is_id_char(chr) {
                    self.arg_cache.push(chr.to_ascii_lowercase());
                } else if chr.is_whitespace() {
                    let name = mem::take(&mut self.arg_cache);
                    self.next_tokens.push_back(Token::MacroName(name));
                    self.state = LexingState::WaitForConcatOrEnd;
                } else if chr == ',' || chr == '#' || chr == self.closing {
                    let name = mem::take(&mut self.arg_cache);
                    self.next_tokens.push_back(Token::MacroName(name));
                    self.after_value(chr)?;
                } else {
                    return Err(self.unexpected(chr, "reading a macro reference"));
                }
            }
            LexingState::WaitForConcatOrEnd => {
                if chr.is_whitespace() {
                    // ignore
                } else if chr == ',' || chr == '#' || chr == self.closing {
                    self.after_value(chr)?;
                } else {
                    return Err(
                        self.unexpected(chr, "expecting ',', '#', or the closing delimiter")
                    );
                }
            }
        }
        Ok(())
    }

    fn open_record(&mut self, open: char) {
        self.closing = if open == '(' { ')' } else { '}' };
        self.next_tokens.push_back(Token::OpenRecord);
        self.state = match self.record_kind {
            RecordKind::Entry => LexingState::ReadingKey,
            RecordKind::StringDef => LexingState::ReadingName,
            RecordKind::Preamble => LexingState::ReadingValueStart,
        };
    }

    fn finish_key(&mut self, chr: char) {
        let key = mem::take(&mut self.arg_cache);
        self.current_id = Some(key.clone());
        self.next_tokens.push_back(Token::RecordKey(key));
        if chr == ',' {
            self.state = LexingState::ReadingName;
        } else {
            self.close_record();
        }
    }

    fn finish_name(&mut self) {
        let name = mem::take(&mut self.arg_cache);
        self.next_tokens.push_back(Token::FieldName(name));
        self.state = LexingState::ReadingValueStart;
    }

    fn finish_literal(&mut self, delimiter: Delimiter) {
        let text = mem::take(&mut self.arg_cache);
        self.next_tokens.push_back(Token::Literal { text, delimiter });
        self.state = LexingState::WaitForConcatOrEnd;
    }

    fn after_value(&mut self, chr: char) -> Result<(), SyntaxError> {
        if chr == '#' {
            self.state = LexingState::ReadingValueStart;
        } else if chr == ',' {
            if self.record_kind != RecordKind::Entry {
                return Err(self.unexpected(chr, "expecting the closing delimiter"));
            }
            self.state = LexingState::ReadingName;
        } else {
            self.close_record();
        }
        Ok(())
    }

    fn close_record(&mut self) {
        self.next_tokens.push_back(Token::CloseRecord);
        self.current_id = None;
        self.state = LexingState::Junk;
    }

    fn flush_junk(&mut self) {
        let junk = mem::take(&mut self.arg_cache);
        let junk = junk.trim();
        if !junk.is_empty() {
            self.next_tokens.push_back(Token::Comment(junk.to_string()));
        }
    }

    fn unexpected(&self, chr: char, action: &'static str) -> SyntaxError {
        SyntaxError {
            kind: SyntaxErrorKind::UnexpectedChar(chr, action),
            lineno: self.lineno,
            colno: self.colno,
            current_line: self.current_line(),
            current_id: self.current_id.clone(),
        }
    }

    fn current_line(&self) -> String {
        let rest = &self.src[self.line_start..];
        match rest.find('\n') {
            Some(end) => rest[..end].to_string(),
            None => rest.to_string(),
        }
    }
}

impl<'s> Iterator for LexingIterator<'s> {
    type Item = Result<Token, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.next_tokens.pop_front() {
                return Some(Ok(token));
            }
            if self.eof || self.failed {
                return None;
            }
            if let Some(err) = self.lex() {
                self.next_tokens.clear();
                self.failed = true;
                return Some(Err(err));
            }
        }
    }
}

pub(crate) struct Lexer {
    src: String,
}

impl Lexer {
    /// Use a file stored at a `path` as source for the lexing process.
    pub(crate) fn from_file<P: AsRef<path::Path>>(path: P) -> Result<Lexer, io::Error> {
        let mut fd = fs::File::open(path)?;
        let mut buf = String::new();
        fd.read_to_string(&mut buf)?;
        Ok(Lexer { src: buf })
    }

    /// Use a string as source for the lexing process.
    pub(crate) fn from_string(data: String) -> Lexer {
        Lexer { src: data }
    }

    pub(crate) fn iter(&self) -> LexingIterator {
        LexingIterator {
            src: &self.src,
            next_tokens: VecDeque::new(),
            lineno: 0,
            colno: 0,
            line_start: 0,
            state: LexingState::Junk,
            record_kind: RecordKind::Entry,
            closing: '}',
            current_id: None,
            arg_cache: String::new(),
            brace_level: 0,
            escaped: false,
            eof: false,
            failed: false,
        }
    }
}

impl str::FromStr for Lexer {
    type Err = io::Error;

    /// Use a string as source for the lexing process.
    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Ok(Lexer {
            src: data.to_string(),
        })
    }
}
