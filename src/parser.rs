use std::io;
use std::mem;
use std::path;
use std::str;

use crate::errors::SyntaxError;
use crate::lexer;
use crate::lexer::Token;
use crate::types::{BibEntry, Document, Fragment, Record, Value};

/// Parser turning a `.bib` source into a sequence of `Record` instances
pub struct Parser {
    lexer: lexer::Lexer,
}

impl Parser {
    /// Use a file at some filepath as source for the parsing process.
    pub fn from_file<P: AsRef<path::Path>>(path: P) -> Result<Parser, io::Error> {
        let lexer = lexer::Lexer::from_file(path)?;
        Ok(Parser { lexer })
    }

    /// Use a string as source for the parsing process.
    pub fn from_string(data: String) -> Parser {
        Parser {
            lexer: lexer::Lexer::from_string(data),
        }
    }

    /// Parse the entire source into a `Document`. Fails on the first
    /// syntax error; no partial document is returned.
    pub fn parse(&self) -> Result<Document, SyntaxError> {
        let mut records = Vec::new();
        for result in self.iter() {
            records.push(result?);
        }
        Ok(Document { records })
    }

    pub fn iter(&self) -> Records {
        Records {
            iter: self.lexer.iter(),
            pending: None,
            finished: false,
        }
    }
}

impl str::FromStr for Parser {
    type Err = io::Error;

    /// Use a string as source for the parsing process.
    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Ok(Parser::from_string(data.to_string()))
    }
}

// A record under construction while its tokens arrive.
struct PendingRecord {
    kind: String,
    id: String,
    fields: Vec<(String, Value)>,
    name: String,
    fragments: Vec<Fragment>,
}

impl PendingRecord {
    fn new(kind: String) -> PendingRecord {
        PendingRecord {
            kind,
            id: String::new(),
            fields: Vec::new(),
            name: String::new(),
            fragments: Vec::new(),
        }
    }

    fn commit_field(&mut self) {
        if self.name.is_empty() {
            return;
        }
        let name = mem::take(&mut self.name);
        let value = Value {
            fragments: mem::take(&mut self.fragments),
        };
        // the first occurrence wins when a field is repeated
        if self.fields.iter().all(|(existing, _)| existing != &name) {
            self.fields.push((name, value));
        }
    }

    fn finish(mut self) -> Record {
        match self.kind.as_str() {
            "preamble" => Record::Preamble(Value {
                fragments: self.fragments,
            }),
            "string" => {
                self.commit_field();
                match self.fields.pop() {
                    Some((name, value)) => Record::StringMacro { name, value },
                    // the lexer always supplies exactly one name/value pair
                    None => Record::StringMacro {
                        name: String::new(),
                        value: Value {
                            fragments: Vec::new(),
                        },
                    },
                }
            }
            _ => {
                self.commit_field();
                Record::Entry(BibEntry {
                    kind: self.kind,
                    id: self.id,
                    fields: self.fields,
                })
            }
        }
    }
}

/// A stateful iterator yielding one `Record` after another
pub struct Records<'i> {
    iter: lexer::LexingIterator<'i>,
    pending: Option<PendingRecord>,
    finished: bool,
}

impl Records<'_> {
    // Consumes one token; returns a record when one completes.
    fn step(&mut self) -> Option<Result<Record, SyntaxError>> {
        let token = match self.iter.next() {
            Some(Ok(token)) => token,
            Some(Err(err)) => {
                self.finished = true;
                return Some(Err(err));
            }
            None => {
                self.finished = true;
                return None;
            }
        };
        match token {
            Token::Comment(text) => return Some(Ok(Record::Comment(text))),
            Token::RecordStart(kind) => self.pending = Some(PendingRecord::new(kind)),
            Token::OpenRecord | Token::EndOfFile => {}
            Token::RecordKey(id) => {
                if let Some(pending) = &mut self.pending {
                    pending.id = id;
                }
            }
            Token::FieldName(name) => {
                if let Some(pending) = &mut self.pending {
                    pending.commit_field();
                    pending.name = name;
                }
            }
            Token::Literal { text, delimiter } => {
                if let Some(pending) = &mut self.pending {
                    pending.fragments.push(Fragment::Literal { text, delimiter });
                }
            }
            Token::Number(digits) => {
                if let Some(pending) = &mut self.pending {
                    pending.fragments.push(Fragment::Number(digits));
                }
            }
            Token::MacroName(name) => {
                if let Some(pending) = &mut self.pending {
                    pending.fragments.push(Fragment::Macro(name));
                }
            }
            Token::CloseRecord => {
                if let Some(pending) = self.pending.take() {
                    return Some(Ok(pending.finish()));
                }
            }
        }
        None
    }
}

impl Iterator for Records<'_> {
    type Item = Result<Record, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }
            if let Some(result) = self.step() {
                return Some(result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Delimiter;
    use std::str::FromStr;

    fn braced(text: &str) -> Fragment {
        Fragment::Literal {
            text: text.to_string(),
            delimiter: Delimiter::Braces,
        }
    }

    #[test]
    fn test_tolkien() -> Result<(), SyntaxError> {
        let p = Parser::from_string("@book{tolkien1937, author = {J. R. R. Tolkien}}".to_string());
        let doc = p.parse()?;
        assert_eq!(doc.records.len(), 1);
        let entry = doc.entries().next().unwrap();
        assert_eq!(entry.kind, "book");
        assert_eq!(entry.id, "tolkien1937");
        assert_eq!(
            entry.get("author").unwrap().fragments,
            vec![braced("J. R. R. Tolkien")]
        );
        Ok(())
    }

    #[test]
    fn test_taocp() -> Result<(), SyntaxError> {
        let src = r#"@book{DBLP:books/lib/Knuth97,
  author    = {Donald Ervin Knuth},
  title     = {The art of computer programming, Volume {I:} Fundamental Algorithms,
               3rd Edition},
  publisher = {Addison-Wesley},
  year      = {1997},
  bibsource = {{dblp computer science bibliography}, https://dblp.org}
}"#;
        let p = Parser::from_str(src).unwrap();
        let doc = p.parse()?;
        let entry = doc.entries().next().unwrap();
        assert_eq!(entry.kind, "book");
        assert_eq!(entry.id, "DBLP:books/lib/Knuth97");
        assert_eq!(entry.get("year").unwrap().fragments, vec![braced("1997")]);
        assert_eq!(
            entry.get("bibsource").unwrap().fragments,
            vec![braced("{dblp computer science bibliography}, https://dblp.org")]
        );
        // the multi-line title keeps its raw interior, newline included
        let title = &entry.get("title").unwrap().fragments;
        assert!(matches!(&title[..], [Fragment::Literal { text, .. }] if text.contains('\n')));
        Ok(())
    }

    #[test]
    fn test_fragment_kinds_survive() -> Result<(), SyntaxError> {
        let p = Parser::from_string(
            r##"@article{k, title = "part {one} and" # "part two", month = jan, year = 2020}"##
                .to_string(),
        );
        let doc = p.parse()?;
        let entry = doc.entries().next().unwrap();
        assert_eq!(
            entry.get("title").unwrap().fragments,
            vec![
                Fragment::Literal {
                    text: "part {one} and".to_string(),
                    delimiter: Delimiter::Quotes,
                },
                Fragment::Literal {
                    text: "part two".to_string(),
                    delimiter: Delimiter::Quotes,
                },
            ]
        );
        assert_eq!(
            entry.get("month").unwrap().fragments,
            vec![Fragment::Macro("jan".to_string())]
        );
        assert_eq!(
            entry.get("year").unwrap().fragments,
            vec![Fragment::Number("2020".to_string())]
        );
        Ok(())
    }

    #[test]
    fn test_string_and_preamble_records() -> Result<(), SyntaxError> {
        let p = Parser::from_string(
            "@string{ads = \"Astrophysics Data System\"}\n@preamble{{\\hyphenation{post-script}}}"
                .to_string(),
        );
        let doc = p.parse()?;
        assert_eq!(doc.records.len(), 2);
        assert!(matches!(
            &doc.records[0],
            Record::StringMacro { name, .. } if name == "ads"
        ));
        assert!(matches!(
            &doc.records[1],
            Record::Preamble(value) if value.fragments == vec![braced("\\hyphenation{post-script}")]
        ));
        Ok(())
    }

    #[test]
    fn test_comment_between_entries() -> Result<(), SyntaxError> {
        let p = Parser::from_string(
            "@misc{a, year = 2020}\n% hand-written note\n@misc{b, year = 2021}".to_string(),
        );
        let doc = p.parse()?;
        assert_eq!(doc.records.len(), 3);
        assert!(matches!(
            &doc.records[1],
            Record::Comment(text) if text == "% hand-written note"
        ));
        Ok(())
    }

    #[test]
    fn test_duplicate_field_keeps_first() -> Result<(), SyntaxError> {
        let p = Parser::from_string("@misc{k, year = 2020, year = 2021}".to_string());
        let doc = p.parse()?;
        let entry = doc.entries().next().unwrap();
        assert_eq!(entry.fields.len(), 1);
        assert_eq!(
            entry.get("year").unwrap().fragments,
            vec![Fragment::Number("2020".to_string())]
        );
        Ok(())
    }

    #[test]
    fn test_parse_fails_without_partial_document() {
        let p = Parser::from_string(
            "@misc{good, year = 2020}\n@article{bad, title = {Unterminated".to_string(),
        );
        assert!(p.parse().is_err());
    }

    #[test]
    fn test_empty_source() -> Result<(), SyntaxError> {
        let p = Parser::from_string(String::new());
        assert!(p.parse()?.records.is_empty());
        Ok(())
    }
}
