use std::error;
use std::fmt;

// What went wrong, in terms of the lexer's current activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SyntaxErrorKind {
    UnexpectedChar(char, &'static str),
    UnexpectedEof(String),
}

/// An error raised while parsing a `.bib` source, pointing at the offending
/// position in the input.
#[derive(Debug, Clone)]
pub struct SyntaxError {
    pub(crate) kind: SyntaxErrorKind,
    pub(crate) lineno: usize,
    pub(crate) colno: usize,
    pub(crate) current_line: String,
    pub(crate) current_id: Option<String>,
}

impl SyntaxError {
    /// 1-based line of the offending character.
    pub fn line(&self) -> usize {
        self.lineno + 1
    }

    /// 1-based column of the offending character.
    pub fn column(&self) -> usize {
        self.colno + 1
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SyntaxErrorKind::UnexpectedChar(unexp, action) => {
                if let Some(id) = &self.current_id {
                    write!(
                        f,
                        "unexpected character '{unexp}' while {action} at line {lineno} col {colno} in record {id}",
                        lineno = self.line(),
                        colno = self.column(),
                    )?;
                } else {
                    write!(
                        f,
                        "unexpected character '{unexp}' while {action} at line {lineno} col {colno}",
                        lineno = self.line(),
                        colno = self.column(),
                    )?;
                }
                if !self.current_line.trim().is_empty() {
                    write!(f, "\n>> {}", self.current_line)?;
                    write!(f, "\n   {:skip$}↑ here", "", skip = self.colno)?;
                }
                Ok(())
            }
            SyntaxErrorKind::UnexpectedEof(action) => {
                write!(
                    f,
                    "unexpected end of file while {action} at line {lineno} col {colno}",
                    lineno = self.line(),
                    colno = self.column(),
                )
            }
        }
    }
}

impl error::Error for SyntaxError {}
