//! This crate formats `.bib` files deterministically, in pure, safe rust.
//!
//! `.bib` files are popular in reference management since many resources
//! allow to export metadata in a BibTeχ or BibLaTeχ file. One entry
//! in such a file can look like this:
//!
//! ```tex
//! @book{DBLP:books/aw/Knuth73a,
//!     author    = {Donald E. Knuth},
//!     title     = {The Art of Computer Programming, Volume {I:} Fundamental Algorithms,
//!                  2nd Edition},
//!     publisher = {Addison-Wesley},
//!     year      = {1973}
//! }
//! ```
//!
//! The grammar is loosely specified historically; the [biblatex package
//! documentation](https://ctan.ebinger.cc/tex-archive/macros/latex/contrib/biblatex/doc/biblatex.pdf)
//! and [Tame the BeaST](https://ftp.rrze.uni-erlangen.de/ctan/info/bibtex/tamethebeast/ttb_en.pdf)
//! provide some insights. This crate parses the format strictly — nested
//! braces, quote-delimited values, `#`-joined concatenation, `@string`
//! macros, `@preamble`s, and free text between records — and re-renders
//! everything in one fixed canonical form: fields sorted by a fixed priority
//! table, values re-delimited with braces, interior whitespace collapsed,
//! records separated by a single blank line. There are no style options, so
//! repeated runs over unchanged content are byte-identical, and the output
//! is a fixed point under re-parsing.
//!
//! ```rust
//! use bibtidy::{render, Parser};
//! use std::str::FromStr;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let p = Parser::from_str("@book{tolkien1937, author = {J. R. R. Tolkien}}")?;
//!     let doc = p.parse()?;
//!     assert_eq!(
//!         render(&doc),
//!         "@BOOK{tolkien1937,\n       author = {J. R. R. Tolkien},\n}\n"
//!     );
//!     Ok(())
//! }
//! ```
//!
//! String macro references are kept unresolved: the canonicalizer preserves
//! the reference, it never expands it. The entire source is kept in memory
//! and parsed in a single pass.

mod errors;
pub mod files;
mod lexer;
mod parser;
mod printer;
mod types;

pub use crate::errors::SyntaxError;
pub use crate::parser::{Parser, Records};
pub use crate::printer::render;
pub use crate::types::{BibEntry, Delimiter, Document, Fragment, Record, Value};
