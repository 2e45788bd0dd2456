//! Canonical rendering of parsed bibliography data. The same `Document`
//! always renders to the same bytes, and that text is a fixed point: parsing
//! it and rendering again changes nothing.

use std::fmt::Write;

use crate::types::{BibEntry, Document, Fragment, Record, Value};

// Fields in this list come first, in this order; everything else follows
// alphabetically.
const FIELD_ORDER: [&str; 14] = [
    "author",
    "title",
    "journal",
    "keywords",
    "year",
    "month",
    "volume",
    "pages",
    "doi",
    "archiveprefix",
    "eprint",
    "primaryclass",
    "adsurl",
    "adsnote",
];

// Mixed-case spellings restored on output for a few well-known field names.
const PRETTY_NAMES: [(&str, &str); 2] = [
    ("archiveprefix", "archivePrefix"),
    ("primaryclass", "primaryClass"),
];

// Field names are right-aligned to this width so the '=' signs line up.
const FIELD_NAME_WIDTH: usize = 13;

/// Render a document into its canonical text form. Records are separated by
/// one blank line; the output ends with exactly one trailing newline. Total
/// over well-formed documents, never fails.
pub fn render(doc: &Document) -> String {
    let blocks: Vec<String> = doc.records.iter().map(render_record).collect();
    if blocks.is_empty() {
        return String::new();
    }
    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}

fn render_record(record: &Record) -> String {
    match record {
        Record::Entry(entry) => render_entry(entry),
        Record::StringMacro { name, value } => {
            format!("@STRING{{{} = {}}}", name, render_value(value))
        }
        Record::Preamble(value) => format!("@PREAMBLE{{{}}}", render_value(value)),
        Record::Comment(text) => text
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn render_entry(entry: &BibEntry) -> String {
    let mut out = format!("@{}{{{}", entry.kind.to_uppercase(), entry.id);
    if entry.fields.is_empty() {
        out.push('}');
        return out;
    }
    out.push_str(",\n");
    let mut fields: Vec<&(String, Value)> = entry.fields.iter().collect();
    fields.sort_by(|a, b| field_rank(&a.0).cmp(&field_rank(&b.0)));
    for (name, value) in fields {
        let _ = writeln!(
            out,
            "{:>width$} = {},",
            pretty_name(name),
            render_value(value),
            width = FIELD_NAME_WIDTH
        );
    }
    out.push('}');
    out
}

fn field_rank<'n>(name: &'n str) -> (usize, &'n str) {
    match FIELD_ORDER.iter().position(|&field| field == name) {
        Some(index) => (index, name),
        None => (FIELD_ORDER.len(), name),
    }
}

fn pretty_name(name: &str) -> &str {
    PRETTY_NAMES
        .iter()
        .find(|(plain, _)| *plain == name)
        .map(|(_, pretty)| *pretty)
        .unwrap_or(name)
}

fn render_value(value: &Value) -> String {
    let parts: Vec<String> = value.fragments.iter().map(render_fragment).collect();
    parts.join(" # ")
}

fn render_fragment(fragment: &Fragment) -> String {
    match fragment {
        Fragment::Number(digits) => digits.clone(),
        Fragment::Macro(name) => name.clone(),
        Fragment::Literal { text, .. } => {
            let text = collapse_whitespace(text);
            if !text.is_empty() && text.chars().all(|chr| chr.is_ascii_digit()) {
                text
            } else {
                format!("{{{text}}}")
            }
        }
    }
}

/// Collapse every run of whitespace to a single space and trim both ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for chr in text.chars() {
        if chr.is_whitespace() {
            pending_space = true;
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(chr);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn canonical(src: &str) -> String {
        let doc = Parser::from_string(src.to_string()).parse().unwrap();
        render(&doc)
    }

    #[test]
    fn test_canonical_entry_block() {
        let out = canonical("@article{k1, title = {A   Title},\nyear=2020}");
        assert_eq!(
            out,
            "@ARTICLE{k1,\n        title = {A Title},\n         year = 2020,\n}\n"
        );
    }

    #[test]
    fn test_field_priority_then_alphabetic() {
        let out = canonical("@misc{k, zzz = {z}, year = 2020, booktitle = {B}, author = {A}}");
        assert_eq!(
            out,
            "@MISC{k,\n       author = {A},\n         year = 2020,\n    booktitle = {B},\n          zzz = {z},\n}\n"
        );
    }

    #[test]
    fn test_pretty_field_names() {
        let out = canonical("@misc{k, primaryclass = {astro-ph}, archivePrefix = {arXiv}}");
        assert!(out.contains("archivePrefix = {arXiv},\n"));
        assert!(out.contains(" primaryClass = {astro-ph},\n"));
    }

    #[test]
    fn test_quotes_rewritten_to_braces() {
        let out = canonical("@misc{k, title = \"A Title\"}");
        assert!(out.contains("title = {A Title},"));
    }

    #[test]
    fn test_concatenation_spacing() {
        let out = canonical(r##"@misc{k, title = "part {one} and" # "part two"}"##);
        assert!(out.contains("title = {part {one} and} # {part two},"));
    }

    #[test]
    fn test_macro_reference_stays_unresolved() {
        let out = canonical("@misc{k, month = jan}");
        assert!(out.contains("month = jan,"));
    }

    #[test]
    fn test_digit_literal_renders_bare() {
        let out = canonical("@misc{k, year = { 2020 }}");
        assert!(out.contains("year = 2020,"));
    }

    #[test]
    fn test_empty_value_is_representable() {
        let out = canonical("@misc{k, note = {}}");
        assert!(out.contains("note = {},"));
    }

    #[test]
    fn test_entry_without_fields() {
        assert_eq!(canonical("@misc{only}"), "@MISC{only}\n");
    }

    #[test]
    fn test_string_macro_form() {
        assert_eq!(
            canonical("@string{ads = \"Astrophysics  Data System\"}"),
            "@STRING{ads = {Astrophysics Data System}}\n"
        );
    }

    #[test]
    fn test_preamble_form() {
        assert_eq!(
            canonical("@preamble{\"\\hyphenation{post-script}\"}"),
            "@PREAMBLE{{\\hyphenation{post-script}}}\n"
        );
    }

    #[test]
    fn test_comment_kept_in_place_with_fixed_spacing() {
        let out = canonical("@misc{a, year = 2020}\n\n\n% note   \n@misc{b, year = 2021}");
        assert_eq!(
            out,
            "@MISC{a,\n         year = 2020,\n}\n\n% note\n\n@MISC{b,\n         year = 2021,\n}\n"
        );
    }

    #[test]
    fn test_multiline_value_collapses() {
        let out = canonical("@misc{k, title = {spread\n   over\n   lines}}");
        assert!(out.contains("title = {spread over lines},"));
    }

    #[test]
    fn test_idempotence() {
        let src = "junk in front\n@string{ads = \"ADS\"}\n@preamble{\"pre\"}\n\
                   @article{k1, title = \"One\" # { Two }, year = 2020, month = jan}\n\
                   % note\n@misc{k2}";
        let once = canonical(src);
        let twice = canonical(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_document_renders_empty() {
        assert_eq!(canonical("   \n  \n"), "");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \t b \n  c  "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }
}
