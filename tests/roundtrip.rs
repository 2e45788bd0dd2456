//! Round-trip and idempotence tests over complete documents.

use bibtidy::{render, Parser};

const MESSY: &str = r##"
Exported from somewhere, do not edit by hand.

@string{ADS = "Astrophysics Data System"}

@PREAMBLE{"\hyphenation{post-script}"}

@Article{Knuth:1984,
    Title     = {Literate   Programming},
    Author    = "Donald E. Knuth",
    Journal   = {The Computer
                 Journal},
    Year      = "1984",
    Month     = may,
    Volume    = {27},
    Pages     = {97--111},
    note      = "part {one} and" # "part two",
}

% keep this marker
@misc{later, year = 2001}
"##;

fn canonical(src: &str) -> String {
    let doc = Parser::from_string(src.to_string()).parse().unwrap();
    render(&doc)
}

#[test]
fn formatting_is_idempotent() {
    let once = canonical(MESSY);
    let twice = canonical(&once);
    assert_eq!(once, twice, "second run must be a zero-diff");
}

#[test]
fn canonical_text_round_trips_structurally() {
    let once = canonical(MESSY);
    let doc = Parser::from_string(once.clone()).parse().unwrap();
    let again = Parser::from_string(render(&doc)).parse().unwrap();
    assert_eq!(doc, again);
}

#[test]
fn canonical_output_shape() {
    let out = canonical(MESSY);
    // one blank line between records, one trailing newline
    assert!(out.starts_with("Exported from somewhere, do not edit by hand.\n\n@STRING{ads = {Astrophysics Data System}}\n\n"));
    assert!(out.contains("@PREAMBLE{{\\hyphenation{post-script}}}"));
    assert!(out.contains("@ARTICLE{Knuth:1984,\n"));
    assert!(out.contains("        title = {Literate Programming},\n"));
    assert!(out.contains("      journal = {The Computer Journal},\n"));
    assert!(out.contains("        month = may,\n"));
    assert!(out.contains("         note = {part {one} and} # {part two},\n"));
    assert!(out.contains("\n\n% keep this marker\n\n@MISC{later,\n"));
    assert!(out.ends_with("}\n"));
    assert!(!out.ends_with("\n\n"));
}

#[test]
fn field_order_is_the_fixed_table() {
    let out = canonical(MESSY);
    let entry_start = out.find("@ARTICLE").unwrap();
    let entry = &out[entry_start..];
    let order: Vec<usize> = ["author", "title", "journal", "year", "month", "volume", "pages", "note"]
        .iter()
        .map(|field| entry.find(&format!("{field} = ")).unwrap())
        .collect();
    let mut sorted = order.clone();
    sorted.sort_unstable();
    assert_eq!(order, sorted);
}

#[test]
fn determinism_across_invocations() {
    assert_eq!(canonical(MESSY), canonical(MESSY));
}

#[test]
fn deep_brace_nesting_survives() {
    let mut inner = "x".to_string();
    for _ in 0..40 {
        inner = format!("{{{inner}}}");
    }
    let src = format!("@misc{{k, note = {{{inner}}}}}");
    let once = canonical(&src);
    assert!(once.contains(&inner));
    assert_eq!(once, canonical(&once));
}

#[test]
fn unbalanced_input_reports_position_and_yields_nothing() {
    let src = "@misc{ok, year = 2020}\n@article{bad, title = {Unterminated";
    let parser = Parser::from_string(src.to_string());
    let err = parser.parse().unwrap_err();
    assert_eq!(err.line(), 2);
    assert!(err.to_string().contains("unexpected end of file"));
}
