use std::mem;

/// Delimiter used around a literal fragment in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Delimiter {
    /// the fragment was written as `{…}`
    Braces,
    /// the fragment was written as `"…"`
    Quotes,
}

/// One piece of a field value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Fragment {
    /// Brace- or quote-delimited text, stored without its outer delimiters.
    /// The interior is kept raw, including backslash sequences and any
    /// balanced braces.
    Literal { text: String, delimiter: Delimiter },
    /// A bare run of digits, e.g. “2020”.
    Number(String),
    /// A reference to a string macro, e.g. “jan”. References are kept
    /// unresolved; no macro table exists anywhere in this crate.
    Macro(String),
}

/// A field value: one fragment, or several joined by `#` in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Value {
    pub fragments: Vec<Fragment>,
}

/// One entry in a `.bib` file
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BibEntry {
    /// entry type, lowercased, e.g. “article”
    pub kind: String,
    /// citation key, case preserved, e.g. “DBLP:books/lib/Knuth97”
    pub id: String,
    /// fields in source order; names lowercased, e.g. “author”
    pub fields: Vec<(String, Value)>,
}

impl BibEntry {
    pub fn new(kind: String, id: String) -> BibEntry {
        BibEntry {
            kind,
            id,
            fields: Vec::new(),
        }
    }

    /// Look up a field by its lowercased name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

/// One top-level record of a `.bib` file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Record {
    /// a database entry such as `@article{…}`
    Entry(BibEntry),
    /// a `@string{name = value}` macro definition
    StringMacro { name: String, value: Value },
    /// a `@preamble{…}` payload
    Preamble(Value),
    /// non-whitespace free text between records, trimmed
    Comment(String),
}

/// An ordered sequence of records parsed from one `.bib` source.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Document {
    pub records: Vec<Record>,
}

// The standard month macros and their numeric sort value. Only used for
// ordering entries; the macro reference itself stays unresolved in output.
const MONTHS: [(&str, &str); 12] = [
    ("jan", "01"),
    ("feb", "02"),
    ("mar", "03"),
    ("apr", "04"),
    ("may", "05"),
    ("jun", "06"),
    ("jul", "07"),
    ("aug", "08"),
    ("sep", "09"),
    ("oct", "10"),
    ("nov", "11"),
    ("dec", "12"),
];

impl Document {
    /// Iterate over the entry records, skipping comments, macros and
    /// preambles.
    pub fn entries(&self) -> impl Iterator<Item = &BibEntry> {
        self.records.iter().filter_map(|record| match record {
            Record::Entry(entry) => Some(entry),
            _ => None,
        })
    }

    /// Sort entry records by (year, month, key), newest first. Non-entry
    /// records keep their original positions; the sort is stable, so a
    /// second run changes nothing.
    pub fn sort_entries_by_year(&mut self) {
        let old = mem::take(&mut self.records);
        let mut out = Vec::with_capacity(old.len());
        let mut slots = Vec::new();
        let mut entries = Vec::new();
        for record in old {
            if let Record::Entry(entry) = record {
                slots.push(out.len());
                // placeholder, overwritten below
                out.push(Record::Comment(String::new()));
                entries.push(entry);
            } else {
                out.push(record);
            }
        }
        entries.sort_by_cached_key(|entry| std::cmp::Reverse(sort_key(entry)));
        for (slot, entry) in slots.into_iter().zip(entries) {
            out[slot] = Record::Entry(entry);
        }
        self.records = out;
    }
}

fn sort_key(entry: &BibEntry) -> (String, String, String) {
    let year = entry
        .get("year")
        .map(value_sort_text)
        .unwrap_or_else(|| "0".to_string());
    let month = entry
        .get("month")
        .map(month_sort_text)
        .unwrap_or_else(|| "0".to_string());
    (year, month, entry.id.clone())
}

fn value_sort_text(value: &Value) -> String {
    value
        .fragments
        .iter()
        .map(|fragment| match fragment {
            Fragment::Literal { text, .. } => crate::printer::collapse_whitespace(text),
            Fragment::Number(digits) => digits.clone(),
            Fragment::Macro(name) => name.clone(),
        })
        .collect()
}

fn month_sort_text(value: &Value) -> String {
    if let [Fragment::Macro(name)] = &value.fragments[..] {
        if let Some((_, numeric)) = MONTHS.iter().find(|(month, _)| month == name) {
            return numeric.to_string();
        }
    }
    value_sort_text(value)
}
