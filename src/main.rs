//! Command line tool formatting `.bib` files in place.

use std::error;
use std::fs;
use std::io;
use std::io::{Read, Write};

use bibtidy::{files, render, Parser};

use clap::Parser as CLIParser;

#[cfg(not(feature = "serde_json"))]
#[derive(clap::Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Settings {
    /// BibTeX source file(s); '-' reads stdin and writes stdout
    #[clap(value_name = "BIBFILE")]
    bibfile: Vec<String>,
}

#[cfg(feature = "serde_json")]
#[derive(clap::Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Settings {
    /// BibTeX source file(s); '-' reads stdin and writes stdout
    #[clap(value_name = "BIBFILE")]
    bibfile: Vec<String>,

    /// Print the parsed records as JSON instead of formatting
    #[clap(long)]
    json: bool,
}

fn read_source(file: &str) -> Result<String, io::Error> {
    if file == "-" {
        let mut src = String::new();
        io::stdin().read_to_string(&mut src)?;
        Ok(src)
    } else {
        fs::read_to_string(file)
    }
}

fn tidy(file: &str) -> Result<(), Box<dyn error::Error>> {
    let src = read_source(file)?;
    let mut doc = Parser::from_string(src.clone()).parse()?;
    doc.sort_entries_by_year();
    let out = render(&doc);

    if file == "-" {
        io::stdout().write_all(out.as_bytes())?;
        return Ok(());
    }
    // only touch the file when the formatted text differs
    if out != src {
        files::replace(file, &out)?;
    }
    Ok(())
}

#[cfg(feature = "serde_json")]
fn print_json(file: &str) -> Result<(), Box<dyn error::Error>> {
    let src = read_source(file)?;
    let doc = Parser::from_string(src).parse()?;
    println!("{}", serde_json::to_string(&doc)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn error::Error>> {
    let settings = Settings::parse();

    let mut bibfiles = settings.bibfile.clone();
    if bibfiles.is_empty() {
        bibfiles.push("-".to_string());
    }

    for file in &bibfiles {
        #[cfg(feature = "serde_json")]
        if settings.json {
            print_json(file).map_err(|err| format!("{file}: {err}"))?;
            continue;
        }
        tidy(file).map_err(|err| format!("{file}: {err}"))?;
    }

    Ok(())
}
