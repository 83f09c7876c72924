use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use chord::{client::Client, Bytes, Id};

use clap::Parser;

use tracing::Level;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// Load the records of a CSV file into the first node of a ring.
///
/// Each row is stored under the concatenation of its first and fourth
/// columns, the value being the whole row. Fields may be quoted, but a quoted
/// field cannot span lines.
struct Cli {
    /// Address of the only node on the ring.
    #[arg(short, long)]
    node: SocketAddr,
    /// CSV file with a header line.
    file: PathBuf,
}

fn main() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();

    let contents = fs::read_to_string(&cli.file).expect("Failed to read the CSV file");

    let mut keys = BTreeMap::new();
    let mut skipped = 0;

    for row in contents.lines().skip(1) {
        let columns = fields(row);

        match (columns.first(), columns.get(3)) {
            (Some(first), Some(fourth)) => {
                let key = format!("{}{}", first, fourth);
                keys.insert(Id::from_key(&key), Bytes::from(row.to_string()));
            }
            _ => skipped += 1,
        }
    }

    println!("Populating {} keys to {}", keys.len(), cli.node);
    if skipped > 0 {
        println!("Skipped {} rows with less than 4 columns", skipped);
    }

    Client::default()
        .populate_keys(cli.node, keys)
        .expect("populate_keys failed");

    println!("Done");
}

/// Split a CSV row on commas outside of double quotes, unescaping `""`.
fn fields(row: &str) -> Vec<String> {
    let mut fields = vec![];
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = row.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_row() {
        assert_eq!(fields("tom,QB,NE,2000"), vec!["tom", "QB", "NE", "2000"]);
        assert_eq!(fields("a,,b"), vec!["a", "", "b"]);
    }

    #[test]
    fn quoted_comma_stays_in_its_field() {
        let columns = fields(r#""Brady, Tom",QB,"New England",2000"#);

        assert_eq!(columns, vec!["Brady, Tom", "QB", "New England", "2000"]);
        assert_eq!(format!("{}{}", columns[0], columns[3]), "Brady, Tom2000");
    }

    #[test]
    fn escaped_quote() {
        assert_eq!(fields(r#""say ""hi""",x"#), vec![r#"say "hi""#, "x"]);
    }
}
