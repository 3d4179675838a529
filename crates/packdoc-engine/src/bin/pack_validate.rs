//! `pack-validate` — check a domain-pack document against the built-in
//! schema.
//!
//! Usage:
//!   pack-validate [--format yaml|json]
//!
//! The document is read from stdin in the given format (default yaml).
//! Prints "valid" and exits 0, or prints every violation to stderr and
//! exits 1.

use std::io::{self, Read};

use packdoc_engine::{validate, DocFormat};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut format = DocFormat::Yaml;
    if args.first().map(String::as_str) == Some("--format") {
        let Some(name) = args.get(1) else {
            eprintln!("--format requires a value (yaml or json).");
            std::process::exit(1);
        };
        format = match name.parse() {
            Ok(f) => f,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        };
    }

    let mut buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buf) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let outcome = validate(&buf, format, None);
    if outcome.valid {
        println!("valid");
        return;
    }
    for violation in &outcome.errors {
        if violation.path.is_empty() {
            eprintln!("{}", violation.message);
        } else {
            eprintln!("{}: {}", violation.path, violation.message);
        }
    }
    std::process::exit(1);
}
