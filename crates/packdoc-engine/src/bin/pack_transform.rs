//! `pack-transform` — apply an operation batch to a domain-pack document.
//!
//! Usage:
//!   pack-transform [--format yaml|json] '<operations-array-json>'
//!
//! The document is read from stdin in the given format (default yaml).
//! On success the transformed document is printed to stdout in the same
//! format; on failure the phase-tagged errors go to stderr and the exit
//! code is 1, leaving the input untouched.

use std::io::{self, Read, Write};

use packdoc_engine::{transform, DocFormat};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut format = DocFormat::Yaml;
    let mut rest = args.as_slice();
    if rest.first().map(String::as_str) == Some("--format") {
        let Some(name) = rest.get(1) else {
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
        rest = &rest[2..];
    }

    let ops_text = match rest.first() {
        Some(p) => p,
        None => {
            eprintln!("First argument must be a JSON operations array.");
            std::process::exit(1);
        }
    };
    let operations: serde_json::Value = match serde_json::from_str(ops_text) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Operations argument is not valid JSON: {e}");
            std::process::exit(1);
        }
    };

    let mut buf = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut buf) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let result = transform(&buf, format, &operations, None, None);
    for warning in &result.warnings {
        eprintln!("warning: {}: {}", warning.code, warning.message);
    }
    if !result.success {
        for error in &result.errors {
            eprintln!("{error}");
        }
        std::process::exit(1);
    }

    let text = result
        .text
        .unwrap_or_else(|| result.document.to_string());
    io::stdout().write_all(text.as_bytes()).unwrap();
    if !text.ends_with('\n') {
        io::stdout().write_all(b"\n").unwrap();
    }
}
