//! CLI tool for xlcells - extracts XLSX cells and outputs JSON
//!
//! Usage:
//!   xlcells_cli <input.xlsx>                     # All sheets to stdout
//!   xlcells_cli <input.xlsx> -s Sheet1,Sheet2    # Selected sheets
//!   xlcells_cli <input.xlsx> -o out.json         # Output JSON to file

#![allow(clippy::exit)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

use std::env;
use std::fs;
use std::io::{self, Write};
use xlcells::{extract_with, SheetSelector};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: xlcells_cli <input.xlsx> [-s sheet1,sheet2] [-o output.json]");
        std::process::exit(1);
    }

    let input_path = &args[1];
    let mut selector = SheetSelector::All;
    let mut output_path: Option<&String> = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "-s" if i + 1 < args.len() => {
                selector = SheetSelector::Names(
                    args[i + 1].split(',').map(str::to_string).collect(),
                );
                i += 2;
            }
            "-o" if i + 1 < args.len() => {
                output_path = Some(&args[i + 1]);
                i += 2;
            }
            other => {
                eprintln!("Unknown argument: {other}");
                std::process::exit(1);
            }
        }
    }

    // Read input file
    let data = match fs::read(input_path) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading {}: {}", input_path, e);
            std::process::exit(1);
        }
    };

    // Extract cells
    let workbook = match extract_with(&data, &selector) {
        Ok(wb) => wb,
        Err(e) => {
            eprintln!("Error extracting cells: {}", e);
            std::process::exit(1);
        }
    };

    for sheet in &workbook.sheets {
        if let Some(reason) = &sheet.error {
            eprintln!("Warning: sheet {:?} failed: {}", sheet.name, reason);
        }
    }

    // Serialize to JSON
    let json = match serde_json::to_string_pretty(&workbook) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Error serializing JSON: {}", e);
            std::process::exit(1);
        }
    };

    // Output
    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(path, &json) {
                eprintln!("Error writing {}: {}", path, e);
                std::process::exit(1);
            }
            eprintln!("Written: {}", path);
        }
        None => {
            io::stdout().write_all(json.as_bytes()).unwrap();
            println!();
        }
    }
}
