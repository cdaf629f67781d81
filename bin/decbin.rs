use std::env;
use std::fs;
use std::io::{self, Write};
use std::process::exit;

use reti::binary;
use reti::hex::binary_to_text;

fn die(message: &str) -> ! {
    eprintln!("decbin: error: {}", message);
    exit(1);
}

fn print_usage() {
    println!("usage: decbin [ -h | --help ] [ <input> [ <output> ] ]");
}

fn main() {
    let mut input_path: Option<String> = None;
    let mut output_path: Option<String> = None;

    for arg in env::args().skip(1) {
        if arg == "-h" || arg == "--help" {
            print_usage();
            return;
        } else if arg.starts_with('-') && arg != "-" {
            die(&format!("invalid option '{}' (try '-h')", arg));
        } else if input_path.is_none() {
            input_path = Some(arg);
        } else if output_path.is_none() {
            output_path = Some(arg);
        } else {
            die("too many files (try '-h')");
        }
    }

    let input_path = input_path.filter(|path| path != "-");
    let output_path = output_path.filter(|path| path != "-");

    let display_path = input_path.as_ref().map(|p| p.as_str()).unwrap_or("<stdin>");

    let mut output: Vec<u8> = Vec::new();

    let result = match &input_path {
        Some(path) => match fs::File::open(path) {
            Ok(file) => binary_to_text(file, &mut output),
            Err(error) => die(&format!("could not read input file '{}': {}", path, error)),
        },
        None => binary_to_text(io::stdin().lock(), &mut output),
    };

    match result {
        Ok(_) => {}
        Err(binary::Error::Incomplete(incomplete)) => {
            eprintln!(
                "decbin: parse error: at word {} byte {} in '{}': {}",
                incomplete.words, incomplete.bytes, display_path, incomplete
            );
            exit(1);
        }
        Err(binary::Error::Io(error)) => {
            die(&format!("could not read '{}': {}", display_path, error))
        }
    }

    let result = match &output_path {
        Some(path) => fs::write(path, &output).map_err(|error| (path.as_str(), error)),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(&output).map_err(|error| ("<stdout>", error))
        }
    };

    if let Err((path, error)) = result {
        die(&format!("could not write output file '{}': {}", path, error));
    }
}
