use std::env;
use std::fs;
use std::io::{self, Write};
use std::process::exit;

use reti::binary::{self, read_words_exact};
use reti::instruction::disassemble;

fn die(message: &str) -> ! {
    eprintln!("disreti: error: {}", message);
    exit(1);
}

fn print_usage() {
    println!("usage: disreti [ -h | --help ] [ <code> [ <assembler> ] ]");
}

fn main() {
    let mut code_path: Option<String> = None;
    let mut assembler_path: Option<String> = None;

    for arg in env::args().skip(1) {
        if arg == "-h" || arg == "--help" {
            print_usage();
            return;
        } else if arg.starts_with('-') && arg != "-" {
            die(&format!("invalid option '{}' (try '-h')", arg));
        } else if code_path.is_none() {
            code_path = Some(arg);
        } else if assembler_path.is_none() {
            assembler_path = Some(arg);
        } else {
            die("more than two files specified (try '-h')");
        }
    }

    let code_path = code_path.filter(|path| path != "-");
    let assembler_path = assembler_path.filter(|path| path != "-");

    let display_path = code_path.as_ref().map(|p| p.as_str()).unwrap_or("<stdin>");

    let result = match &code_path {
        Some(path) => match fs::File::open(path) {
            Ok(file) => read_words_exact(file),
            Err(error) => die(&format!("can not read code file '{}': {}", path, error)),
        },
        None => read_words_exact(io::stdin().lock()),
    };

    let words = match result {
        Ok(words) => words,
        Err(binary::Error::Incomplete(incomplete)) => {
            eprintln!(
                "disreti: parse error: at word {} byte {} in '{}': {}",
                incomplete.words, incomplete.bytes, display_path, incomplete
            );
            exit(1);
        }
        Err(binary::Error::Io(error)) => {
            die(&format!("can not read '{}': {}", display_path, error))
        }
    };

    let mut listing = String::new();
    for word in words {
        listing.push_str(&disassemble(word));
        listing.push('\n');
    }

    let result = match &assembler_path {
        Some(path) => fs::write(path, &listing).map_err(|error| (path.as_str(), error)),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(listing.as_bytes())
                .map_err(|error| ("<stdout>", error))
        }
    };

    if let Err((path, error)) = result {
        die(&format!("can not write assembler file '{}': {}", path, error));
    }
}
