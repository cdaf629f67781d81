use std::env;
use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::process::exit;

use reti::hex::{text_to_binary, WriteError};

fn die(message: &str) -> ! {
    eprintln!("enchex: error: {}", message);
    exit(1);
}

fn print_usage() {
    println!("usage: enchex [ -h | --help ] [ <input> [ <output> ] ]");
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

    let source = match &input_path {
        Some(path) => match fs::read_to_string(path) {
            Ok(source) => source,
            Err(error) => die(&format!("could not read input file '{}': {}", path, error)),
        },
        None => {
            let mut source = String::new();
            if let Err(error) = io::stdin().read_to_string(&mut source) {
                die(&format!("could not read '<stdin>': {}", error));
            }
            source
        }
    };

    let display_path = input_path.as_ref().map(|p| p.as_str()).unwrap_or("<stdin>");

    let mut output: Vec<u8> = Vec::new();

    match text_to_binary(&source, &mut output) {
        Ok(_) => {}
        Err(WriteError::Parse(error)) => {
            let verbose = error.verbose(&source);
            eprintln!(
                "enchex: parse error: at line {} in '{}': {}",
                verbose.line, display_path, verbose
            );
            exit(1);
        }
        Err(WriteError::Io(error)) => die(&format!("could not encode: {}", error)),
    }

    let result = match &output_path {
        Some(path) => fs::write(path, &output).map_err(|error| (path.as_str(), error)),
        None => {
            if io::stdout().is_terminal() {
                die("will not write binary data to terminal");
            }
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(&output).map_err(|error| ("<stdout>", error))
        }
    };

    if let Err((path, error)) = result {
        die(&format!("could not write output file '{}': {}", path, error));
    }
}
