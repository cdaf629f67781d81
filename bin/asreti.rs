use std::env;
use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::process::exit;

use reti::assembler::assemble;
use reti::binary::write_words;

fn die(message: &str) -> ! {
    eprintln!("asreti: error: {}", message);
    exit(1);
}

fn print_usage() {
    println!("usage: asreti [ -h | --help ] [ <assembler> [ <code> ] ]");
}

fn main() {
    let mut assembler_path: Option<String> = None;
    let mut code_path: Option<String> = None;

    for arg in env::args().skip(1) {
        if arg == "-h" || arg == "--help" {
            print_usage();
            return;
        } else if arg.starts_with('-') && arg != "-" {
            die(&format!("invalid option '{}' (try '-h')", arg));
        } else if assembler_path.is_none() {
            assembler_path = Some(arg);
        } else if code_path.is_none() {
            code_path = Some(arg);
        } else {
            die("more than two files specified (try '-h')");
        }
    }

    let assembler_path = assembler_path.filter(|path| path != "-");
    let code_path = code_path.filter(|path| path != "-");

    let source = match &assembler_path {
        Some(path) => match fs::read_to_string(path) {
            Ok(source) => source,
            Err(error) => die(&format!(
                "can not read assembler file '{}': {}",
                path, error
            )),
        },
        None => {
            let mut source = String::new();
            if let Err(error) = io::stdin().read_to_string(&mut source) {
                die(&format!("can not read '<stdin>': {}", error));
            }
            source
        }
    };

    let display_path = assembler_path.as_ref().map(|p| p.as_str()).unwrap_or("<stdin>");

    let words = match assemble(&source) {
        Ok(words) => words,
        Err(error) => {
            let verbose = error.verbose(&source);
            eprintln!(
                "asreti: parse error: at line {} in '{}': {}",
                verbose.line, display_path, verbose
            );
            exit(1);
        }
    };

    let result = match &code_path {
        Some(path) => match fs::File::create(path) {
            Ok(mut file) => write_words(&mut file, &words),
            Err(error) => die(&format!("can not write code file '{}': {}", path, error)),
        },
        None => {
            if io::stdout().is_terminal() {
                die("will not write binary code to terminal");
            }
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            write_words(&mut handle, &words).and_then(|_| handle.flush())
        }
    };

    if let Err(error) = result {
        die(&format!("can not write code: {}", error));
    }
}
