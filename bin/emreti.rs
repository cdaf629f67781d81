use std::env;
use std::fs;
use std::io::{self, Write};
use std::process::exit;

use reti::binary::read_words;
use reti::emulator::{dump_line, dump_line_verbose, Emulator, Halt, Step, UninitializedRead};

static USAGE: &str = "\
usage: emreti [ <option> ... ] [ <code> [ <data> ] ]

where '<option>' is one of the following

  -h | --help       print this command line option summary
  -s | --step       print a trace row for every executed instruction
  --strict          abort on reads of uninitialized data
  --quiet           ignore reads of uninitialized data
  -m | --max-steps <n>
                    stop after at most <n> steps

and '<code>' and '<data>' are binary files of 32-bit little-endian words
('-' or a missing '<code>' reads from '<stdin>').
";

fn die(message: &str) -> ! {
    eprintln!("emreti: error: {}", message);
    exit(1);
}

fn warn(message: &str) {
    eprintln!("emreti: warning: {}", message);
}

fn read_image(path: &Option<String>, what: &str) -> Vec<u32> {
    let result = match path {
        Some(path) => match fs::File::open(path) {
            Ok(file) => read_words(file),
            Err(error) => die(&format!("can not read {} file '{}': {}", what, path, error)),
        },
        None => read_words(io::stdin().lock()),
    };

    match result {
        Ok(words) => words,
        Err(error) => die(&format!("can not read {} file: {}", what, error)),
    }
}

fn main() {
    let mut step = false;
    let mut policy = UninitializedRead::Warn;
    let mut step_limit: Option<u64> = None;
    let mut code_path: Option<String> = None;
    let mut data_path: Option<String> = None;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut index = 0;

    while index < args.len() {
        let arg = &args[index];

        if arg == "-h" || arg == "--help" {
            print!("{}", USAGE);
            return;
        } else if arg == "-s" || arg == "--step" {
            step = true;
        } else if arg == "--strict" {
            policy = UninitializedRead::Strict;
        } else if arg == "--quiet" {
            policy = UninitializedRead::Quiet;
        } else if arg == "-m" || arg == "--max-steps" {
            index += 1;
            let value = match args.get(index) {
                Some(value) => value,
                None => die(&format!("option '{}' requires an argument", arg)),
            };
            step_limit = match value.parse() {
                Ok(limit) => Some(limit),
                Err(_) => die(&format!("invalid number of steps '{}'", value)),
            };
        } else if arg.starts_with('-') && arg != "-" {
            die(&format!("invalid option '{}' (try '-h')", arg));
        } else if code_path.is_none() {
            code_path = Some(arg.clone());
        } else if data_path.is_none() {
            data_path = Some(arg.clone());
        } else {
            die("more than two files specified (try '-h')");
        }

        index += 1;
    }

    let code_path = code_path.filter(|path| path != "-");
    let data_path = data_path.filter(|path| path != "-");

    let code = read_image(&code_path, "code");
    let mut emulator = Emulator::new(code);
    emulator.set_policy(policy);
    emulator.set_step_limit(step_limit);

    if data_path.is_some() {
        let data = read_image(&data_path, "data");
        if let Err(error) = emulator.load_data(&data) {
            die(&error.to_string());
        }
    }

    if step {
        eprintln!("{}", Step::trace_header());
    }

    let observer = |step_record: &Step| {
        if step {
            if let Some(row) = step_record.trace_row() {
                eprintln!("{}", row);
            }
        }
        if let Some(warning) = &step_record.warning {
            warn(&warning.to_string());
        }
    };

    let halt = match emulator.run_with(observer) {
        Ok(halt) => halt,
        Err(error) => die(&error.to_string()),
    };

    let mut exit_code = 0;

    match halt {
        Halt::EndOfCode | Halt::SelfLoop => {}
        Halt::AboveCode { pc } => {
            let top = emulator.code_len().saturating_sub(1);
            warn(&format!(
                "stopping at undefined 'code[0x{:08x}]' above 0x{:08x}",
                pc, top
            ));
        }
        Halt::StepLimit => {
            warn(&format!(
                "stopping at step limit of {} steps",
                emulator.steps()
            ));
            exit_code = 1;
        }
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    for (address, word) in emulator.dump() {
        let line = if step {
            dump_line_verbose(address, word)
        } else {
            dump_line(address, word)
        };

        if let Err(error) = writeln!(handle, "{}", line) {
            die(&format!("can not write data dump: {}", error));
        }
    }

    if exit_code != 0 {
        exit(exit_code);
    }
}
