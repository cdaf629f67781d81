use std::env;
use std::process::exit;

use reti::generator::{default_length, generate_at};
use reti::instruction::disassemble;
use reti::random::Rng;

static USAGE: &str = "\
usage: ranreti [ <option> ... ] [ <seed> [ <instructions> ] ]

where '<option>' is one of the following

  -h | --help   print this command line option summary

and '<seed>' gives the starting seed of the random number generator
(default is '0').  The number of instructions generated is picked randomly
too in the range 1..1024 unless '<instructions>' is specified explicitly.
If '<instructions>' is negative it is uniformly picked in that range.
";

const MAX_INSTRUCTIONS: u64 = 0xffff_ffff;

fn die(message: &str) -> ! {
    eprintln!("ranreti: error: {}", message);
    exit(1);
}

fn parse_decimal(text: &str, what: &str, maximum: u64) -> u64 {
    if text.is_empty() {
        die(&format!("invalid empty {} string", what));
    }

    let mut value: u64 = 0;

    for ch in text.chars() {
        let digit = match ch.to_digit(10) {
            Some(digit) => digit as u64,
            None => die(&format!("invalid {} '{}'", what, text)),
        };

        value = match value.checked_mul(10).and_then(|v| v.checked_add(digit)) {
            Some(value) if value <= maximum => value,
            _ => die(&format!("{} '{}' exceeds maximum", what, text)),
        };
    }

    value
}

fn main() {
    let mut seed_string: Option<String> = None;
    let mut instructions_string: Option<String> = None;

    for arg in env::args().skip(1) {
        if arg == "-h" || arg == "--help" {
            print!("{}", USAGE);
            return;
        } else if arg.starts_with('-') && arg.len() > 1 && seed_string.is_none() {
            die(&format!("invalid option '{}' (try '-h')", arg));
        } else if seed_string.is_none() {
            seed_string = Some(arg);
        } else if instructions_string.is_none() {
            instructions_string = Some(arg);
        } else {
            die("too many arguments (try '-h')");
        }
    }

    let seed = match &seed_string {
        Some(text) => parse_decimal(text, "seed", u64::max_value()),
        None => 0,
    };

    let mut rng = Rng::new(seed);

    let instructions = match &instructions_string {
        Some(text) => {
            if let Some(magnitude) = text.strip_prefix('-') {
                let bound = parse_decimal(magnitude, "instructions", MAX_INSTRUCTIONS);
                if bound == 0 {
                    0
                } else {
                    rng.pick(0, (bound - 1) as u32)
                }
            } else {
                parse_decimal(text, "instructions", MAX_INSTRUCTIONS) as u32
            }
        }
        None => default_length(&mut rng),
    };

    println!("; ranreti {} {}", seed, instructions);

    for pc in 0..instructions {
        let word = generate_at(&mut rng, pc, instructions);
        println!("{:<21} ; {:08x} {:08x}", disassemble(word), pc, word);
    }
}
