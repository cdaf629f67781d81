use std::env;
use std::io::{self, BufRead, Write};
use std::process::exit;
use std::time::{SystemTime, UNIX_EPOCH};

use reti::quiz::{next_question, Question};
use reti::random::Rng;

static USAGE: &str = "\
usage: retiquiz [ <option> ... ] [ <seed> ] [ <questions> ]

where '<option>' is one of the following

  -h | --help             print this command line option summary
  -n | --non-interactive  only prints questions

This tool generates questions around the ReTI assembler language.
By default '16' random questions are asked (set with '<questions>').
If seed is '-' then still a random seed is generated which is useful
if a different number of questions is needed.
";

fn die(message: &str) -> ! {
    eprintln!("retiquiz: error: {}", message);
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

/// A seed for quizzes that did not ask for a reproducible one: the clock
/// hashed through the generator and mixed with the process id.
fn random_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0);

    let hashed = Rng::new(nanos).next_u64();
    Rng::new(hashed ^ u64::from(std::process::id())).next_u64()
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}

fn print_question(question: &Question, pc: u64) {
    print!("{:<19} ; {:08x} {}", question.instruction, pc, question.query());
}

fn main() {
    let mut interactive = true;
    let mut seed_string: Option<String> = None;
    let mut questions_string: Option<String> = None;

    for arg in env::args().skip(1) {
        if arg == "-h" || arg == "--help" {
            print!("{}", USAGE);
            return;
        } else if arg == "-n" || arg == "--non-interactive" {
            interactive = false;
        } else if arg.starts_with('-') && arg.len() > 1 {
            die(&format!("invalid option '{}' (try '-h')", arg));
        } else if seed_string.is_none() {
            seed_string = Some(arg);
        } else if questions_string.is_none() {
            questions_string = Some(arg);
        } else {
            die("too many arguments (try '-h')");
        }
    }

    let seed = match &seed_string {
        Some(text) if text != "-" => parse_decimal(text, "seed", u64::max_value()),
        _ => random_seed(),
    };

    let ask = match &questions_string {
        Some(text) => parse_decimal(text, "number of questions", 1 << 32),
        None => 16,
    };

    let mut rng = Rng::new(seed);
    let start = SystemTime::now();

    println!("retiquiz {} {}", seed, ask);

    if interactive {
        println!("Answer with a hexadecimal digit, an empty line to skip");
        println!("a question, or 'q' to quit.");
        println!("Asking {} questions.", ask);
        println!("INSTRUCTION         ; PC       CODE");
    } else {
        println!("INSTRUCTION         ; PC       QUERY    SOLUTION     CODE");
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();

    let mut asked: u64 = 0;
    let mut answered: u64 = 0;
    let mut skipped: u64 = 0;
    let mut correct: u64 = 0;
    let mut incorrect: u64 = 0;
    let mut pc: u64 = 0;

    while asked != ask {
        let question = next_question(&mut rng);
        asked += 1;

        print_question(&question, pc);
        pc += 1;

        if !interactive {
            println!(
                "     {}    {}",
                question.solution_digit(),
                question.solution()
            );
            continue;
        }

        print!(" ? ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        if input.read_line(&mut line).unwrap_or(0) == 0 {
            println!();
            break;
        }

        let answer = line.trim();

        if answer == "q" {
            break;
        }

        let nibble = match answer.chars().next().and_then(|ch| ch.to_digit(16)) {
            Some(nibble) => nibble,
            None => {
                skipped += 1;
                println!("skipped, solution was {}", question.solution());
                continue;
            }
        };

        answered += 1;

        if question.check(nibble) {
            correct += 1;
            println!("correct");
        } else {
            incorrect += 1;
            let low = 4 * (7 - question.position);
            let high = low + 3;
            println!(
                "incorrect, expected {} in {} at I[{}:{}]",
                question.solution_digit(),
                question.solution(),
                high,
                low
            );
        }
    }

    if interactive {
        println!("RESULT");
        println!(
            "asked     {:3.0}% {:4}/{}",
            percent(asked, ask),
            asked,
            ask
        );
        println!(
            "answered  {:3.0}% {:4}/{}",
            percent(answered, asked),
            answered,
            asked
        );
        println!(
            "skipped   {:3.0}% {:4}/{}",
            percent(skipped, asked),
            skipped,
            asked
        );
        println!(
            "correct   {:3.0}% {:4}/{}",
            percent(correct, asked),
            correct,
            asked
        );
        println!(
            "incorrect {:3.0}% {:4}/{}",
            percent(incorrect, asked),
            incorrect,
            asked
        );

        println!("POINTS");
        if correct < incorrect {
            println!("0 points   (more answers incorrect than correct)");
        } else {
            println!(
                "{} points {:.0}%   ({} correct - {} incorrect)",
                correct - incorrect,
                percent(correct, ask),
                correct,
                incorrect
            );
        }

        if let Ok(elapsed) = start.elapsed() {
            println!("TIME");
            println!("{:.2} seconds", elapsed.as_secs_f64());
        }
    }
}
