use reti::assembler::assemble;
use reti::emulator::{dump_line, Emulator, Halt};
use reti::generator::generate;
use reti::instruction::disassemble;
use reti::random::Rng;

/// The listing as `ranreti` prints it: a header comment, then one padded
/// instruction per line with the address and word in a trailing comment.
fn listing(seed: u64, words: &[u32]) -> String {
    let mut text = format!("; ranreti {} {}\n", seed, words.len());

    for (pc, &word) in words.iter().enumerate() {
        text.push_str(&format!(
            "{:<21} ; {:08x} {:08x}\n",
            disassemble(word),
            pc,
            word
        ));
    }

    text
}

#[test]
fn seeded_program_assembles_and_runs_to_the_expected_dump() {
    let seed = 1910466996612083206;
    let mut rng = Rng::new(seed);

    let words = generate(&mut rng, 4);
    let texts: Vec<String> = words.iter().map(|&word| disassemble(word)).collect();

    assert_eq!(
        texts,
        vec![
            "STOREIN2 2581947",
            "STOREIN1 15065599",
            "OPLUSI ACC 0xbc4285",
            "STOREIN2 3521395",
        ]
    );

    // The printed listing reassembles to the very same words.
    let assembled = assemble(&listing(seed, &words)).unwrap();
    assert_eq!(assembled, words);

    // Emulating with no input data leaves exactly three live words.
    let mut emulator = Emulator::new(assembled);
    assert_eq!(emulator.run().unwrap(), Halt::EndOfCode);

    let lines: Vec<String> = emulator
        .dump()
        .into_iter()
        .map(|(address, word)| dump_line(address, word))
        .collect();

    assert_eq!(
        lines,
        vec![
            "002765bb 00000000",
            "0035bb73 00bc4285",
            "00e5e1ff 00000000",
        ]
    );
}

#[test]
fn generated_listings_always_reassemble() {
    for seed in 0..20 {
        let mut rng = Rng::new(seed);
        let words = generate(&mut rng, 64);

        let assembled = assemble(&listing(seed, &words)).unwrap();
        assert_eq!(assembled, words, "seed {}", seed);
    }
}

#[test]
fn generated_programs_execute_without_faults() {
    for seed in 100..140 {
        let mut rng = Rng::new(seed);
        let words = generate(&mut rng, 32);

        // Every generated word is legal, so the only possible outcomes
        // are the regular halting conditions.
        let mut emulator = Emulator::new(words);
        emulator.set_step_limit(Some(10_000));
        emulator.run().unwrap();
    }
}
