use reti::assembler::assemble;
use reti::emulator::{dump_line, Emulator, Halt, RuntimeError, UninitializedRead};

fn machine(source: &str) -> Emulator {
    Emulator::new(assemble(source).unwrap())
}

#[test]
fn self_jump_halts_with_empty_data() {
    // The unused bit 26 is set on purpose; the word still reads JUMP 0.
    let mut emulator = Emulator::new(vec![0xfc00_0000]);

    assert_eq!(emulator.run().unwrap(), Halt::SelfLoop);
    assert_eq!(emulator.steps(), 1);
    assert!(emulator.dump().is_empty());
}

#[test]
fn conditional_jump_taken_and_not_taken() {
    // JUMP= 2 sits at address 5.
    let source = "NOP\nNOP\nNOP\nNOP\nNOP\nJUMP= 2\nNOP\n";

    let mut emulator = machine(source);
    assert_eq!(emulator.run().unwrap(), Halt::EndOfCode);
    assert_eq!(emulator.pc, 7);

    let mut emulator = machine(source);
    emulator.acc = 1;
    for _ in 0..6 {
        emulator.step().unwrap();
    }
    assert_eq!(emulator.pc, 6);
}

#[test]
fn illegal_instruction_reports_pc() {
    let mut emulator = Emulator::new(vec![0xc000_0000, 0x0000_0000]);
    let error = emulator.run().unwrap_err();

    assert_eq!(error, RuntimeError::IllegalInstruction { pc: 1, word: 0 });
    assert_eq!(
        error.to_string(),
        "illegal instruction 0x00000000 at 'code[0x00000001]'"
    );
}

#[test]
fn arithmetic_wraps_modulo_two_to_the_32() {
    let mut emulator = machine(
        "LOADI ACC 0\nSUBI ACC 1\nADDI ACC 1\nADDI ACC -1\nSTORE 0\nLOAD ACC 0\nADD ACC 0\n",
    );
    emulator.step().unwrap();
    emulator.step().unwrap();
    assert_eq!(emulator.acc, 0xffff_ffff);
    emulator.step().unwrap();
    assert_eq!(emulator.acc, 0);
    emulator.step().unwrap();
    assert_eq!(emulator.acc, 0xffff_ffff);
    emulator.step().unwrap(); // M[0] = 0xffffffff
    emulator.step().unwrap();
    emulator.step().unwrap(); // ACC = 0xffffffff + 0xffffffff
    assert_eq!(emulator.acc, 0xffff_fffe);
}

#[test]
fn bitwise_operations_use_unsigned_immediates() {
    let mut emulator = machine("ORI ACC 0xff0\nANDI ACC 0xf0\nOPLUSI ACC 0xff\n");
    assert_eq!(emulator.run().unwrap(), Halt::EndOfCode);
    assert_eq!(emulator.acc, 0x0f);
}

#[test]
fn move_copies_between_registers() {
    let mut emulator = machine("LOADI IN2 9\nMOVE IN2 ACC\nMOVE ACC IN1\n");
    assert_eq!(emulator.run().unwrap(), Halt::EndOfCode);
    assert_eq!(emulator.acc, 9);
    assert_eq!(emulator.in1, 9);
    assert_eq!(emulator.in2, 9);
}

#[test]
fn data_high_water_is_monotonic() {
    let mut emulator = machine("STORE 100\nSTORE 3\nSTORE 100\nSTORE 50\n");

    let mut previous = emulator.data_high_water();
    while let Ok(step) = emulator.step() {
        let current = emulator.data_high_water();
        assert!(current >= previous);
        previous = current;
        if step.halt.is_some() {
            break;
        }
    }

    assert_eq!(previous, 101);
}

#[test]
fn loaded_data_image_is_valid_and_dumped() {
    let mut emulator = machine("LOAD ACC 1\nADDI ACC 1\nSTORE 1\n");
    emulator.load_data(&[10, 20, 30]).unwrap();

    assert_eq!(emulator.run().unwrap(), Halt::EndOfCode);
    assert_eq!(
        emulator.dump(),
        vec![(0, 10), (1, 21), (2, 30)]
    );
}

#[test]
fn strict_mode_stops_on_uninitialized_reads() {
    let mut emulator = machine("LOADIN2 ACC 17\n");
    emulator.set_policy(UninitializedRead::Strict);

    assert_eq!(
        emulator.run(),
        Err(RuntimeError::UninitializedRead { address: 17 })
    );
}

#[test]
fn reading_beyond_the_loaded_image_warns_by_default() {
    let mut emulator = machine("LOAD ACC 2\n");
    emulator.load_data(&[1, 2]).unwrap();

    let step = emulator.step().unwrap();
    assert!(step.warning.is_some());
}

#[test]
fn capacity_limits_writes() {
    let code = assemble("STORE 100\n").unwrap();
    let mut emulator = Emulator::with_capacity(code, 16).unwrap();

    assert_eq!(
        emulator.run(),
        Err(RuntimeError::WriteAboveCapacity { address: 100, capacity: 16 })
    );

    let code = assemble("NOP\n").unwrap();
    assert!(Emulator::with_capacity(code, 0).is_err());
}

#[test]
fn pc_exactly_one_past_the_end_is_a_clean_exit() {
    let mut emulator = machine("JUMP 1\n");
    assert_eq!(emulator.run().unwrap(), Halt::EndOfCode);

    let mut emulator = machine("JUMP 2\n");
    assert_eq!(emulator.run().unwrap(), Halt::AboveCode { pc: 2 });
}

#[test]
fn undefined_trace_row_after_the_image() {
    let mut emulator = machine("NOP\n");
    emulator.step().unwrap();

    let step = emulator.step().unwrap();
    assert_eq!(step.halt, Some(Halt::EndOfCode));

    let row = step.trace_row().unwrap();
    assert!(row.contains("<undefined>"));
}

#[test]
fn infinite_loop_trace_row() {
    let mut emulator = machine("JUMP 0\n");
    let step = emulator.step().unwrap();

    assert_eq!(step.halt, Some(Halt::SelfLoop));
    assert!(step.trace_row().unwrap().contains("<infinite-loop>"));
}

#[test]
fn step_limit_halts_the_bouncing_program() {
    let mut emulator = machine("NOP\nJUMP -1\n");
    emulator.set_step_limit(Some(1000));

    assert_eq!(emulator.run().unwrap(), Halt::StepLimit);
    assert_eq!(emulator.steps(), 1000);
}

#[test]
fn dump_lines_are_address_word_pairs() {
    let mut emulator = machine("LOADI ACC 66\nSTORE 16\nLOADI ACC 67\nSTORE 18\n");
    assert_eq!(emulator.run().unwrap(), Halt::EndOfCode);

    let lines: Vec<String> = emulator
        .dump()
        .into_iter()
        .map(|(address, word)| dump_line(address, word))
        .collect();

    assert_eq!(lines, vec!["00000010 00000042", "00000012 00000043"]);
}
