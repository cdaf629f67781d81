use reti::assembler::assemble;
use reti::instruction::{disassemble, Instruction};

/// Canonical words covering every instruction with assorted operands.
fn sample_words() -> Vec<u32> {
    let mut words = Vec::new();

    // Load class with every destination and immediate extremes.
    for destination in 0..4u32 {
        words.push(0x4000_0000 | destination << 24); // LOAD D 0
        words.push(0x5000_0001 | destination << 24); // LOADIN1 D 1
        words.push(0x60ff_ffff | destination << 24); // LOADIN2 D 16777215
        words.push(0x7000_002a | destination << 24); // LOADI D 42
    }

    // Store class and MOVE over all register pairs.
    words.push(0x8000_0000);
    words.push(0x90ab_cdef);
    words.push(0xa0ff_ffff);
    for source in 0..4u32 {
        for destination in 0..4u32 {
            words.push(0xb000_0000 | source << 26 | destination << 24);
        }
    }

    // Compute class: positive, negative and mask immediates.
    for &prefix in &[0x02u32, 0x03, 0x0a, 0x0b] {
        words.push(prefix << 26 | 3 << 24 | 0x00_0005); // positive
        words.push(prefix << 26 | 3 << 24 | 0xff_fffb); // negative
    }
    for &prefix in &[0x04u32, 0x05, 0x06, 0x0c, 0x0d, 0x0e] {
        words.push(prefix << 26 | 3 << 24 | 0xbc_4285);
        words.push(prefix << 26 | 1 << 24 | 0x00_0000);
    }

    // Jump class with both offset signs.
    words.push(0xc000_0000); // NOP
    for condition in 1..8u32 {
        let prefix = (0x18 | condition) << 27;
        words.push(prefix | 0x00_0003);
        words.push(prefix | 0xff_fffd);
    }

    words
}

#[test]
fn decode_then_encode_is_identity_on_canonical_words() {
    for word in sample_words() {
        let instruction = Instruction::decode(word).unwrap();
        assert_eq!(instruction.encode(), word, "word 0x{:08x}", word);
    }
}

#[test]
fn disassembled_text_reassembles_to_the_same_word() {
    for word in sample_words() {
        let text = disassemble(word);
        let line = format!("{}\n", text);
        let reassembled = assemble(&line)
            .unwrap_or_else(|error| panic!("{} did not reassemble: {}", text, error));
        assert_eq!(reassembled, vec![word], "{}", text);
    }
}

#[test]
fn assembler_idempotence_over_a_listing() {
    let source = "\
        LOADI ACC 42\n\
        STORE 7\n\
        LOAD IN1 7\n\
        MOVE IN1 ACC\n\
        SUBI ACC -17\n\
        OPLUS ACC 0x5\n\
        JUMP> -3\n\
        NOP\n\
        JUMP 1\n";

    let first = assemble(source).unwrap();

    let mut listing = String::new();
    for &word in &first {
        listing.push_str(&disassemble(word));
        listing.push('\n');
    }

    let second = assemble(&listing).unwrap();
    assert_eq!(first, second);

    // And the listing is already canonical text.
    let mut relisting = String::new();
    for &word in &second {
        relisting.push_str(&disassemble(word));
        relisting.push('\n');
    }
    assert_eq!(listing, relisting);
}

#[test]
fn dont_care_bits_decode_but_do_not_survive_reencoding() {
    // Store words with junk in S and D, jump words with junk in the three
    // unused bits: the decoder ignores the junk and the canonical encoding
    // clears it.
    let cases = &[
        (0xa327_65bbu32, 0xa027_65bbu32, "STOREIN2 2581947"),
        (0xfc00_0000, 0xf800_0000, "JUMP 0"),
        (0xc700_0000, 0xc000_0000, "NOP"),
    ];

    for &(raw, canonical, text) in cases {
        let instruction = Instruction::decode(raw).unwrap();
        assert_eq!(instruction.to_string(), text);
        assert_eq!(instruction.encode(), canonical);
    }
}

#[test]
fn illegal_words_disassemble_as_illegal() {
    for &word in &[0x0000_0000u32, 0x0400_0000, 0x1c00_0000, 0x3fff_ffff] {
        assert!(Instruction::decode(word).is_none(), "word 0x{:08x}", word);
        assert_eq!(disassemble(word), "ILLEGAL");
    }
}
