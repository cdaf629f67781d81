//! Types for representing ReTI instructions and their parts.
//!
//! The 32-bit instruction word is laid out as
//!
//! ```text
//!  31 30 29 28 27 26 25 24 23                         0
//! +--+--+--+--+--+--+--+--+---------------------------+
//! |  opcode prefix  | S  | D  |       immediate i     |
//! +-----------------+----+----+-----------------------+
//! ```
//!
//! where the opcode prefix occupies up to six of the topmost bits (the
//! load, store and jump classes use fewer, leaving bits 27..26 for the
//! `S` field or unused), `D` sits in bits 25..24 and `i` is the 24-bit
//! immediate in bits 23..0.

use std::fmt;

/// Mask of the 24-bit immediate field.
pub const IMMEDIATE_MASK: u32 = 0x00ff_ffff;

/// Largest unsigned immediate accepted by the assembler.
pub const MAX_UNSIGNED_IMMEDIATE: u32 = 0x00ff_ffff;

/// Largest magnitude of a negative immediate accepted by the assembler.
pub const MAX_NEGATIVE_MAGNITUDE: u32 = 0x0080_0000;

/// Registers of the ReTI register file, indexed by a 2-bit code.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register {
    Pc,
    In1,
    In2,
    Acc,
}

impl Register {
    /// Decodes a register from the two low bits of `bits`.
    pub fn from_bits(bits: u32) -> Register {
        match bits & 3 {
            0 => Register::Pc,
            1 => Register::In1,
            2 => Register::In2,
            _ => Register::Acc,
        }
    }

    /// The 2-bit register code.
    pub fn bits(self) -> u32 {
        match self {
            Register::Pc => 0,
            Register::In1 => 1,
            Register::In2 => 2,
            Register::Acc => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::Pc => "PC",
            Register::In1 => "IN1",
            Register::In2 => "IN2",
            Register::Acc => "ACC",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comparison of ACC against zero that decides whether a jump is taken.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JumpCondition {
    /// `JUMP>`: taken if ACC is strictly positive.
    Greater,
    /// `JUMP=`: taken if ACC is zero.
    Equal,
    /// `JUMP>=`: taken if ACC is not negative.
    GreaterOrEqual,
    /// `JUMP<`: taken if ACC is negative.
    Less,
    /// `JUMP!=`: taken if ACC is not zero.
    NotEqual,
    /// `JUMP<=`: taken if ACC is not positive.
    LessOrEqual,
    /// `JUMP`: always taken.
    Unconditional,
}

impl JumpCondition {
    /// The 3-bit subcode within the jump class (bits 29..27).
    pub fn bits(self) -> u32 {
        match self {
            JumpCondition::Greater => 1,
            JumpCondition::Equal => 2,
            JumpCondition::GreaterOrEqual => 3,
            JumpCondition::Less => 4,
            JumpCondition::NotEqual => 5,
            JumpCondition::LessOrEqual => 6,
            JumpCondition::Unconditional => 7,
        }
    }

    /// Evaluates the condition on the accumulator.  Order comparisons
    /// interpret ACC as a two's complement 32-bit value.
    pub fn holds(self, acc: u32) -> bool {
        let signed = acc as i32;
        match self {
            JumpCondition::Greater => signed > 0,
            JumpCondition::Equal => acc == 0,
            JumpCondition::GreaterOrEqual => signed >= 0,
            JumpCondition::Less => signed < 0,
            JumpCondition::NotEqual => acc != 0,
            JumpCondition::LessOrEqual => signed <= 0,
            JumpCondition::Unconditional => true,
        }
    }

    /// The comparison operator as written in the mnemonic.
    pub fn symbol(self) -> &'static str {
        match self {
            JumpCondition::Greater => ">",
            JumpCondition::Equal => "=",
            JumpCondition::GreaterOrEqual => ">=",
            JumpCondition::Less => "<",
            JumpCondition::NotEqual => "!=",
            JumpCondition::LessOrEqual => "<=",
            JumpCondition::Unconditional => "",
        }
    }

    /// The operator of the complementary comparison, used when reporting a
    /// jump that was not taken.
    pub fn complement_symbol(self) -> &'static str {
        match self {
            JumpCondition::Greater => "<=",
            JumpCondition::Equal => "!=",
            JumpCondition::GreaterOrEqual => "<",
            JumpCondition::Less => ">=",
            JumpCondition::NotEqual => "=",
            JumpCondition::LessOrEqual => ">",
            JumpCondition::Unconditional => "",
        }
    }
}

/// How an instruction's immediate is rendered in assembler text.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImmediateFormat {
    /// Unsigned decimal: memory addresses and `LOADI` values.
    Unsigned,
    /// `0x`-prefixed hexadecimal: bit masks of the bitwise operations.
    Hexadecimal,
    /// Signed decimal: arithmetic operands and jump offsets.
    Signed,
}

/// Instructions of the ReTI instruction architecture.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpCode {
    /// `LOAD D i`: D ← M\[i\].
    Load,
    /// `LOADIN1 D i`: D ← M\[IN1 + i\].
    LoadIn1,
    /// `LOADIN2 D i`: D ← M\[IN2 + i\].
    LoadIn2,
    /// `LOADI D i`: D ← i, zero extended.
    LoadImmediate,
    /// `STORE i`: M\[i\] ← ACC.
    Store,
    /// `STOREIN1 i`: M\[IN1 + i\] ← ACC.
    StoreIn1,
    /// `STOREIN2 i`: M\[IN2 + i\] ← ACC.
    StoreIn2,
    /// `MOVE S D`: D ← S.
    Move,
    /// `SUBI D i`: D ← D − i, sign extended.
    SubtractImmediate,
    /// `ADDI D i`: D ← D + i, sign extended.
    AddImmediate,
    /// `OPLUSI D i`: D ← D ⊕ i.
    XorImmediate,
    /// `ORI D i`: D ← D ∨ i.
    OrImmediate,
    /// `ANDI D i`: D ← D ∧ i.
    AndImmediate,
    /// `SUB D i`: D ← D − M\[i\].
    Subtract,
    /// `ADD D i`: D ← D + M\[i\].
    Add,
    /// `OPLUS D i`: D ← D ⊕ M\[i\].
    Xor,
    /// `OR D i`: D ← D ∨ M\[i\].
    Or,
    /// `AND D i`: D ← D ∧ M\[i\].
    And,
    /// `NOP`: advances PC and nothing else.
    NoOperation,
    /// The jump family, conditional on ACC.
    Jump(JumpCondition),
}

impl OpCode {
    /// The opcode prefix positioned in the topmost bits of the word.
    ///
    /// All prefixes are given as six bit patterns; for the load and store
    /// classes the two low bits of the pattern are zero because those
    /// positions belong to the `S` field, and for jumps the lowest one
    /// belongs to the unused bits.
    pub fn prefix(self) -> u32 {
        let bits = match self {
            OpCode::Load => 0b010000,
            OpCode::LoadIn1 => 0b010100,
            OpCode::LoadIn2 => 0b011000,
            OpCode::LoadImmediate => 0b011100,
            OpCode::Store => 0b100000,
            OpCode::StoreIn1 => 0b100100,
            OpCode::StoreIn2 => 0b101000,
            OpCode::Move => 0b101100,
            OpCode::SubtractImmediate => 0b000010,
            OpCode::AddImmediate => 0b000011,
            OpCode::XorImmediate => 0b000100,
            OpCode::OrImmediate => 0b000101,
            OpCode::AndImmediate => 0b000110,
            OpCode::Subtract => 0b001010,
            OpCode::Add => 0b001011,
            OpCode::Xor => 0b001100,
            OpCode::Or => 0b001101,
            OpCode::And => 0b001110,
            OpCode::NoOperation => 0b110000,
            OpCode::Jump(condition) => 0b110000 | (condition.bits() << 1),
        };
        bits << 26
    }

    /// Classifies a full instruction word.
    ///
    /// Returns `None` for the class-00 subcodes that do not name an
    /// instruction.  The don't-care bits of the store and jump encodings
    /// are ignored.
    pub fn from_word(word: u32) -> Option<OpCode> {
        match word >> 30 {
            0b01 => Some(match (word >> 28) & 3 {
                0 => OpCode::Load,
                1 => OpCode::LoadIn1,
                2 => OpCode::LoadIn2,
                _ => OpCode::LoadImmediate,
            }),
            0b10 => Some(match (word >> 28) & 3 {
                0 => OpCode::Store,
                1 => OpCode::StoreIn1,
                2 => OpCode::StoreIn2,
                _ => OpCode::Move,
            }),
            0b00 => match (word >> 26) & 0x3f {
                0b000010 => Some(OpCode::SubtractImmediate),
                0b000011 => Some(OpCode::AddImmediate),
                0b000100 => Some(OpCode::XorImmediate),
                0b000101 => Some(OpCode::OrImmediate),
                0b000110 => Some(OpCode::AndImmediate),
                0b001010 => Some(OpCode::Subtract),
                0b001011 => Some(OpCode::Add),
                0b001100 => Some(OpCode::Xor),
                0b001101 => Some(OpCode::Or),
                0b001110 => Some(OpCode::And),
                _ => None,
            },
            _ => Some(match (word >> 27) & 7 {
                0 => OpCode::NoOperation,
                1 => OpCode::Jump(JumpCondition::Greater),
                2 => OpCode::Jump(JumpCondition::Equal),
                3 => OpCode::Jump(JumpCondition::GreaterOrEqual),
                4 => OpCode::Jump(JumpCondition::Less),
                5 => OpCode::Jump(JumpCondition::NotEqual),
                6 => OpCode::Jump(JumpCondition::LessOrEqual),
                _ => OpCode::Jump(JumpCondition::Unconditional),
            }),
        }
    }

    /// Looks an opcode up by its assembler mnemonic.
    pub fn from_mnemonic(mnemonic: &str) -> Option<OpCode> {
        let opcode = match mnemonic {
            "LOAD" => OpCode::Load,
            "LOADIN1" => OpCode::LoadIn1,
            "LOADIN2" => OpCode::LoadIn2,
            "LOADI" => OpCode::LoadImmediate,
            "STORE" => OpCode::Store,
            "STOREIN1" => OpCode::StoreIn1,
            "STOREIN2" => OpCode::StoreIn2,
            "MOVE" => OpCode::Move,
            "SUBI" => OpCode::SubtractImmediate,
            "ADDI" => OpCode::AddImmediate,
            "OPLUSI" => OpCode::XorImmediate,
            "ORI" => OpCode::OrImmediate,
            "ANDI" => OpCode::AndImmediate,
            "SUB" => OpCode::Subtract,
            "ADD" => OpCode::Add,
            "OPLUS" => OpCode::Xor,
            "OR" => OpCode::Or,
            "AND" => OpCode::And,
            "NOP" => OpCode::NoOperation,
            "JUMP>" => OpCode::Jump(JumpCondition::Greater),
            "JUMP=" => OpCode::Jump(JumpCondition::Equal),
            "JUMP>=" => OpCode::Jump(JumpCondition::GreaterOrEqual),
            "JUMP<" => OpCode::Jump(JumpCondition::Less),
            "JUMP!=" => OpCode::Jump(JumpCondition::NotEqual),
            "JUMP<=" => OpCode::Jump(JumpCondition::LessOrEqual),
            "JUMP" => OpCode::Jump(JumpCondition::Unconditional),
            _ => return None,
        };
        Some(opcode)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Load => "LOAD",
            OpCode::LoadIn1 => "LOADIN1",
            OpCode::LoadIn2 => "LOADIN2",
            OpCode::LoadImmediate => "LOADI",
            OpCode::Store => "STORE",
            OpCode::StoreIn1 => "STOREIN1",
            OpCode::StoreIn2 => "STOREIN2",
            OpCode::Move => "MOVE",
            OpCode::SubtractImmediate => "SUBI",
            OpCode::AddImmediate => "ADDI",
            OpCode::XorImmediate => "OPLUSI",
            OpCode::OrImmediate => "ORI",
            OpCode::AndImmediate => "ANDI",
            OpCode::Subtract => "SUB",
            OpCode::Add => "ADD",
            OpCode::Xor => "OPLUS",
            OpCode::Or => "OR",
            OpCode::And => "AND",
            OpCode::NoOperation => "NOP",
            OpCode::Jump(JumpCondition::Greater) => "JUMP>",
            OpCode::Jump(JumpCondition::Equal) => "JUMP=",
            OpCode::Jump(JumpCondition::GreaterOrEqual) => "JUMP>=",
            OpCode::Jump(JumpCondition::Less) => "JUMP<",
            OpCode::Jump(JumpCondition::NotEqual) => "JUMP!=",
            OpCode::Jump(JumpCondition::LessOrEqual) => "JUMP<=",
            OpCode::Jump(JumpCondition::Unconditional) => "JUMP",
        }
    }

    /// Whether the instruction takes a source register operand.
    pub fn uses_source(self) -> bool {
        self == OpCode::Move
    }

    /// Whether the instruction takes a destination register operand.
    pub fn uses_destination(self) -> bool {
        match self {
            OpCode::Store | OpCode::StoreIn1 | OpCode::StoreIn2 => false,
            OpCode::NoOperation | OpCode::Jump(_) => false,
            _ => true,
        }
    }

    /// Whether the instruction takes an immediate operand.
    pub fn uses_immediate(self) -> bool {
        match self {
            OpCode::Move | OpCode::NoOperation => false,
            _ => true,
        }
    }

    /// How the immediate is written in assembler text.
    pub fn immediate_format(self) -> ImmediateFormat {
        match self {
            OpCode::Load
            | OpCode::LoadIn1
            | OpCode::LoadIn2
            | OpCode::LoadImmediate
            | OpCode::Store
            | OpCode::StoreIn1
            | OpCode::StoreIn2
            | OpCode::Move => ImmediateFormat::Unsigned,
            OpCode::XorImmediate
            | OpCode::OrImmediate
            | OpCode::AndImmediate
            | OpCode::Xor
            | OpCode::Or
            | OpCode::And => ImmediateFormat::Hexadecimal,
            OpCode::SubtractImmediate
            | OpCode::AddImmediate
            | OpCode::Subtract
            | OpCode::Add
            | OpCode::NoOperation
            | OpCode::Jump(_) => ImmediateFormat::Signed,
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Sign extends a 24-bit immediate: bit 23 fills the upper eight bits.
pub fn sign_extend(immediate: u32) -> i32 {
    ((immediate << 8) as i32) >> 8
}

/// A decoded ReTI instruction.
///
/// Fields that the opcode does not use hold their zero defaults, so that
/// re-encoding yields the canonical word with don't-care bits cleared.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub source: Register,
    pub destination: Register,
    pub immediate: u32,
}

impl Instruction {
    pub fn new(opcode: OpCode) -> Instruction {
        Instruction {
            opcode,
            source: Register::Pc,
            destination: Register::Pc,
            immediate: 0,
        }
    }

    /// Decodes a full instruction word.  Returns `None` for illegal words.
    pub fn decode(word: u32) -> Option<Instruction> {
        let opcode = OpCode::from_word(word)?;

        let source = if opcode.uses_source() {
            Register::from_bits(word >> 26)
        } else {
            Register::Pc
        };

        let destination = if opcode.uses_destination() {
            Register::from_bits(word >> 24)
        } else {
            Register::Pc
        };

        let immediate = if opcode.uses_immediate() {
            word & IMMEDIATE_MASK
        } else {
            0
        };

        Some(Instruction {
            opcode,
            source,
            destination,
            immediate,
        })
    }

    /// Encodes the instruction into its 32-bit word.  Fields the opcode
    /// does not use are emitted as zero.
    pub fn encode(&self) -> u32 {
        let mut word = self.opcode.prefix();

        if self.opcode.uses_source() {
            word |= self.source.bits() << 26;
        }

        if self.opcode.uses_destination() {
            word |= self.destination.bits() << 24;
        }

        if self.opcode.uses_immediate() {
            word |= self.immediate & IMMEDIATE_MASK;
        }

        word
    }

    /// The immediate interpreted as a two's complement value.
    pub fn signed_immediate(&self) -> i32 {
        sign_extend(self.immediate)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.opcode.mnemonic())?;

        if self.opcode.uses_source() {
            write!(f, " {}", self.source)?;
        }

        if self.opcode.uses_destination() {
            write!(f, " {}", self.destination)?;
        }

        if self.opcode.uses_immediate() {
            match self.opcode.immediate_format() {
                ImmediateFormat::Unsigned => write!(f, " {}", self.immediate)?,
                ImmediateFormat::Hexadecimal => write!(f, " 0x{:x}", self.immediate)?,
                ImmediateFormat::Signed => write!(f, " {}", self.signed_immediate())?,
            }
        }

        Ok(())
    }
}

/// Formats a word as assembler text, or `ILLEGAL` if it decodes to none.
pub fn disassemble(word: u32) -> String {
    match Instruction::decode(word) {
        Some(instruction) => instruction.to_string(),
        None => "ILLEGAL".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_load_immediate() {
        let mut ins = Instruction::new(OpCode::LoadImmediate);
        ins.destination = Register::Acc;
        ins.immediate = 42;
        assert_eq!(ins.encode(), 0x7300_002a);
        assert_eq!(ins.to_string(), "LOADI ACC 42");
    }

    #[test]
    fn encode_negative_subtract_immediate() {
        let mut ins = Instruction::new(OpCode::SubtractImmediate);
        ins.destination = Register::Acc;
        ins.immediate = 1u32.wrapping_neg() & IMMEDIATE_MASK;
        assert_eq!(ins.encode(), 0x0bff_ffff);
        assert_eq!(ins.to_string(), "SUBI ACC -1");
    }

    #[test]
    fn decode_ignores_dont_care_bits() {
        // Unused jump bits 26..24 do not affect classification.
        let ins = Instruction::decode(0xfc00_0000).unwrap();
        assert_eq!(ins.opcode, OpCode::Jump(JumpCondition::Unconditional));
        assert_eq!(ins.to_string(), "JUMP 0");

        // Store variants ignore the S and D fields.
        let ins = Instruction::decode(0xa327_65bb).unwrap();
        assert_eq!(ins.opcode, OpCode::StoreIn2);
        assert_eq!(ins.to_string(), "STOREIN2 2581947");
    }

    #[test]
    fn illegal_compute_subcodes() {
        for subcode in 0..16u32 {
            let word = subcode << 26;
            let legal = match subcode {
                2 | 3 | 4 | 5 | 6 | 10 | 11 | 12 | 13 | 14 => true,
                _ => false,
            };
            assert_eq!(Instruction::decode(word).is_some(), legal);
        }
        assert_eq!(disassemble(0), "ILLEGAL");
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend(0xff_ffff), -1);
        assert_eq!(sign_extend(0x80_0000), -8388608);
        assert_eq!(sign_extend(0x7f_ffff), 8388607);
        assert_eq!(sign_extend(0), 0);
    }

    #[test]
    fn word_round_trip() {
        let words = [
            0x4000_0000u32, // LOAD PC 0
            0x5100_0001,    // LOADIN1 IN1 1
            0x6200_0002,    // LOADIN2 IN2 2
            0x7300_002a,    // LOADI ACC 42
            0x8000_1000,    // STORE 4096
            0x9000_1000,    // STOREIN1 4096
            0xa000_1000,    // STOREIN2 4096
            0xbf00_0000,    // MOVE ACC ACC
            0x0b00_0005,    // SUBI ACC 5
            0x0f00_0005,    // ADDI ACC 5
            0x1300_0005,    // OPLUSI ACC 0x5
            0x1700_0005,    // ORI ACC 0x5
            0x1b00_0005,    // ANDI ACC 0x5
            0x2b00_0005,    // SUB ACC 5
            0x2f00_0005,    // ADD ACC 5
            0x3300_0005,    // OPLUS ACC 0x5
            0x3700_0005,    // OR ACC 0x5
            0x3b00_0005,    // AND ACC 0x5
            0xc000_0000,    // NOP
            0xc800_0003,    // JUMP> 3
            0xd0ff_ffff,    // JUMP= -1
            0xd800_0003,    // JUMP>= 3
            0xe000_0003,    // JUMP< 3
            0xe800_0003,    // JUMP!= 3
            0xf000_0003,    // JUMP<= 3
            0xf800_0003,    // JUMP 3
        ];

        for &word in words.iter() {
            let ins = Instruction::decode(word).unwrap();
            assert_eq!(OpCode::from_mnemonic(ins.opcode.mnemonic()), Some(ins.opcode));
            assert_eq!(ins.encode(), word, "word 0x{:08x}", word);
            // The disassembled text stays well below the 32-byte bound.
            assert!(ins.to_string().len() < 32);
        }
    }
}
