//! Random generation of bitwise-valid ReTI programs.
//!
//! Every generated word decodes to a legal instruction with its don't-care
//! bits cleared, so the disassembled listing reassembles to the identical
//! words.  Conditional jump targets always lie inside the program or one
//! past its end, and never on the jump itself.

use crate::instruction::Instruction;
use crate::random::Rng;

/// Largest forward jump distance expressible in the 24-bit offset.
const MAX_FORWARD: u32 = 0x007f_ffff;

/// Largest backward jump distance expressible in the 24-bit offset.
const MAX_BACKWARD: u32 = 0x0080_0000;

/// Generates a program of `length` instructions.
pub fn generate(rng: &mut Rng, length: u32) -> Vec<u32> {
    (0..length).map(|pc| generate_at(rng, pc, length)).collect()
}

/// Generates the instruction at address `pc` of a program of `length`
/// instructions.
pub fn generate_at(rng: &mut Rng, pc: u32, length: u32) -> u32 {
    loop {
        let word = rng.next_u32();

        match word >> 30 {
            // Load class: the S field must be zero.
            0b01 => return word & !(0x3 << 26),

            0b10 => {
                if (word >> 28) & 3 == 3 {
                    // MOVE ignores the immediate.
                    return word & 0xff00_0000;
                }
                // Store variants: the S and D fields must be zero.
                return word & !(0xf << 24);
            }

            0b00 => {
                // Redraw the illegal compute subcodes.
                if Instruction::decode(word).is_some() {
                    return word;
                }
            }

            _ => {
                let word = word & !(0x7 << 24);
                let comparison = (word >> 27) & 7;

                if comparison == 0 || comparison == 7 {
                    // NOP and unconditional JUMP: immediate is zero.
                    return word & 0xff00_0000;
                }

                return (word & 0xff00_0000) | jump_offset(rng, pc, length);
            }
        }
    }
}

/// The 24-bit offset of a conditional jump at `pc`: backward with
/// probability 1/2 when possible, else forward, where one past the last
/// instruction is allowed as a clean exit.  The target is never `pc`
/// itself.
fn jump_offset(rng: &mut Rng, pc: u32, length: u32) -> u32 {
    let backward = pc > 0 && rng.next_u32() & 1 == 1;

    let target = if backward {
        rng.pick(pc.saturating_sub(MAX_BACKWARD), pc - 1)
    } else {
        let high = pc.saturating_add(MAX_FORWARD).min(length);
        rng.pick(pc + 1, high)
    };

    target.wrapping_sub(pc) & 0x00ff_ffff
}

/// Picks the instruction count used when none is requested: uniform in a
/// random power-of-two range, at most 1024.
pub fn default_length(rng: &mut Rng) -> u32 {
    let log = rng.pick(0, 10);
    rng.pick(1, 1 << log)
}
