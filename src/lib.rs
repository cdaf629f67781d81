//! A crate for doing anything related to the ReTI processor used in
//! teaching computer architecture.
//!
//! ReTI is a minimal 32-bit machine: four registers (`PC`, `IN1`, `IN2`,
//! `ACC`), word-addressed code and data memories and twenty-six
//! instructions in four classes (load, store, compute and jump).  This
//! crate provides the functionality to:
//!
//! - Encode and decode the 32-bit instruction words.
//! - Assemble ReTI assembly text into binary code files.
//! - Disassemble binary code back to assembly text.
//! - Execute code against a data image, with an optional stepping trace.
//! - Convert between binary word streams and `address data` hex text.
//! - Generate random, bitwise-valid programs and quiz questions.
//!
//! The binaries built from this crate (`asreti`, `disreti`, `emreti`,
//! `ranreti`, `decbin`, `enchex` and `retiquiz`) are thin wrappers over
//! the library modules.
//!
//! # Example
//!
//! ```
//! use reti::{assembler::assemble, emulator::Emulator};
//!
//! // Store the answer at data address 7 and stop.
//! let source = "\
//!     LOADI ACC 42\n\
//!     STORE 7\n";
//!
//! let code = assemble(source).unwrap();
//!
//! let mut emulator = Emulator::new(code);
//! emulator.run().unwrap();
//!
//! assert_eq!(emulator.dump(), vec![(7, 42)]);
//! ```
//!
//! # File formats
//!
//! Code and data files are sequences of 32-bit little-endian words with no
//! header or footer.  The assembler consumes newline-terminated source
//! lines with `;` comments; the hex codecs speak `{address:08x}
//! {data:08x}` lines with the same comment convention.

pub mod assembler;
pub mod binary;
pub mod emulator;
pub mod error;
pub mod generator;
pub mod hex;
pub mod instruction;
pub mod quiz;
pub mod random;
