//! Parsing ReTI assembly into machine words.
//!
//! The assembler is a single pass over the source text with one token of
//! lookahead.  Each line holds exactly one instruction: optional leading
//! whitespace, the mnemonic, the operands the mnemonic requires separated
//! by single spaces, optional trailing whitespace, an optional `;` comment
//! and the terminating newline.  Comment-only lines are skipped; lines
//! without any token at all are an error.
//!
//! ```
//! use reti::assembler::assemble;
//!
//! let words = assemble("LOADI ACC 42\n").unwrap();
//! assert_eq!(words, vec![0x7300002a]);
//! ```

mod parser;
mod token;

pub use self::parser::{assemble, Error, ErrorKind};
