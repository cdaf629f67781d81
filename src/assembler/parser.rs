use std::fmt;

use logos::Logos;

use super::token::Token;
use crate::error::{Error as SourceError, Span};
use crate::instruction::{
    Instruction, OpCode, Register, IMMEDIATE_MASK, MAX_NEGATIVE_MAGNITUDE, MAX_UNSIGNED_IMMEDIATE,
};

pub type Error = SourceError<ErrorKind>;
type Result<T> = std::result::Result<T, Error>;

/// Reasons an assembly source is rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum ErrorKind {
    InvalidInstruction,
    InvalidSourceRegister,
    InvalidDestinationRegister,
    InvalidImmediate,
    MaximumImmediateExceeded,
    /// A single space has to separate `what` from the next operand.
    ExpectedSpace { after: &'static str },
    UnexpectedEmptyLine,
    UnexpectedCharacter(char),
    MissingNewlineAfterCarriageReturn,
    ExpectedNewline,
    UnexpectedEndOfFileInComment,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::InvalidInstruction => write!(f, "invalid instruction"),
            ErrorKind::InvalidSourceRegister => write!(f, "invalid source register"),
            ErrorKind::InvalidDestinationRegister => write!(f, "invalid destination register"),
            ErrorKind::InvalidImmediate => write!(f, "invalid immediate"),
            ErrorKind::MaximumImmediateExceeded => write!(f, "maximum immediate exceeded"),
            ErrorKind::ExpectedSpace { after } => write!(f, "expected space after {}", after),
            ErrorKind::UnexpectedEmptyLine => write!(f, "unexpected empty line"),
            ErrorKind::UnexpectedCharacter(ch) => {
                if ch.is_ascii_graphic() || *ch == ' ' {
                    write!(f, "unexpected character '{}'", ch)
                } else {
                    write!(f, "unexpected character code '0x{:02x}'", *ch as u32)
                }
            }
            ErrorKind::MissingNewlineAfterCarriageReturn => {
                write!(f, "missing new-line after carriage-return")
            }
            ErrorKind::ExpectedNewline => write!(f, "expected new-line"),
            ErrorKind::UnexpectedEndOfFileInComment => {
                write!(f, "unexpected end-of-file in comment")
            }
        }
    }
}

/// Assembles a complete source text into machine words, one per
/// instruction, in source order.
///
/// The first error aborts the pass.
pub fn assemble(source: &str) -> Result<Vec<u32>> {
    Parser::new(source).assemble()
}

struct Parser<'a> {
    source: &'a str,
    stream: logos::SpannedIter<'a, Token<'a>>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Parser<'a> {
        Parser {
            source,
            stream: Token::lexer(source).spanned(),
        }
    }

    fn next(&mut self) -> Option<(Token<'a>, Span)> {
        self.stream.next()
    }

    fn slice(&self, span: &Span) -> &'a str {
        &self.source[span.clone()]
    }

    fn end_span(&self) -> Span {
        self.source.len()..self.source.len()
    }

    fn error<T>(&self, kind: ErrorKind, span: Span) -> Result<T> {
        Err(Error::new(kind, span))
    }

    /// The error for a token that matched no rule of the grammar.  A bare
    /// carriage return gets its own diagnostic, everything else is an
    /// unexpected character.
    fn stray_token_error<T>(&self, span: Span) -> Result<T> {
        let slice = self.slice(&span);
        if slice.starts_with('\r') {
            self.error(ErrorKind::MissingNewlineAfterCarriageReturn, span)
        } else {
            let ch = slice.chars().next().unwrap_or('\0');
            self.error(ErrorKind::UnexpectedCharacter(ch), span)
        }
    }

    fn assemble(&mut self) -> Result<Vec<u32>> {
        let mut words = Vec::new();

        loop {
            // Leading whitespace before the mnemonic.
            let (token, span) = loop {
                match self.next() {
                    None => return Ok(words),
                    Some((Token::Whitespace(_), _)) => continue,
                    Some(item) => break item,
                }
            };

            match token {
                Token::Newline => {
                    return self.error(ErrorKind::UnexpectedEmptyLine, span);
                }
                Token::Comment => {
                    self.finish_comment()?;
                }
                Token::Mnemonic(opcode) => {
                    words.push(self.parse_instruction(opcode)?);
                }
                Token::Register(_) => {
                    return self.error(ErrorKind::InvalidInstruction, span);
                }
                Token::Number(text) => {
                    let ch = text.chars().next().unwrap_or('\0');
                    return self.error(ErrorKind::UnexpectedCharacter(ch), span);
                }
                Token::Whitespace(_) => unreachable!(),
                Token::Error => {
                    return self.stray_token_error(span);
                }
            }
        }
    }

    /// Consumes the newline terminating a comment that reaches the end of
    /// the line.
    fn finish_comment(&mut self) -> Result<()> {
        match self.next() {
            Some((Token::Newline, _)) => Ok(()),
            Some((Token::Error, span)) => self.stray_token_error(span),
            None => self.error(ErrorKind::UnexpectedEndOfFileInComment, self.end_span()),
            // The comment token runs to the line terminator, so nothing
            // else can follow it.
            Some((_, span)) => self.error(ErrorKind::ExpectedNewline, span),
        }
    }

    /// Parses the operands and the line tail after a recognized mnemonic
    /// and returns the encoded word.
    fn parse_instruction(&mut self, opcode: OpCode) -> Result<u32> {
        let mut instruction = Instruction::new(opcode);
        let mut after = "instruction name";

        if opcode.uses_source() {
            self.expect_space(after)?;
            instruction.source = self.expect_register(ErrorKind::InvalidSourceRegister)?;
            after = "source register";
        }

        if opcode.uses_destination() {
            self.expect_space(after)?;
            instruction.destination = self.expect_register(ErrorKind::InvalidDestinationRegister)?;
            after = "destination register";
        }

        if opcode.uses_immediate() {
            self.expect_space(after)?;
            instruction.immediate = self.expect_immediate()?;
        }

        self.finish_line(trailing_error(opcode))?;

        Ok(instruction.encode())
    }

    /// The context error for an unexpected token in an operand position.
    /// A bare carriage return keeps its own diagnostic.
    fn operand_error<T>(&self, kind: ErrorKind, span: Span) -> Result<T> {
        if self.slice(&span).starts_with('\r') {
            self.error(ErrorKind::MissingNewlineAfterCarriageReturn, span)
        } else {
            self.error(kind, span)
        }
    }

    /// Requires exactly one space character as the operand separator.
    fn expect_space(&mut self, after: &'static str) -> Result<()> {
        match self.next() {
            Some((Token::Whitespace(" "), _)) => Ok(()),
            Some((_, span)) => self.operand_error(ErrorKind::ExpectedSpace { after }, span),
            None => self.error(ErrorKind::ExpectedSpace { after }, self.end_span()),
        }
    }

    fn expect_register(&mut self, invalid: ErrorKind) -> Result<Register> {
        match self.next() {
            Some((Token::Register(register), _)) => Ok(register),
            Some((_, span)) => self.operand_error(invalid, span),
            None => self.error(invalid, self.end_span()),
        }
    }

    fn expect_immediate(&mut self) -> Result<u32> {
        match self.next() {
            Some((Token::Number(text), span)) => parse_immediate(text, span),
            Some((_, span)) => self.operand_error(ErrorKind::InvalidImmediate, span),
            None => self.error(ErrorKind::InvalidImmediate, self.end_span()),
        }
    }

    /// Consumes optional trailing whitespace, an optional comment and the
    /// required newline after a complete instruction.
    ///
    /// A stray token glued directly to the last operand is reported with
    /// the operand's own error kind, matching the way the immediate or
    /// register parser would have rejected the character.
    fn finish_line(&mut self, trailing: ErrorKind) -> Result<()> {
        let mut separated = false;
        let mut token = self.next();

        if let Some((Token::Whitespace(_), _)) = token {
            separated = true;
            token = self.next();
        }

        if let Some((Token::Comment, _)) = token {
            return self.finish_comment();
        }

        match token {
            Some((Token::Newline, _)) => Ok(()),
            Some((_, span)) => {
                if separated {
                    self.operand_error(ErrorKind::ExpectedNewline, span)
                } else {
                    self.operand_error(trailing, span)
                }
            }
            None => self.error(ErrorKind::ExpectedNewline, self.end_span()),
        }
    }
}

/// The error kind for garbage directly following the last operand.
fn trailing_error(opcode: OpCode) -> ErrorKind {
    if opcode.uses_immediate() {
        ErrorKind::InvalidImmediate
    } else if opcode.uses_destination() {
        ErrorKind::InvalidDestinationRegister
    } else {
        ErrorKind::InvalidInstruction
    }
}

/// Parses an immediate, enforcing the bounds during digit accumulation.
///
/// Unsigned values accept decimal or `0x` hexadecimal up to 0xFFFFFF.
/// Negative values are decimal with a nonzero leading digit (this forbids
/// `-0`), bounded by 0x800000, and are stored as two's complement
/// truncated to 24 bits.
fn parse_immediate(text: &str, span: Span) -> Result<u32> {
    let negative = text.starts_with('-');
    let rest = if negative { &text[1..] } else { text };

    if negative && !matches!(rest.bytes().next(), Some(b'1'..=b'9')) {
        return Err(Error::new(ErrorKind::InvalidImmediate, span));
    }

    let hexadecimal =
        !negative && rest.bytes().next() == Some(b'0') && rest.bytes().nth(1) == Some(b'x');

    let (radix, digits) = if hexadecimal {
        (16u32, &rest[2..])
    } else {
        (10u32, rest)
    };

    if digits.is_empty() {
        return Err(Error::new(ErrorKind::InvalidImmediate, span));
    }

    let maximum = if negative {
        MAX_NEGATIVE_MAGNITUDE
    } else {
        MAX_UNSIGNED_IMMEDIATE
    };

    let mut value: u32 = 0;

    for ch in digits.chars() {
        let digit = match ch.to_digit(radix) {
            Some(digit) => digit,
            None => return Err(Error::new(ErrorKind::InvalidImmediate, span)),
        };

        if maximum / radix < value {
            return Err(Error::new(ErrorKind::MaximumImmediateExceeded, span));
        }
        value *= radix;

        if maximum - digit < value {
            return Err(Error::new(ErrorKind::MaximumImmediateExceeded, span));
        }
        value += digit;
    }

    if negative {
        value = value.wrapping_neg() & IMMEDIATE_MASK;
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(source: &str) -> ErrorKind {
        assemble(source).unwrap_err().kind
    }

    #[test]
    fn single_instructions() {
        assert_eq!(assemble("LOADI ACC 42\n").unwrap(), vec![0x7300_002a]);
        assert_eq!(assemble("SUBI ACC -1\n").unwrap(), vec![0x0bff_ffff]);
        assert_eq!(assemble("MOVE IN1 ACC\n").unwrap(), vec![0xb700_0000]);
        assert_eq!(assemble("STORE 4096\n").unwrap(), vec![0x8000_1000]);
        assert_eq!(assemble("NOP\n").unwrap(), vec![0xc000_0000]);
        assert_eq!(assemble("JUMP>= -2\n").unwrap(), vec![0xd8ff_fffe]);
        assert_eq!(assemble("ANDI PC 0xff\n").unwrap(), vec![0x1800_00ff]);
    }

    #[test]
    fn comments_and_whitespace() {
        let source = "; leading comment\n  NOP\nADD ACC 1 \t ; trailing\nSTORE 1;glued\n";
        assert_eq!(
            assemble(source).unwrap(),
            vec![0xc000_0000, 0x2f00_0001, 0x8000_0001]
        );
    }

    #[test]
    fn dos_line_endings() {
        assert_eq!(assemble("NOP\r\nNOP\r\n").unwrap(), vec![0xc000_0000; 2]);
        assert_eq!(
            kind_of("NOP\rNOP\n"),
            ErrorKind::MissingNewlineAfterCarriageReturn
        );
    }

    #[test]
    fn empty_lines_are_rejected() {
        assert_eq!(kind_of("\n"), ErrorKind::UnexpectedEmptyLine);
        assert_eq!(kind_of("NOP\n\nNOP\n"), ErrorKind::UnexpectedEmptyLine);
        assert_eq!(kind_of("   \nNOP\n"), ErrorKind::UnexpectedEmptyLine);
        // The empty line is attributed to its own line number.
        assert_eq!(assemble("NOP\n\n").unwrap_err().verbose("NOP\n\n").line, 2);
    }

    #[test]
    fn immediate_bounds() {
        assert_eq!(assemble("STORE 16777215\n").unwrap(), vec![0x80ff_ffff]);
        assert_eq!(kind_of("STORE 16777216\n"), ErrorKind::MaximumImmediateExceeded);
        assert_eq!(assemble("ADDI ACC -8388608\n").unwrap(), vec![0x0f80_0000]);
        assert_eq!(
            kind_of("ADDI ACC -8388609\n"),
            ErrorKind::MaximumImmediateExceeded
        );
        assert_eq!(assemble("ORI ACC 0xffffff\n").unwrap(), vec![0x17ff_ffff]);
        assert_eq!(
            kind_of("ORI ACC 0x1000000\n"),
            ErrorKind::MaximumImmediateExceeded
        );
        assert_eq!(kind_of("ADDI ACC -0\n"), ErrorKind::InvalidImmediate);
        assert_eq!(kind_of("ADDI ACC -042\n"), ErrorKind::InvalidImmediate);
        assert_eq!(kind_of("ADDI ACC 0x\n"), ErrorKind::InvalidImmediate);
        assert_eq!(kind_of("ADDI ACC 12a\n"), ErrorKind::InvalidImmediate);
        // The 0x prefix needs the leading zero.
        assert_eq!(kind_of("ADDI ACC 1x5\n"), ErrorKind::InvalidImmediate);
    }

    #[test]
    fn operand_discipline() {
        assert_eq!(
            kind_of("ADD ACC  5\n"),
            ErrorKind::ExpectedSpace { after: "destination register" }
        );
        assert_eq!(
            kind_of("ADD\tACC 5\n"),
            ErrorKind::ExpectedSpace { after: "instruction name" }
        );
        assert_eq!(
            kind_of("ADDX ACC 5\n"),
            ErrorKind::ExpectedSpace { after: "instruction name" }
        );
        assert_eq!(kind_of("MOVE XX ACC\n"), ErrorKind::InvalidSourceRegister);
        assert_eq!(kind_of("MOVE PC 5\n"), ErrorKind::InvalidDestinationRegister);
        assert_eq!(kind_of("ADD ACC PC\n"), ErrorKind::InvalidImmediate);
        assert_eq!(kind_of("NOP 5\n"), ErrorKind::ExpectedNewline);
        assert_eq!(kind_of("NOP\nNOP"), ErrorKind::ExpectedNewline);
        assert_eq!(kind_of("ACC 5\n"), ErrorKind::InvalidInstruction);
        assert_eq!(kind_of("123\n"), ErrorKind::UnexpectedCharacter('1'));
        assert_eq!(kind_of("add ACC 5\n"), ErrorKind::UnexpectedCharacter('a'));
        assert_eq!(kind_of("; no newline"), ErrorKind::UnexpectedEndOfFileInComment);
    }

    #[test]
    fn error_lines_are_attributed_to_the_failing_line() {
        let source = "NOP\nNOP\nLOADI ACC 99999999\nNOP\n";
        let error = assemble(source).unwrap_err();
        assert_eq!(error.kind, ErrorKind::MaximumImmediateExceeded);

        let verbose = error.verbose(source);
        assert_eq!(verbose.line, 3);
        assert_eq!(verbose.text, "LOADI ACC 99999999");
        assert_eq!(&verbose.text[verbose.highlight.clone()], "99999999");
    }
}
