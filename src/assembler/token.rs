use logos::{Lexer, Logos};

use crate::instruction::{OpCode, Register};

/// Tokens of the assembly grammar.
///
/// The grammar is whitespace sensitive (exactly one space between the
/// tokens of an instruction), so whitespace and newlines are tokens of
/// their own instead of being skipped by the lexer.
#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token<'a> {
    #[error]
    Error,

    #[regex(r"[ \t]+", Lexer::slice)]
    Whitespace(&'a str),

    #[regex(r"\r\n|\n")]
    Newline,

    #[regex(r";[^\n\r]*")]
    Comment,

    #[regex("PC|IN1|IN2|ACC", register_callback)]
    Register(Register),

    #[regex(
        "LOAD(IN1|IN2|I)?|STORE(IN1|IN2)?|MOVE|NOP|ADDI?|SUBI?|OPLUSI?|ORI?|ANDI?|JUMP(>=?|<=?|!=|=)?",
        mnemonic_callback
    )]
    Mnemonic(OpCode),

    /// A number-shaped word.  The exact immediate grammar (bounds, `-0`,
    /// the `0x` prefix) is enforced by the parser so that it can report
    /// precise reasons.
    #[regex(r"-?[0-9][0-9a-fA-Fx]*", Lexer::slice)]
    Number(&'a str),
}

fn register_callback<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Result<Register, ()> {
    match lex.slice() {
        "PC" => Ok(Register::Pc),
        "IN1" => Ok(Register::In1),
        "IN2" => Ok(Register::In2),
        "ACC" => Ok(Register::Acc),
        _ => Err(()),
    }
}

fn mnemonic_callback<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Result<OpCode, ()> {
    OpCode::from_mnemonic(lex.slice()).ok_or(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::JumpCondition;

    #[test]
    fn tokenize_instruction_line() {
        let mut lex = Token::lexer("  ADDI ACC -17 ; note\n");

        assert_eq!(lex.next(), Some(Token::Whitespace("  ")));
        assert_eq!(lex.next(), Some(Token::Mnemonic(OpCode::AddImmediate)));
        assert_eq!(lex.next(), Some(Token::Whitespace(" ")));
        assert_eq!(lex.next(), Some(Token::Register(Register::Acc)));
        assert_eq!(lex.next(), Some(Token::Whitespace(" ")));
        assert_eq!(lex.next(), Some(Token::Number("-17")));
        assert_eq!(lex.next(), Some(Token::Whitespace(" ")));
        assert_eq!(lex.next(), Some(Token::Comment));
        assert_eq!(lex.next(), Some(Token::Newline));
        assert_eq!(lex.next(), None);
    }

    #[test]
    fn longest_match_wins() {
        let mut lex = Token::lexer("LOADIN1");
        assert_eq!(lex.next(), Some(Token::Mnemonic(OpCode::LoadIn1)));

        let mut lex = Token::lexer("JUMP>=");
        assert_eq!(
            lex.next(),
            Some(Token::Mnemonic(OpCode::Jump(JumpCondition::GreaterOrEqual)))
        );

        let mut lex = Token::lexer("OPLUSI");
        assert_eq!(lex.next(), Some(Token::Mnemonic(OpCode::XorImmediate)));
    }

    #[test]
    fn carriage_return_is_only_part_of_dos_newlines() {
        let mut lex = Token::lexer("NOP\r\n");
        assert_eq!(lex.next(), Some(Token::Mnemonic(OpCode::NoOperation)));
        assert_eq!(lex.next(), Some(Token::Newline));

        let mut lex = Token::lexer("NOP\rX");
        assert_eq!(lex.next(), Some(Token::Mnemonic(OpCode::NoOperation)));
        assert_eq!(lex.next(), Some(Token::Error));
    }
}
