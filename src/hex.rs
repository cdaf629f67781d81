//! The `address data` hex text format.
//!
//! Each line carries an eight digit hexadecimal word address, a single
//! space and an eight digit hexadecimal data word, optionally followed by
//! whitespace and a `;` comment.  Comment-only lines are allowed,
//! addresses must be nondecreasing, and skipped addresses read as zero
//! words when the text is converted back to binary.

use std::fmt;
use std::io::{self, Read, Write};

use nom::bytes::complete::take_while_m_n;
use nom::combinator::map_res;
use nom::IResult;

use crate::binary;
use crate::error::Error as SourceError;

pub type Error = SourceError<ErrorKind>;

/// Reasons a hex text is rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum ErrorKind {
    InvalidEmptyLine,
    InvalidAddress,
    InvalidData,
    ExpectedSpaceAfterAddress,
    ExpectedWhitespaceAfterData,
    /// The address runs backwards past words already emitted.
    AddressBelowPosition { address: u32, words: u64 },
    ExpectedNewline,
    MissingNewlineAfterCarriageReturn,
    UnexpectedEndOfFileInComment,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::InvalidEmptyLine => write!(f, "invalid empty line"),
            ErrorKind::InvalidAddress => write!(f, "invalid address"),
            ErrorKind::InvalidData => write!(f, "invalid data"),
            ErrorKind::ExpectedSpaceAfterAddress => write!(f, "expected space after address"),
            ErrorKind::ExpectedWhitespaceAfterData => {
                write!(f, "expected white-space after data")
            }
            ErrorKind::AddressBelowPosition { address, words } => write!(
                f,
                "address 0x{:08x} below parsed words 0x{:08x}",
                address,
                words - 1
            ),
            ErrorKind::ExpectedNewline => write!(f, "expected new-line"),
            ErrorKind::MissingNewlineAfterCarriageReturn => {
                write!(f, "missing new-line after carriage-return")
            }
            ErrorKind::UnexpectedEndOfFileInComment => {
                write!(f, "unexpected end-of-file in comment")
            }
        }
    }
}

/// One address/data pair of a hex text.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub address: u32,
    pub data: u32,
}

/// Exactly eight hexadecimal digits.
fn hex_word(input: &str) -> IResult<&str, u32> {
    map_res(
        take_while_m_n(8, 8, |c: char| c.is_ascii_hexdigit()),
        |digits: &str| u32::from_str_radix(digits, 16),
    )(input)
}

/// Parses a complete hex text into its entries, enforcing nondecreasing
/// addresses.  The first error aborts the pass.
pub fn parse(source: &str) -> Result<Vec<Entry>, Error> {
    let mut entries = Vec::new();
    let mut words: u64 = 0;
    let mut offset = 0;

    while offset < source.len() {
        let rest = &source[offset..];
        let (line_len, terminated) = match rest.find('\n') {
            Some(index) => (index, true),
            None => (rest.len(), false),
        };

        let mut line = &rest[..line_len];
        if terminated && line.ends_with('\r') {
            line = &line[..line.len() - 1];
        }

        if let Some(index) = line.find('\r') {
            return Err(Error::new(
                ErrorKind::MissingNewlineAfterCarriageReturn,
                offset + index..offset + index + 1,
            ));
        }

        if line.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidEmptyLine,
                offset + line_len..offset + line_len + 1,
            ));
        }

        if line.starts_with(';') {
            if !terminated {
                let end = source.len();
                return Err(Error::new(ErrorKind::UnexpectedEndOfFileInComment, end..end));
            }
        } else {
            let entry = parse_entry(line, offset, words)?;

            if !terminated {
                let end = source.len();
                return Err(Error::new(ErrorKind::ExpectedNewline, end..end));
            }

            words = entry.address as u64 + 1;
            entries.push(entry);
        }

        offset += line_len + 1;
    }

    Ok(entries)
}

fn parse_entry(line: &str, line_start: usize, words: u64) -> Result<Entry, Error> {
    // Span of the position a field starts at, for error reporting.
    let at = |rest: &str| {
        let position = line_start + (line.len() - rest.len());
        position..position + 1
    };

    let (rest, address) =
        hex_word(line).map_err(|_| Error::new(ErrorKind::InvalidAddress, at(line)))?;

    if !rest.starts_with(' ') {
        return Err(Error::new(ErrorKind::ExpectedSpaceAfterAddress, at(rest)));
    }
    let rest = &rest[1..];

    let (rest, data) =
        hex_word(rest).map_err(|_| Error::new(ErrorKind::InvalidData, at(rest)))?;

    if !rest.is_empty() {
        let first = rest.as_bytes()[0];
        if first != b' ' && first != b'\t' && first != b';' {
            return Err(Error::new(ErrorKind::ExpectedWhitespaceAfterData, at(rest)));
        }
    }

    let trailing = rest.trim_start_matches(|c| c == ' ' || c == '\t');
    if !trailing.is_empty() && !trailing.starts_with(';') {
        return Err(Error::new(ErrorKind::ExpectedNewline, at(trailing)));
    }

    if (address as u64) < words {
        return Err(Error::new(
            ErrorKind::AddressBelowPosition { address, words },
            line_start..line_start + 8,
        ));
    }

    Ok(Entry { address, data })
}

/// Errors of [text_to_binary].
#[derive(Debug)]
pub enum WriteError {
    Parse(Error),
    Io(io::Error),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WriteError::Parse(error) => fmt::Display::fmt(error, f),
            WriteError::Io(error) => fmt::Display::fmt(error, f),
        }
    }
}

impl From<Error> for WriteError {
    fn from(error: Error) -> WriteError {
        WriteError::Parse(error)
    }
}

impl From<io::Error> for WriteError {
    fn from(error: io::Error) -> WriteError {
        WriteError::Io(error)
    }
}

/// Converts hex text to the binary word stream, filling skipped addresses
/// with zero words.  Returns the number of words written.
pub fn text_to_binary<W: Write>(source: &str, writer: &mut W) -> Result<u64, WriteError> {
    let mut words: u64 = 0;

    for entry in parse(source)? {
        while words < entry.address as u64 {
            writer.write_all(&[0; 4])?;
            words += 1;
        }

        writer.write_all(&entry.data.to_le_bytes())?;
        words += 1;
    }

    Ok(words)
}

/// Converts a binary word stream to hex text, numbering words from zero.
/// Returns the number of words read.
pub fn binary_to_text<R: Read, W: Write>(reader: R, writer: &mut W) -> Result<u64, binary::Error> {
    let words = binary::read_words_exact(reader)?;

    for (index, &word) in words.iter().enumerate() {
        writeln!(writer, "{:08x} {:08x}", index, word)?;
    }

    Ok(words.len() as u64)
}
