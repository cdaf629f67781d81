//! Reading and writing binary word streams.
//!
//! Code and data files are plain sequences of 32-bit little-endian words
//! with no header or footer.

use std::fmt;
use std::io::{self, Read, Write};

/// A partial trailing word in a stream that requires whole words.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncompleteWord {
    /// Number of complete words read before the partial group.
    pub words: u64,
    /// Number of bytes read in total, including the partial group.
    pub bytes: u64,
}

impl fmt::Display for IncompleteWord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "incomplete word")
    }
}

/// Errors of the strict word reader.
#[derive(Debug)]
pub enum Error {
    Incomplete(IncompleteWord),
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Incomplete(incomplete) => fmt::Display::fmt(incomplete, f),
            Error::Io(error) => fmt::Display::fmt(error, f),
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::Io(error)
    }
}

/// Reads words until end of input.  A partial trailing group of fewer than
/// four bytes is silently dropped, mirroring a unit-count read loop.
pub fn read_words<R: Read>(reader: R) -> io::Result<Vec<u32>> {
    let mut reader = reader;
    let mut words = Vec::new();
    let mut buffer = [0u8; 4];

    loop {
        match read_group(&mut reader, &mut buffer)? {
            GroupRead::Word => words.push(u32::from_le_bytes(buffer)),
            GroupRead::End => return Ok(words),
            GroupRead::Partial(_) => return Ok(words),
        }
    }
}

/// Reads words until end of input and reports a partial trailing group as
/// an error carrying the word and byte offsets.
pub fn read_words_exact<R: Read>(reader: R) -> Result<Vec<u32>, Error> {
    let mut reader = reader;
    let mut words = Vec::new();
    let mut buffer = [0u8; 4];

    loop {
        match read_group(&mut reader, &mut buffer)? {
            GroupRead::Word => words.push(u32::from_le_bytes(buffer)),
            GroupRead::End => return Ok(words),
            GroupRead::Partial(extra) => {
                return Err(Error::Incomplete(IncompleteWord {
                    words: words.len() as u64,
                    bytes: words.len() as u64 * 4 + extra as u64,
                }))
            }
        }
    }
}

enum GroupRead {
    Word,
    End,
    /// End of input after this many bytes of an incomplete group.
    Partial(usize),
}

fn read_group<R: Read>(reader: &mut R, buffer: &mut [u8; 4]) -> io::Result<GroupRead> {
    let mut filled = 0;

    while filled < 4 {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => {
                return Ok(if filled == 0 {
                    GroupRead::End
                } else {
                    GroupRead::Partial(filled)
                })
            }
            Ok(n) => filled += n,
            Err(ref error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }

    Ok(GroupRead::Word)
}

/// Writes the words in little-endian byte order.
pub fn write_words<W: Write>(writer: &mut W, words: &[u32]) -> io::Result<()> {
    for &word in words {
        writer.write_all(&word.to_le_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_byte_order() {
        let mut bytes = Vec::new();
        write_words(&mut bytes, &[0x7300_002a]).unwrap();
        assert_eq!(bytes, vec![0x2a, 0x00, 0x00, 0x73]);

        write_words(&mut bytes, &[0x0bff_ffff]).unwrap();
        assert_eq!(&bytes[4..], &[0xff, 0xff, 0xff, 0x0b]);
    }

    #[test]
    fn round_trip() {
        let words = vec![0, 1, 0xdead_beef, u32::max_value()];
        let mut bytes = Vec::new();
        write_words(&mut bytes, &words).unwrap();
        assert_eq!(read_words(&bytes[..]).unwrap(), words);
        assert_eq!(read_words_exact(&bytes[..]).unwrap(), words);
    }

    #[test]
    fn partial_trailing_group() {
        let bytes = [1, 0, 0, 0, 2, 0];

        // The tolerant reader drops the partial group.
        assert_eq!(read_words(&bytes[..]).unwrap(), vec![1]);

        // The exact reader reports word and byte offsets.
        match read_words_exact(&bytes[..]) {
            Err(Error::Incomplete(incomplete)) => {
                assert_eq!(incomplete.words, 1);
                assert_eq!(incomplete.bytes, 6);
            }
            other => panic!("expected incomplete word, got {:?}", other),
        }
    }
}
