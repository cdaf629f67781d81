//! Source-positioned errors for the text formats of the toolchain.
//!
//! Both the assembler and the hex codec abort on the first error.  An
//! [Error] records the reason and the byte span of the offending input;
//! [Error::verbose] resolves the span against the original input buffer
//! into a line number, a column and an echo of the offending line.

use std::fmt;
use std::ops::Range;

/// Byte range into the original input buffer.
pub type Span = Range<usize>;

/// A parse error: the reason plus the byte span it applies to.
///
/// The reason type is parser specific (see
/// [assembler::ErrorKind](crate::assembler::ErrorKind) and
/// [hex::ErrorKind](crate::hex::ErrorKind)).
#[derive(Clone, Debug, PartialEq)]
pub struct Error<Kind> {
    pub kind: Kind,
    pub span: Span,
}

impl<Kind> Error<Kind> {
    pub fn new(kind: Kind, span: Span) -> Error<Kind> {
        Error { kind, span }
    }

    /// Resolves the error location against the original input buffer.
    ///
    /// # Parameters
    /// - `input`: the buffer the parser consumed, or an exact copy of it.
    pub fn verbose<'a>(&self, input: &'a str) -> VerboseError<'a, Kind>
    where
        Kind: Clone,
    {
        let start = self.span.start.min(input.len());
        let end = self.span.end.min(input.len());

        let line = 1 + input[..start].bytes().filter(|&b| b == b'\n').count();

        let line_start = input[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line_end = input[start..]
            .find(|c| c == '\n' || c == '\r')
            .map(|i| start + i)
            .unwrap_or_else(|| input.len());

        let highlight_start = start - line_start;
        let highlight_end = end.min(line_end).max(start) - line_start;

        VerboseError {
            kind: self.kind.clone(),
            line,
            column: highlight_start + 1,
            text: &input[line_start..line_end],
            highlight: highlight_start..highlight_end,
        }
    }
}

impl<Kind: fmt::Display> fmt::Display for Error<Kind> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

/// An [Error] with its location resolved: line and column numbers plus the
/// text of the offending line.
///
/// The `Display` implementation prints the reason followed by an echo of
/// the line with the error span underlined:
///
/// ```text
/// maximum immediate exceeded
///   LOADI ACC 16777216
///             ^^^^^^^^
/// ```
#[derive(Clone, Debug)]
pub struct VerboseError<'a, Kind> {
    pub kind: Kind,
    /// 1-based line number of the error.
    pub line: usize,
    /// 1-based column number of the error.
    pub column: usize,
    /// The full text of the offending line, without its line terminator.
    pub text: &'a str,
    /// The error span relative to [text](VerboseError::text).
    pub highlight: Range<usize>,
}

impl<'a, Kind: fmt::Display> fmt::Display for VerboseError<'a, Kind> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if !self.text.is_empty() {
            write!(f, "\n  {}\n  ", self.text)?;

            for _ in 0..self.highlight.start.min(self.text.len()) {
                f.write_str(" ")?;
            }

            let width = self.highlight.end.min(self.text.len()).max(self.highlight.start + 1)
                - self.highlight.start;
            for _ in 0..width {
                f.write_str("^")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_locates_line_and_column() {
        let input = "NOP\nADD ACC 1\nBAD LINE\n";
        let bad = input.find("BAD").unwrap();
        let error = Error::new("invalid instruction", bad..bad + 3);

        let verbose = error.verbose(input);
        assert_eq!(verbose.line, 3);
        assert_eq!(verbose.column, 1);
        assert_eq!(verbose.text, "BAD LINE");
        assert_eq!(verbose.highlight, 0..3);
    }

    #[test]
    fn verbose_display_echoes_the_line() {
        let input = "LOADI ACC x\n";
        let error = Error::new("invalid immediate", 10..11);
        let rendered = error.verbose(input).to_string();

        assert!(rendered.starts_with("invalid immediate\n  LOADI ACC x\n"));
        assert!(rendered.ends_with("          ^"));
    }

    #[test]
    fn verbose_at_end_of_input() {
        let input = "NOP";
        let error = Error::new("expected new-line", 3..3);
        let verbose = error.verbose(input);

        assert_eq!(verbose.line, 1);
        assert_eq!(verbose.column, 4);
        assert_eq!(verbose.text, "NOP");
    }
}
