//! Character scanner.
use std::str::CharIndices;

/// Sentinel character returned past the end of the source.
pub const EOF_CHAR: char = '\0';

/// Cursor over the characters of source text.
///
/// Keeps the current character and its byte offset, with one
/// character of lookahead.
pub struct Cursor<'a> {
    chars: CharIndices<'a>,
    /// Byte length of the source text.
    length: u32,
    /// Current character and its byte offset.
    current: (u32, char),
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            chars: text.char_indices(),
            length: text.len() as u32,
            current: (0, EOF_CHAR),
        }
    }

    /// Current character.
    #[inline]
    pub fn current(&self) -> char {
        self.current.1
    }

    /// Byte offset of the current character.
    #[inline]
    pub fn offset(&self) -> u32 {
        self.current.0
    }

    /// Byte offset one past the current character.
    pub fn peek_offset(&self) -> u32 {
        self.chars
            .clone()
            .next()
            .map(|(index, _)| index as u32)
            .unwrap_or(self.length)
    }

    /// Next character, without advancing the cursor.
    pub fn peek(&self) -> char {
        self.chars
            .clone()
            .next()
            .map(|(_, c)| c)
            .unwrap_or(EOF_CHAR)
    }

    /// Advance the cursor to the next character.
    ///
    /// Once the source is exhausted the current character stays pinned
    /// to [`EOF_CHAR`] at the end-of-source offset.
    #[allow(clippy::should_implement_trait)] // not an Iterator, end state is sticky
    pub fn next(&mut self) -> Option<(u32, char)> {
        match self.chars.next() {
            Some((index, c)) => {
                self.current = (index as u32, c);
                Some(self.current)
            }
            None => {
                self.current = (self.length, EOF_CHAR);
                None
            }
        }
    }

    /// Indicates whether the cursor is at the end of the source.
    ///
    /// Note that source can contain '\0' characters without being at
    /// the actual end, so a [`EOF_CHAR`] sighting must be verified
    /// with this function.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.current.0 >= self.length
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cursor_walk() {
        let mut cursor = Cursor::new("ab");
        cursor.next();

        assert_eq!(cursor.current(), 'a');
        assert_eq!(cursor.offset(), 0);
        assert_eq!(cursor.peek(), 'b');
        assert!(!cursor.at_end());

        cursor.next();
        assert_eq!(cursor.current(), 'b');
        assert_eq!(cursor.peek(), EOF_CHAR);

        cursor.next();
        assert_eq!(cursor.current(), EOF_CHAR);
        assert_eq!(cursor.offset(), 2);
        assert!(cursor.at_end());
    }

    #[test]
    fn test_cursor_empty() {
        let mut cursor = Cursor::new("");
        cursor.next();
        assert!(cursor.at_end());
        assert_eq!(cursor.current(), EOF_CHAR);
    }
}
