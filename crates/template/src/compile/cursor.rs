//! Cursor: read position over an immutable template source.
//!
//! Parsers take `&mut Cursor` and leave it on the first character they did
//! not consume. All slicing happens on char boundaries, so no input can make
//! the cursor panic.

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Byte offset into the original input.
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Unconsumed remainder of the input.
    pub fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Consume `expected` if it is the next character.
    pub fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    /// Consume characters while `pred` holds and return them.
    pub fn take_while(&mut self, mut pred: impl FnMut(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.input[start..self.pos]
    }

    /// Consume characters up to (not including) any of `stops`.
    pub fn take_until_any(&mut self, stops: &[char]) -> &'a str {
        self.take_while(|c| !stops.contains(&c))
    }

    /// Consume a run of ASCII decimal digits.
    ///
    /// Returns `None` when no digit is present. Overlong runs saturate at
    /// `usize::MAX` instead of wrapping.
    pub fn take_number(&mut self) -> Option<usize> {
        let digits = self.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return None;
        }
        Some(digits.bytes().fold(0usize, |acc, b| {
            acc.saturating_mul(10).saturating_add((b - b'0') as usize)
        }))
    }

    /// Consume everything up to the next occurrence of `marker` and the
    /// marker itself, returning the text before it. Leaves the cursor
    /// untouched when the marker does not occur.
    pub fn take_through(&mut self, marker: &str) -> Option<&'a str> {
        let rest = self.rest();
        let idx = rest.find(marker)?;
        self.pos += idx + marker.len();
        Some(&rest[..idx])
    }
}
