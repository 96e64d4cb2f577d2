//! # Input Sources
//!
//! The engine reads input one code point at a time through the [`Input`]
//! trait. Positions are opaque offsets chosen by the input: byte offsets for
//! UTF-8 text, indices for code-point slices.

use std::ops::Range;

pub trait Input {
    /// The code point starting at `pos` and the position right after it.
    fn next_char(&self, pos: usize) -> Option<(char, usize)>;

    /// Offset one past the last readable code point.
    fn end(&self) -> usize;

    /// Borrowed text for `range`, available only on contiguous input.
    fn text(&self, range: Range<usize>) -> Option<&str>;

    fn is_contiguous(&self) -> bool {
        true
    }
}

impl Input for &str {
    fn next_char(&self, pos: usize) -> Option<(char, usize)> {
        let c = self.get(pos..)?.chars().next()?;
        Some((c, pos + c.len_utf8()))
    }

    fn end(&self) -> usize {
        self.len()
    }

    fn text(&self, range: Range<usize>) -> Option<&str> {
        self.get(range)
    }
}

impl Input for String {
    fn next_char(&self, pos: usize) -> Option<(char, usize)> {
        self.as_str().next_char(pos)
    }

    fn end(&self) -> usize {
        self.len()
    }

    fn text(&self, range: Range<usize>) -> Option<&str> {
        self.get(range)
    }
}

/// Text whose end is the first NUL code point, or the end of the slice.
#[derive(Debug, Clone, Copy)]
pub struct NullTerminated<'a> {
    text: &'a str,
    end: usize,
}

impl<'a> NullTerminated<'a> {
    pub fn new(text: &'a str) -> Self {
        let end = text.find('\0').unwrap_or(text.len());
        Self { text, end }
    }
}

impl Input for NullTerminated<'_> {
    fn next_char(&self, pos: usize) -> Option<(char, usize)> {
        if pos >= self.end {
            return None;
        }
        self.text.next_char(pos)
    }

    fn end(&self) -> usize {
        self.end
    }

    fn text(&self, range: Range<usize>) -> Option<&str> {
        if range.end > self.end {
            return None;
        }
        self.text.get(range)
    }
}

/// Already-decoded code points. Positions are indices into the slice.
#[derive(Debug, Clone, Copy)]
pub struct CodePoints<'a> {
    chars: &'a [char],
}

impl<'a> CodePoints<'a> {
    pub fn new(chars: &'a [char]) -> Self {
        Self { chars }
    }
}

impl Input for CodePoints<'_> {
    fn next_char(&self, pos: usize) -> Option<(char, usize)> {
        self.chars.get(pos).map(|&c| (c, pos + 1))
    }

    fn end(&self) -> usize {
        self.chars.len()
    }

    fn text(&self, _range: Range<usize>) -> Option<&str> {
        None
    }

    fn is_contiguous(&self) -> bool {
        false
    }
}

/// Simple case folding used by `no_case` matching.
///
/// Code points whose lowercase form expands to several code points are left
/// unchanged.
pub fn fold_case(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Collects the code points of `range` into an owned string.
pub fn collect_text(input: &dyn Input, range: Range<usize>) -> String {
    let mut text = String::new();
    let mut pos = range.start;
    while pos < range.end {
        match input.next_char(pos) {
            Some((c, next)) => {
                text.push(c);
                pos = next;
            }
            None => break,
        }
    }
    text
}
