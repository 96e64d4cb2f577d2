//! # Numeric Parsers
//!
//! Unsigned and signed integers in any radix from 2 to 36 with optional digit
//! bounds, plus floating point numbers.
//!
//! Integer overflow is an ordinary match failure. Floats are recognised with
//! `nom` and converted with the standard library parser.

use nom::number::complete::recognize_float_or_exceptions;

use super::attribute::{Shape, Value, FLOAT, INT, UINT};
use super::context::Context;
use super::core::{NodeKind, ParseResult, Parser};
use super::rule::Validation;
use crate::error::GrammarError;

const MAX_RADIX: u32 = 36;

/// Bounds shared by the integer parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitBounds {
    pub min: usize,
    pub max: Option<usize>,
}

impl Default for DigitBounds {
    fn default() -> Self {
        Self { min: 1, max: None }
    }
}

fn digit_value(c: char, radix: u32) -> Option<u32> {
    c.to_digit(MAX_RADIX).filter(|d| *d < radix)
}

/// Reads digits from `pos`, feeding each one to `accumulate`. Stops at the
/// first non-digit, at `bounds.max`, or when `accumulate` reports overflow.
fn scan_digits(
    ctx: &Context<'_>,
    pos: usize,
    radix: u32,
    bounds: DigitBounds,
    mut accumulate: impl FnMut(u32) -> bool,
) -> Option<usize> {
    let mut current = pos;
    let mut count = 0;
    while bounds.max.map_or(true, |max| count < max) {
        let Some((c, next)) = ctx.next_char(current) else {
            break;
        };
        let Some(digit) = digit_value(c, radix) else {
            break;
        };
        if !accumulate(digit) {
            return None;
        }
        current = next;
        count += 1;
    }
    (count >= bounds.min).then_some(current)
}

fn validate_bounds(radix: u32, bounds: DigitBounds, parser: &str) -> Result<(), GrammarError> {
    if !(2..=MAX_RADIX).contains(&radix) {
        return Err(GrammarError::InvalidRadix {
            radix,
            parser: parser.to_string(),
        });
    }
    match bounds.max {
        Some(max) if max < bounds.min || max == 0 => Err(GrammarError::InvalidDigitBounds {
            min: bounds.min,
            max,
        }),
        _ => Ok(()),
    }
}

/// Unsigned integer in radix 2 to 36.
///
/// Fails on overflow, on a digit count outside the bounds, and on a value
/// other than the expected one when one is set.
pub struct UIntParser {
    radix: u32,
    bounds: DigitBounds,
    expected: Option<u64>,
}

impl UIntParser {
    /// Creates an unsigned parser with at least one digit and no upper bound.
    ///
    /// # Arguments
    ///
    /// * `radix` - The number base; checked when the grammar is built
    ///
    /// # Returns
    ///
    /// * `UIntParser` - The parser, to be wrapped in a [`Node`](super::core::Node)
    pub fn new(radix: u32) -> Self {
        Self {
            radix,
            bounds: DigitBounds::default(),
            expected: None,
        }
    }

    /// Accept between `min` and `max` digits.
    pub fn digits(mut self, min: usize, max: Option<usize>) -> Self {
        self.bounds = DigitBounds { min, max };
        self
    }

    /// Succeed only when the parsed number equals `expected`.
    pub fn expect(mut self, expected: u64) -> Self {
        self.expected = Some(expected);
        self
    }
}

impl Parser for UIntParser {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        let radix = self.radix;
        let mut value: u64 = 0;
        let next = scan_digits(ctx, pos, radix, self.bounds, |digit| {
            match value
                .checked_mul(radix.into())
                .and_then(|v| v.checked_add(digit.into()))
            {
                Some(v) => {
                    value = v;
                    true
                }
                None => false,
            }
        });
        match next {
            Some(next) if self.expected.map_or(true, |e| e == value) => Ok((next, Value::UInt(value))),
            _ => Err(ctx.fail(self.describe(), pos)),
        }
    }

    fn kind(&self) -> NodeKind {
        NodeKind::UInt
    }

    fn shape(&self) -> &Shape {
        &UINT
    }

    fn describe(&self) -> String {
        match (self.radix, self.expected) {
            (_, Some(expected)) => format!("uint({expected})"),
            (2, None) => "bin".to_string(),
            (8, None) => "oct".to_string(),
            (10, None) => "uint_".to_string(),
            (16, None) => "hex".to_string(),
            (radix, None) => format!("uint<{radix}>"),
        }
    }

    fn validate(&self, _scope: &mut Validation<'_>) -> Result<(), GrammarError> {
        validate_bounds(self.radix, self.bounds, "uint")
    }
}

/// Signed integer with an optional leading `+` or `-`.
///
/// Only radix 2, 8, 10 and 16 are accepted.
pub struct IntParser {
    radix: u32,
    bounds: DigitBounds,
    expected: Option<i64>,
}

impl IntParser {
    pub fn new(radix: u32) -> Self {
        Self {
            radix,
            bounds: DigitBounds::default(),
            expected: None,
        }
    }

    pub fn digits(mut self, min: usize, max: Option<usize>) -> Self {
        self.bounds = DigitBounds { min, max };
        self
    }

    pub fn expect(mut self, expected: i64) -> Self {
        self.expected = Some(expected);
        self
    }
}

impl Parser for IntParser {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        let (negative, start) = match ctx.next_char(pos) {
            Some(('-', next)) => (true, next),
            Some(('+', next)) => (false, next),
            _ => (false, pos),
        };
        let radix = i64::from(self.radix);
        let mut value: i64 = 0;
        // accumulate on the negative side so that i64::MIN is reachable
        let next = scan_digits(ctx, start, self.radix, self.bounds, |digit| {
            let step = value.checked_mul(radix).and_then(|v| {
                if negative {
                    v.checked_sub(i64::from(digit))
                } else {
                    v.checked_add(i64::from(digit))
                }
            });
            match step {
                Some(v) => {
                    value = v;
                    true
                }
                None => false,
            }
        });
        match next {
            Some(next) if self.expected.map_or(true, |e| e == value) => Ok((next, Value::Int(value))),
            _ => Err(ctx.fail(self.describe(), pos)),
        }
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Int
    }

    fn shape(&self) -> &Shape {
        &INT
    }

    fn describe(&self) -> String {
        match (self.radix, self.expected) {
            (_, Some(expected)) => format!("int({expected})"),
            (10, None) => "int_".to_string(),
            (radix, None) => format!("int<{radix}>"),
        }
    }

    fn validate(&self, _scope: &mut Validation<'_>) -> Result<(), GrammarError> {
        if ![2, 8, 10, 16].contains(&self.radix) {
            return Err(GrammarError::InvalidRadix {
                radix: self.radix,
                parser: "int".to_string(),
            });
        }
        validate_bounds(self.radix, self.bounds, "int")
    }
}

fn is_float_char(c: char) -> bool {
    c.is_ascii_digit()
        || matches!(
            c.to_ascii_lowercase(),
            '+' | '-' | '.' | 'e' | 'i' | 'n' | 'f' | 't' | 'y' | 'a'
        )
}

/// Floating point number: sign, fraction, exponent, `inf`, `infinity` and `nan`.
pub struct FloatParser;

impl FloatParser {
    /// The run of characters from `pos` that can belong to a float literal,
    /// with the input position after each of them.
    fn candidate(ctx: &Context<'_>, pos: usize) -> (String, Vec<usize>) {
        let mut text = String::new();
        let mut ends = Vec::new();
        let mut current = pos;
        loop {
            match ctx.next_char(current) {
                Some((c, next)) if is_float_char(c) => {
                    text.push(c);
                    ends.push(next);
                    current = next;
                }
                _ => break,
            }
        }
        (text, ends)
    }

    /// Length of the float literal at the start of `text`, if any.
    fn recognize(text: &str) -> Option<usize> {
        let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
        let sign = text.len() - unsigned.len();
        let recognized = match recognize_float_or_exceptions::<&str, nom::error::Error<&str>>(unsigned) {
            Ok((_, recognized)) => recognized.len(),
            // a dangling exponent such as "1e" fails hard; take the mantissa
            Err(_) => {
                let mantissa = unsigned.split(['e', 'E']).next().unwrap_or_default();
                match recognize_float_or_exceptions::<&str, nom::error::Error<&str>>(mantissa) {
                    Ok((_, recognized)) => recognized.len(),
                    Err(_) => return None,
                }
            }
        };
        let rest = &unsigned[recognized..];
        let recognized = if unsigned[..recognized].eq_ignore_ascii_case("inf")
            && rest.len() >= 5
            && rest[..5].eq_ignore_ascii_case("inity")
        {
            recognized + 5
        } else {
            recognized
        };
        Some(sign + recognized)
    }
}

impl Parser for FloatParser {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        let (text, ends) = Self::candidate(ctx, pos);
        let parsed = Self::recognize(&text).and_then(|len| {
            let value = text[..len].parse::<f64>().ok()?;
            // the candidate is ASCII, so byte length equals code point count
            let next = *ends.get(len.checked_sub(1)?)?;
            Some((next, value))
        });
        match parsed {
            Some((next, value)) => Ok((next, Value::Float(value))),
            None => Err(ctx.fail(self.describe(), pos)),
        }
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Float
    }

    fn shape(&self) -> &Shape {
        &FLOAT
    }

    fn describe(&self) -> String {
        "float".to_string()
    }
}
