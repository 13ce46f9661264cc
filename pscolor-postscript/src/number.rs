use core::hash::{Hash, Hasher};

use crate::error::{Error, Result};
use crate::reader::{Reader, is_delimiter, is_whitespace};

/// A PostScript number (integer or real).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// An integer.
    Integer(i32),
    /// A real number.
    Real(f32),
}

impl Number {
    /// Return the value as an `i32`. Reals are truncated.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Integer(v) => v,
            Self::Real(v) => v as i32,
        }
    }

    /// Return the value as an `f32`.
    pub fn as_f32(self) -> f32 {
        match self {
            Self::Integer(v) => v as f32,
            Self::Real(v) => v,
        }
    }
}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Integer(v) => {
                0u8.hash(state);
                v.hash(state);
            }
            Self::Real(v) => {
                1u8.hash(state);
                v.to_bits().hash(state);
            }
        }
    }
}

fn is_terminated(r: &Reader<'_>) -> bool {
    match r.peek_byte() {
        None => true,
        Some(b) => is_whitespace(b) || is_delimiter(b),
    }
}

/// Read a number. On failure the reader position is unspecified, callers
/// that want to fall back to a name need to restore it themselves.
pub(crate) fn read(r: &mut Reader<'_>) -> Result<Number> {
    let saved = r.offset();

    let first = r.peek_byte().ok_or(Error::SyntaxError)?;
    let has_sign = first == b'+' || first == b'-';

    if has_sign {
        r.forward();
    }

    let digit_start = r.offset();
    r.forward_while(|b| b.is_ascii_digit());
    let has_digits = r.offset() > digit_start;

    // Radix numbers, like `16#FF`.
    if !has_sign && has_digits && r.peek_byte() == Some(b'#') {
        let base_bytes = r.range(digit_start..r.offset()).ok_or(Error::SyntaxError)?;
        let base = parse_str::<u32>(base_bytes)?;

        if !(2..=36).contains(&base) {
            return Err(Error::SyntaxError);
        }

        r.forward();

        let num_start = r.offset();
        r.forward_while(|b| b.is_ascii_alphanumeric());

        if r.offset() == num_start || !is_terminated(r) {
            return Err(Error::SyntaxError);
        }

        let num_bytes = r.range(num_start..r.offset()).ok_or(Error::SyntaxError)?;
        let num_str = core::str::from_utf8(num_bytes).map_err(|_| Error::SyntaxError)?;
        // Radix numbers are unsigned 32-bit values that wrap into the signed range.
        let value = u32::from_str_radix(num_str, base).map_err(|_| Error::LimitCheck)?;

        return Ok(Number::Integer(value as i32));
    }

    let has_dot = r.peek_byte() == Some(b'.');

    if has_dot {
        r.forward();
        r.forward_while(|b| b.is_ascii_digit());
    }

    if !has_digits && (!has_dot || r.offset() == digit_start + 1) {
        return Err(Error::SyntaxError);
    }

    let has_exponent = matches!(r.peek_byte(), Some(b'e' | b'E'));
    if has_exponent {
        r.forward();

        if matches!(r.peek_byte(), Some(b'+' | b'-')) {
            r.forward();
        }

        r.forward_while(|b| b.is_ascii_digit());
    }

    if !is_terminated(r) {
        return Err(Error::SyntaxError);
    }

    let token = r.range(saved..r.offset()).ok_or(Error::SyntaxError)?;

    if has_dot || has_exponent {
        Ok(Number::Real(parse_str::<f32>(token)?))
    } else {
        // Integers that overflow become reals.
        match parse_str::<i32>(token) {
            Ok(v) => Ok(Number::Integer(v)),
            Err(_) => Ok(Number::Real(parse_str::<f32>(token)?)),
        }
    }
}

fn parse_str<T: core::str::FromStr>(bytes: &[u8]) -> Result<T> {
    core::str::from_utf8(bytes)
        .map_err(|_| Error::SyntaxError)?
        .parse::<T>()
        .map_err(|_| Error::SyntaxError)
}
