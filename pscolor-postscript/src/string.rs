pub(crate) mod ascii_hex;
mod literal;

use crate::error::{Error, Result};
use crate::reader::Reader;

/// Read a literal string like `(abc)` and return its decoded bytes.
pub(crate) fn read_literal(r: &mut Reader<'_>) -> Result<Vec<u8>> {
    let start = r.offset();
    skip_literal(r).ok_or(Error::SyntaxError)?;
    let end = r.offset();
    // Exclude outer parentheses.
    let data = r.range(start + 1..end - 1).ok_or(Error::SyntaxError)?;

    let mut out = Vec::with_capacity(data.len());
    literal::decode_into(data, &mut out).ok_or(Error::SyntaxError)?;

    Ok(out)
}

/// Read a hexadecimal string like `<48656C6C6F>` and return its decoded bytes.
pub(crate) fn read_hex(r: &mut Reader<'_>) -> Result<Vec<u8>> {
    r.forward_tag(b"<").ok_or(Error::SyntaxError)?;
    let start = r.offset();

    while let Some(b) = r.read_byte() {
        if b == b'>' {
            let data = r.range(start..r.offset() - 1).ok_or(Error::SyntaxError)?;
            let mut out = Vec::with_capacity(data.len() / 2);
            ascii_hex::decode_into(data, &mut out).ok_or(Error::SyntaxError)?;

            return Ok(out);
        }
    }

    Err(Error::SyntaxError)
}

fn skip_literal(r: &mut Reader<'_>) -> Option<()> {
    r.forward_tag(b"(")?;
    let mut depth = 1_u32;

    while depth > 0 {
        match r.read_byte()? {
            b'\\' => {
                let _ = r.read_byte()?;
            }
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ => {}
        }
    }

    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_literal(input: &[u8]) -> Result<Vec<u8>> {
        read_literal(&mut Reader::new(input))
    }

    fn decode_hex(input: &[u8]) -> Result<Vec<u8>> {
        read_hex(&mut Reader::new(input))
    }

    #[test]
    fn literal_simple() {
        assert_eq!(decode_literal(b"()").unwrap(), b"");
        assert_eq!(decode_literal(b"(Hello)").unwrap(), b"Hello");
    }

    #[test]
    fn literal_nested_parens() {
        assert_eq!(
            decode_literal(b"(Hi (()) there)").unwrap(),
            b"Hi (()) there"
        );
    }

    #[test]
    fn literal_escapes() {
        assert_eq!(decode_literal(b"(a\\nb)").unwrap(), b"a\nb");
        assert_eq!(decode_literal(b"(a\\\\b)").unwrap(), b"a\\b");
        assert_eq!(decode_literal(b"(Hi \\()").unwrap(), b"Hi (");
        assert_eq!(decode_literal(b"(Hi \\\r\nthere)").unwrap(), b"Hi there");
    }

    #[test]
    fn literal_octal() {
        assert_eq!(decode_literal(b"(\\053)").unwrap(), b"+");
        assert_eq!(decode_literal(b"(\\36)").unwrap(), b"\x1e");
        assert_eq!(decode_literal(b"(\\3)").unwrap(), b"\x03");
        assert_eq!(decode_literal(b"(\\377\\000)").unwrap(), &[0xFF, 0x00]);
    }

    #[test]
    fn literal_unterminated() {
        assert!(decode_literal(b"(abc").is_err());
    }

    #[test]
    fn hex() {
        assert_eq!(decode_hex(b"<48656C6C6F>").unwrap(), b"Hello");
        assert_eq!(decode_hex(b"<48 65 6c 6C 6F>").unwrap(), b"Hello");
        assert_eq!(decode_hex(b"<ABC>").unwrap(), &[0xAB, 0xC0]);
        assert_eq!(decode_hex(b"<>").unwrap(), b"");
        assert!(decode_hex(b"<4G>").is_err());
        assert!(decode_hex(b"<41").is_err());
    }
}
