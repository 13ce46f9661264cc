use crate::reader::is_whitespace;

pub(crate) fn decode_into(data: &[u8], out: &mut Vec<u8>) -> Option<()> {
    let mut digits = data.iter().copied().filter(|b| !is_whitespace(*b));

    loop {
        match (digits.next(), digits.next()) {
            (Some(hi), Some(lo)) => {
                out.push(decode_hex_digit(hi)? << 4 | decode_hex_digit(lo)?);
            }
            // An odd trailing digit is padded with zero.
            (Some(hi), None) => {
                out.push(decode_hex_digit(hi)? << 4);

                break;
            }
            (None, _) => break,
        }
    }

    Some(())
}

#[inline(always)]
pub(crate) fn decode_hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}
