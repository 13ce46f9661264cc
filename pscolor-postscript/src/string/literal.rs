use crate::reader::Reader;

pub(crate) fn decode_into(data: &[u8], out: &mut Vec<u8>) -> Option<()> {
    let mut r = Reader::new(data);

    while let Some(byte) = r.read_byte() {
        match byte {
            b'\\' => {
                let next = r.read_byte()?;

                if is_octal_digit(next) {
                    // Up to three octal digits, overflow is ignored.
                    let mut value = (next - b'0') as u32;

                    for _ in 0..2 {
                        match r.peek_byte() {
                            Some(d) if is_octal_digit(d) => {
                                value = value * 8 + (d - b'0') as u32;
                                r.forward();
                            }
                            _ => break,
                        }
                    }

                    out.push(value as u8);
                } else {
                    match next {
                        b'n' => out.push(0xA),
                        b'r' => out.push(0xD),
                        b't' => out.push(0x9),
                        b'b' => out.push(0x8),
                        b'f' => out.push(0xC),
                        // A backslash before a newline continues the string on
                        // the next line.
                        b'\n' | b'\r' => r.skip_eol(),
                        _ => out.push(next),
                    }
                }
            }
            // A bare newline of any kind reads as `\n`.
            b'\r' => {
                out.push(b'\n');

                if r.peek_byte() == Some(b'\n') {
                    r.forward();
                }
            }
            other => out.push(other),
        }
    }

    Some(())
}

fn is_octal_digit(byte: u8) -> bool {
    matches!(byte, b'0'..=b'7')
}
