use crate::reader::{Reader, is_regular};

pub(crate) fn parse_literal<'a>(r: &mut Reader<'a>) -> Option<&'a [u8]> {
    r.forward_tag(b"/")?;
    let start = r.offset();
    r.forward_while(is_regular);
    r.range(start..r.offset())
}

pub(crate) fn parse_executable<'a>(r: &mut Reader<'a>) -> Option<&'a [u8]> {
    let start = r.offset();
    r.forward_while(is_regular);

    if r.offset() == start {
        return None;
    }

    r.range(start..r.offset())
}
