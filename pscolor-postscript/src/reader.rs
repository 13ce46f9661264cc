use core::ops::Range;

#[derive(Clone, Debug)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    #[inline]
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    #[inline]
    pub(crate) fn jump(&mut self, offset: usize) {
        self.offset = offset;
    }

    #[inline]
    pub(crate) fn range(&self, range: Range<usize>) -> Option<&'a [u8]> {
        self.data.get(range)
    }

    #[inline]
    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub(crate) fn read_byte(&mut self) -> Option<u8> {
        let v = self.peek_byte()?;
        self.offset += 1;
        Some(v)
    }

    #[inline]
    pub(crate) fn peek_bytes(&self, len: usize) -> Option<&'a [u8]> {
        self.data.get(self.offset..self.offset + len)
    }

    #[inline]
    pub(crate) fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.offset).copied()
    }

    #[inline]
    pub(crate) fn forward(&mut self) {
        self.offset += 1;
    }

    #[inline]
    pub(crate) fn forward_while(&mut self, f: impl Fn(u8) -> bool) {
        while let Some(b) = self.peek_byte() {
            if f(b) {
                self.forward();
            } else {
                break;
            }
        }
    }

    #[inline]
    pub(crate) fn forward_tag(&mut self, tag: &[u8]) -> Option<()> {
        if self.peek_bytes(tag.len())? == tag {
            self.offset += tag.len();
            Some(())
        } else {
            None
        }
    }

    #[inline]
    pub(crate) fn skip_eol(&mut self) {
        self.forward_while(is_eol);
    }

    pub(crate) fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_byte() {
                Some(b) if is_whitespace(b) => self.forward(),
                Some(b'%') => {
                    self.forward();
                    self.forward_while(|b| !is_eol(b));
                }
                _ => return,
            }
        }
    }
}

#[inline(always)]
pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0a | 0x0c | 0x0d | 0x20)
}

#[inline(always)]
pub(crate) fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

#[inline(always)]
pub(crate) fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

#[inline(always)]
pub(crate) fn is_eol(b: u8) -> bool {
    matches!(b, 0x0a | 0x0d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_comments() {
        let mut r = Reader::new(b"  % a comment\r\n % another\n add");
        r.skip_whitespace_and_comments();
        assert_eq!(r.peek_bytes(3), Some(&b"add"[..]));
    }

    #[test]
    fn tags() {
        let mut r = Reader::new(b"<<abc");
        assert!(r.forward_tag(b"<~").is_none());
        assert!(r.forward_tag(b"<<").is_some());
        assert_eq!(r.offset(), 2);
        assert!(r.forward_tag(b"abcd").is_none());
    }
}
