//! Reading unsigned integers of arbitrary bit width from packed sample data.
//!
//! Samples are stored most-significant-bit first. Reads past the end of the
//! buffer yield zero bits instead of failing, since many producers emit
//! slightly truncated sample data.

/// A bit reader.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    cur_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Create a new bit reader.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self::new_with(data, 0)
    }

    /// Create a new bit reader, and start at a specific bit offset.
    #[inline]
    pub fn new_with(data: &'a [u8], cur_pos: usize) -> Self {
        Self { data, cur_pos }
    }

    /// Align the reader to the next byte boundary.
    #[inline]
    pub fn align(&mut self) {
        let bit_pos = self.bit_pos();

        if bit_pos != 0 {
            self.cur_pos += 8 - bit_pos;
        }
    }

    /// Read the next `bit_size` bits as an unsigned integer.
    ///
    /// `bit_size` is clamped to 32. Bits past the end of the data read as zero.
    #[inline]
    pub fn read(&mut self, bit_size: u8) -> u32 {
        let bit_size = bit_size.min(32);

        if bit_size == 0 {
            return 0;
        }

        let byte_pos = self.byte_pos();

        if self.bit_pos() == 0 {
            let num_bytes = bit_size as usize / 8;

            if bit_size % 8 == 0 {
                if let Some(bytes) = self.data.get(byte_pos..byte_pos + num_bytes) {
                    self.cur_pos += bit_size as usize;

                    return match bytes {
                        [a] => *a as u32,
                        [a, b] => u16::from_be_bytes([*a, *b]) as u32,
                        [a, b, c] => u32::from_be_bytes([0, *a, *b, *c]),
                        [a, b, c, d] => u32::from_be_bytes([*a, *b, *c, *d]),
                        _ => unreachable!(),
                    };
                }
            }
        }

        let bit_pos = self.bit_pos();
        let end_byte_pos = (bit_pos + bit_size as usize - 1) / 8;
        let mut window = [0u8; 8];

        for (i, w) in window.iter_mut().enumerate().take(end_byte_pos + 1) {
            *w = self.data.get(byte_pos + i).copied().unwrap_or(0);
        }

        let item = (u64::from_be_bytes(window) >> (64 - bit_pos - bit_size as usize)) as u32
            & bit_mask(bit_size);
        self.cur_pos += bit_size as usize;

        item
    }

    /// Read the next `bit_size` bits, or return `None` if the reader already
    /// consumed all of its data.
    #[inline]
    pub fn read_checked(&mut self, bit_size: u8) -> Option<u32> {
        if self.at_end() {
            None
        } else {
            Some(self.read(bit_size))
        }
    }

    /// Whether the bit reader has consumed all bytes.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.byte_pos() >= self.data.len()
    }

    /// The number of bits that are left before the end of the data.
    #[inline]
    pub fn remaining_bits(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.cur_pos)
    }

    /// Get the current byte position.
    #[inline]
    pub fn byte_pos(&self) -> usize {
        self.cur_pos / 8
    }

    /// Get the current position within the byte.
    #[inline]
    pub fn bit_pos(&self) -> usize {
        self.cur_pos % 8
    }

    /// Get the current position in bits.
    #[inline]
    pub fn cur_pos(&self) -> usize {
        self.cur_pos
    }
}

/// Reads rows of packed samples, where every row starts on a byte boundary.
#[derive(Debug, Clone)]
pub struct RowReader<'a> {
    reader: BitReader<'a>,
    bits_per_sample: u8,
    samples_per_row: usize,
}

impl<'a> RowReader<'a> {
    /// Create a new row reader for rows of `samples_per_row` samples with
    /// `bits_per_sample` bits each.
    pub fn new(data: &'a [u8], bits_per_sample: u8, samples_per_row: usize) -> Self {
        Self {
            reader: BitReader::new(data),
            bits_per_sample,
            samples_per_row,
        }
    }

    /// The number of bytes a single padded row occupies.
    pub fn row_stride(&self) -> usize {
        (self.samples_per_row * self.bits_per_sample as usize).div_ceil(8)
    }

    /// Read the next row into `out`, which must hold `samples_per_row` entries.
    ///
    /// Missing data is zero-filled.
    pub fn read_row(&mut self, out: &mut [u32]) {
        for sample in out.iter_mut().take(self.samples_per_row) {
            *sample = self.reader.read(self.bits_per_sample);
        }

        self.reader.align();
    }

    /// Whether the underlying data has been consumed.
    pub fn at_end(&self) -> bool {
        self.reader.at_end()
    }
}

/// Get the mask for the given bit size.
#[inline]
pub fn bit_mask(bit_size: u8) -> u32 {
    ((1u64 << bit_size.min(32) as u64) - 1) as u32
}

/// The largest value that can be represented with `bit_size` bits.
#[inline]
pub fn max_value(bit_size: u8) -> u32 {
    bit_mask(bit_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_reader_16() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read(16), 0x0102);
        assert_eq!(reader.read(16), 0x0304);
        assert_eq!(reader.read(16), 0x0506);
        assert!(reader.at_end());
    }

    #[test]
    fn bit_reader_24_32() {
        let data = [0x01, 0x02, 0x03, 0xAA, 0xBB, 0xCC, 0xDD];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read(24), 0x010203);
        assert_eq!(reader.read(32), 0xAABBCCDD);
    }

    #[test]
    fn bit_reader_12() {
        let data = [0b10011000, 0b00011111, 0b10101001, 0b11101001, 0b00011010];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read(12), 0b100110000001);
        assert_eq!(reader.read(12), 0b111110101001);
        assert_eq!(reader.read(12), 0b111010010001);
    }

    #[test]
    fn bit_reader_9() {
        let data = [0b10011000, 0b00011111, 0b10101001, 0b11101001, 0b00011010];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read(9), 0b100110000);
        assert_eq!(reader.read(9), 0b001111110);
        assert_eq!(reader.read(9), 0b101001111);
        assert_eq!(reader.read(9), 0b010010001);
    }

    #[test]
    fn bit_reader_4() {
        let data = [0b10011000, 0b00011111, 0b10101001];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read(4), 0b1001);
        assert_eq!(reader.read(4), 0b1000);
        assert_eq!(reader.read(4), 0b0001);
        assert_eq!(reader.read(4), 0b1111);
        assert_eq!(reader.read(4), 0b1010);
        assert_eq!(reader.read(4), 0b1001);
    }

    #[test]
    fn bit_reader_2() {
        let data = [0b10011000, 0b00010000];
        let mut reader = BitReader::new(&data);
        let read = (0..8).map(|_| reader.read(2)).collect::<Vec<_>>();
        assert_eq!(read, [0b10, 0b01, 0b10, 0b00, 0b00, 0b01, 0b00, 0b00]);
    }

    #[test]
    fn bit_reader_1() {
        let data = [0b10011000, 0b00010000];
        let mut reader = BitReader::new(&data);
        let read = (0..16).map(|_| reader.read(1)).collect::<Vec<_>>();
        assert_eq!(read, [1, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn bit_reader_align() {
        let data = [0b10011000, 0b00010000];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read(1), 0b1);
        assert_eq!(reader.read(3), 0b001);
        reader.align();
        assert_eq!(reader.byte_pos(), 1);
        assert_eq!(reader.read(4), 0b0001);

        // Aligning on a boundary is a no-op.
        reader.align();
        reader.align();
        assert_eq!(reader.read(4), 0b0000);
    }

    #[test]
    fn bit_reader_varying_bit_sizes() {
        let data = [0b10011000, 0b00011111, 0b10101001];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read(4), 0b1001);
        assert_eq!(reader.read(1), 0b1);
        assert_eq!(reader.read(4), 0b0000);
        assert_eq!(reader.read(5), 0b00111);
        assert_eq!(reader.read(1), 0b1);
        assert_eq!(reader.read(2), 0b11);
        assert_eq!(reader.read(7), 0b0101001);
    }

    #[test]
    fn zero_padding_past_end() {
        let data = [0xFF];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read(4), 0xF);
        // Half of the bits are missing.
        assert_eq!(reader.read(8), 0xF0);
        assert!(reader.at_end());
        assert_eq!(reader.read(16), 0);
        assert_eq!(reader.read_checked(8), None);
    }

    #[test]
    fn unaligned_wide_read() {
        let data = [0x0F, 0xFF, 0xFF, 0xFF, 0xF0];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read(4), 0);
        assert_eq!(reader.read(32), 0xFFFF_FFFF);
    }

    #[test]
    fn row_reader_pads_rows() {
        // Two rows of three 2-bit samples, each row padded to one byte.
        let data = [0b01_10_11_00, 0b11_00_01_00];
        let mut rows = RowReader::new(&data, 2, 3);
        assert_eq!(rows.row_stride(), 1);

        let mut row = [0; 3];
        rows.read_row(&mut row);
        assert_eq!(row, [1, 2, 3]);
        rows.read_row(&mut row);
        assert_eq!(row, [3, 0, 1]);
        assert!(rows.at_end());

        rows.read_row(&mut row);
        assert_eq!(row, [0, 0, 0]);
    }

    #[test]
    fn masks() {
        assert_eq!(bit_mask(1), 1);
        assert_eq!(bit_mask(12), 0xFFF);
        assert_eq!(bit_mask(32), u32::MAX);
        assert_eq!(max_value(8), 255);
    }
}
