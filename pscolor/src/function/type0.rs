use crate::error::{Error, Result};
use crate::function::{Clamper, DomainRange, Values, interpolate, lerp, read_pairs};
use crate::object::keys::{BITS_PER_SAMPLE, DATA_SOURCE, DECODE, ENCODE, ORDER, SIZE};
use crate::object::{Dict, Object};
use log::warn;
use pscolor_common::bit::{BitReader, max_value};
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

/// The maximum number of inputs of a sampled function.
const MAX_INPUTS: usize = 16;

/// A sampled function.
#[derive(Debug)]
pub(crate) struct Type0 {
    sizes: SmallVec<[u32; 4]>,
    table: Vec<u32>,
    bits_per_sample: u8,
    encode: DomainRange,
    decode: DomainRange,
    pub(crate) clamper: Clamper,
}

impl Type0 {
    pub(crate) fn new(object: &Object, dict: &Dict) -> Result<Self> {
        let clamper = Clamper::new(dict)?;
        let range = clamper.range.clone().ok_or(Error::Undefined)?;
        let inputs = clamper.domain.len();

        if inputs > MAX_INPUTS {
            return Err(Error::LimitCheck);
        }

        let sizes = dict
            .get_object(SIZE)
            .ok_or(Error::Undefined)?
            .as_array()
            .ok_or(Error::TypeCheck)?
            .iter()
            .map(|s| match s.cast::<u32>() {
                Some(0) => Err(Error::RangeCheck),
                Some(s) => Ok(s),
                None => Err(Error::TypeCheck),
            })
            .collect::<Result<SmallVec<[u32; 4]>>>()?;

        if sizes.len() != inputs {
            return Err(Error::RangeCheck);
        }

        let bits_per_sample = dict.get::<u8>(BITS_PER_SAMPLE).ok_or(Error::Undefined)?;

        if !matches!(bits_per_sample, 1 | 2 | 4 | 8 | 12 | 16 | 24 | 32) {
            return Err(Error::RangeCheck);
        }

        // Cubic spline interpolation is approximated with multilinear interpolation.
        if !matches!(dict.get::<u8>(ORDER).unwrap_or(1), 1 | 3) {
            return Err(Error::RangeCheck);
        }

        let encode = read_pairs(dict, ENCODE)?
            .unwrap_or_else(|| sizes.iter().map(|s| (0.0, (s - 1) as f32)).collect());
        let decode = read_pairs(dict, DECODE)?.unwrap_or_else(|| range.clone());

        if encode.len() != inputs || decode.len() != range.len() {
            return Err(Error::RangeCheck);
        }

        let data = match object {
            Object::Stream(s) => Arc::from(s.data()),
            _ => match dict.get_object(DATA_SOURCE).ok_or(Error::Undefined)? {
                Object::String(s) => s.clone(),
                Object::Stream(s) => Arc::from(s.data()),
                _ => return Err(Error::TypeCheck),
            },
        };

        let count = sizes
            .iter()
            .try_fold(range.len(), |acc, s| acc.checked_mul(*s as usize))
            .ok_or(Error::LimitCheck)?;

        // Missing samples read as zero, so only the samples that are present are stored.
        let available = data.len().saturating_mul(8) / bits_per_sample as usize;

        if available < count {
            warn!("sampled function has not enough data, padding with zeroes");
        }

        let mut reader = BitReader::new(&data);
        let table = (0..count.min(available))
            .map(|_| reader.read(bits_per_sample))
            .collect();

        Ok(Self {
            sizes,
            table,
            bits_per_sample,
            encode,
            decode,
            clamper,
        })
    }

    pub(crate) fn output_count(&self) -> usize {
        self.decode.len()
    }

    pub(crate) fn eval(&self, input: &[f32]) -> Values {
        let input = self.clamper.clamp_input(input);
        let outputs = self.output_count();

        // For every dimension: the lower grid index, the upper grid index and the fraction
        // between them.
        let mut cells: SmallVec<[(usize, usize, f32); 4]> = smallvec![];

        for ((x, (d_min, d_max)), ((e_min, e_max), size)) in input
            .iter()
            .zip(self.clamper.domain.iter())
            .zip(self.encode.iter().zip(self.sizes.iter()))
        {
            let last = (*size - 1) as f32;
            let e = interpolate(*x, *d_min, *d_max, *e_min, *e_max).clamp(0.0, last);
            let lo = e.floor();
            let hi = (lo + 1.0).min(last);

            cells.push((lo as usize, hi as usize, e - lo));
        }

        let mut out: Values = smallvec![0.0; outputs];

        for corner in 0..(1usize << cells.len()) {
            let mut weight = 1.0;
            let mut index = 0;
            let mut stride = 1;

            for (dim, ((lo, hi, frac), size)) in cells.iter().zip(self.sizes.iter()).enumerate() {
                let (idx, w) = if corner & (1 << dim) != 0 {
                    (*hi, *frac)
                } else {
                    (*lo, 1.0 - *frac)
                };

                weight *= w;
                index += idx * stride;
                stride *= *size as usize;
            }

            if weight == 0.0 {
                continue;
            }

            let base = index * outputs;

            for (j, o) in out.iter_mut().enumerate() {
                *o += weight * self.table.get(base + j).copied().unwrap_or(0) as f32;
            }
        }

        let max = max_value(self.bits_per_sample) as f32;

        for (o, (d_min, d_max)) in out.iter_mut().zip(self.decode.iter()) {
            *o = lerp(*o / max, *d_min, *d_max);
        }

        self.clamper.clamp_output(&mut out);

        out
    }
}

#[cfg(test)]
mod tests {
    use crate::function::Function;
    use crate::function::tests::assert_close;
    use crate::object::keys::*;
    use crate::object::{Dict, Object};

    fn sampled(domain: &[f32], range: &[f32], size: &[f32], bps: i32, data: &[u8]) -> Dict {
        Dict::new()
            .with(FUNCTION_TYPE, 0)
            .with(DOMAIN, Object::numbers(domain))
            .with(RANGE, Object::numbers(range))
            .with(SIZE, Object::numbers(size))
            .with(BITS_PER_SAMPLE, bps)
            .with(DATA_SOURCE, Object::string(data))
    }

    #[test]
    fn two_samples_interpolate_linearly() {
        let dict = sampled(&[0.0, 1.0], &[0.0, 1.0], &[2.0], 8, &[0, 255]);
        let function = Function::new(&Object::Dict(dict)).unwrap();

        assert_eq!(function.eval(&[0.0]).as_slice(), &[0.0]);
        assert_eq!(function.eval(&[1.0]).as_slice(), &[1.0]);
        assert_eq!(function.eval(&[0.5]).as_slice(), &[0.5]);
    }

    #[test]
    fn inputs_are_clamped() {
        let dict = sampled(&[0.0, 1.0], &[0.0, 1.0], &[2.0], 8, &[0, 255]);
        let function = Function::new(&Object::Dict(dict)).unwrap();

        assert_eq!(function.eval(&[-3.0]).as_slice(), &[0.0]);
        assert_eq!(function.eval(&[7.0]).as_slice(), &[1.0]);
        assert_eq!(function.eval(&[]).as_slice(), &[0.0]);
    }

    #[test]
    fn multiple_outputs_with_decode() {
        let dict = sampled(&[0.0, 1.0], &[0.0, 1.0, 0.0, 1.0], &[3.0], 8, &[
            0, 255, 128, 128, 255, 0,
        ])
        .with(DECODE, Object::numbers(&[0.0, 1.0, 1.0, 0.0]));
        let function = Function::new(&Object::Dict(dict)).unwrap();

        assert_close(&function.eval(&[0.0]), &[0.0, 0.0]);
        assert_close(&function.eval(&[0.5]), &[128.0 / 255.0, 1.0 - 128.0 / 255.0]);
        assert_close(&function.eval(&[0.75]), &[(128.0 + 255.0) / 510.0, 1.0 - 64.0 / 255.0]);
        assert_close(&function.eval(&[1.0]), &[1.0, 1.0]);
    }

    #[test]
    fn bilinear() {
        // A 2x2 grid, the first input varies fastest.
        let dict = sampled(&[0.0, 1.0, 0.0, 1.0], &[0.0, 1.0], &[2.0, 2.0], 8, &[
            0, 255, 255, 0,
        ]);
        let function = Function::new(&Object::Dict(dict)).unwrap();

        assert_close(&function.eval(&[1.0, 0.0]), &[1.0]);
        assert_close(&function.eval(&[0.0, 1.0]), &[1.0]);
        assert_close(&function.eval(&[1.0, 1.0]), &[0.0]);
        assert_close(&function.eval(&[0.5, 0.5]), &[0.5]);
        assert_close(&function.eval(&[0.25, 0.0]), &[0.25]);
    }

    #[test]
    fn packed_samples() {
        // Four 4-bit samples: 0, 5, 10, 15.
        let dict = sampled(&[0.0, 1.0], &[0.0, 1.0], &[4.0], 4, &[0x05, 0xAF]);
        let function = Function::new(&Object::Dict(dict)).unwrap();

        assert_close(&function.eval(&[1.0 / 3.0]), &[1.0 / 3.0]);
        assert_close(&function.eval(&[0.5]), &[0.5]);

        let dict = sampled(&[0.0, 1.0], &[0.0, 1.0], &[2.0], 12, &[0x00, 0x0F, 0xFF]);
        let function = Function::new(&Object::Dict(dict)).unwrap();

        assert_close(&function.eval(&[1.0]), &[1.0]);
        assert_close(&function.eval(&[0.0]), &[0.0]);

        let dict = sampled(&[0.0, 1.0], &[0.0, 1.0], &[2.0], 16, &[0, 0, 0xFF, 0xFF]);
        let function = Function::new(&Object::Dict(dict)).unwrap();

        assert_close(&function.eval(&[0.5]), &[0.5]);
    }

    #[test]
    fn custom_encode() {
        // Encode reverses the sample order.
        let dict = sampled(&[0.0, 1.0], &[0.0, 1.0], &[2.0], 8, &[0, 255])
            .with(ENCODE, Object::numbers(&[1.0, 0.0]));
        let function = Function::new(&Object::Dict(dict)).unwrap();

        assert_close(&function.eval(&[0.0]), &[1.0]);
        assert_close(&function.eval(&[0.25]), &[0.75]);
    }

    #[test]
    fn missing_data_is_zero() {
        let dict = sampled(&[0.0, 1.0], &[0.0, 1.0], &[2.0], 8, &[255]);
        let function = Function::new(&Object::Dict(dict)).unwrap();

        assert_close(&function.eval(&[1.0]), &[0.0]);
        assert_close(&function.eval(&[0.0]), &[1.0]);
    }

    #[test]
    fn large_sizes_with_little_data() {
        let dict = sampled(
            &[0.0, 1.0, 0.0, 1.0],
            &[0.0, 1.0],
            &[65536.0, 65536.0],
            8,
            &[255, 0],
        );
        let function = Function::new(&Object::Dict(dict)).unwrap();

        assert_close(&function.eval(&[0.0, 0.0]), &[1.0]);
        assert_close(&function.eval(&[1.0, 1.0]), &[0.0]);
    }

    #[test]
    fn validation() {
        let bad_bits = sampled(&[0.0, 1.0], &[0.0, 1.0], &[2.0], 3, &[0, 255]);
        assert!(Function::new(&Object::Dict(bad_bits)).is_err());

        let bad_size = sampled(&[0.0, 1.0], &[0.0, 1.0], &[2.0, 2.0], 8, &[0, 255]);
        assert!(Function::new(&Object::Dict(bad_size)).is_err());

        let zero_size = sampled(&[0.0, 1.0], &[0.0, 1.0], &[0.0], 8, &[0, 255]);
        assert!(Function::new(&Object::Dict(zero_size)).is_err());

        let no_range = Dict::new()
            .with(FUNCTION_TYPE, 0)
            .with(DOMAIN, Object::numbers(&[0.0, 1.0]))
            .with(SIZE, Object::numbers(&[2.0]))
            .with(BITS_PER_SAMPLE, 8)
            .with(DATA_SOURCE, Object::string(&[0, 255]));
        assert!(Function::new(&Object::Dict(no_range)).is_err());
    }
}
