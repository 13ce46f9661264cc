use crate::error::{Error, Result};
use crate::function::{Clamper, Values};
use crate::object::Dict;
use crate::object::keys::{C0, C1, N};
use smallvec::{SmallVec, smallvec};

/// An exponential interpolation function.
#[derive(Debug)]
pub(crate) struct Type2 {
    c0: SmallVec<[f32; 4]>,
    c1: SmallVec<[f32; 4]>,
    clamper: Clamper,
    n: f32,
}

impl Type2 {
    pub(crate) fn new(dict: &Dict) -> Result<Self> {
        let clamper = Clamper::new(dict)?;

        let read = |key: &str, default: f32| -> Result<SmallVec<[f32; 4]>> {
            match dict.get_object(key) {
                Some(o) => o.cast::<SmallVec<[f32; 4]>>().ok_or(Error::TypeCheck),
                None => Ok(smallvec![default]),
            }
        };

        let c0 = read(C0, 0.0)?;
        let c1 = read(C1, 1.0)?;
        let n = match dict.get_object(N) {
            Some(o) => o.as_f32().ok_or(Error::TypeCheck)?,
            None => return Err(Error::Undefined),
        };

        if c0.len() != c1.len() || !n.is_finite() {
            return Err(Error::RangeCheck);
        }

        Ok(Self {
            c0,
            c1,
            clamper,
            n,
        })
    }

    pub(crate) fn output_count(&self) -> usize {
        self.c0.len()
    }

    pub(crate) fn eval(&self, input: f32) -> Values {
        let x = self.clamper.clamp_input(&[input])[0];
        let p = self.power(x);

        let mut out = self
            .c0
            .iter()
            .zip(self.c1.iter())
            .map(|(c0, c1)| c0 + p * (c1 - c0))
            .collect::<Values>();

        self.clamper.clamp_output(&mut out);

        out
    }

    fn power(&self, x: f32) -> f32 {
        if self.n == 0.0 {
            1.0
        } else if self.n == 1.0 {
            x
        } else if x == 0.0 || x == 1.0 {
            x
        } else if x < 0.0 && self.n.fract() != 0.0 {
            // Not defined for real numbers.
            0.0
        } else {
            let p = x.powf(self.n);

            if p.is_finite() { p } else { 0.0 }
        }
    }
}
