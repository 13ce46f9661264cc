use crate::error::{Error, Result};
use crate::function::{Clamper, DomainRange, Function, Values, interpolate, read_pairs};
use crate::object::Dict;
use crate::object::keys::{BOUNDS, ENCODE, FUNCTIONS};
use smallvec::{SmallVec, smallvec};

/// A stitching function.
#[derive(Debug)]
pub(crate) struct Type3 {
    functions: Vec<Function>,
    bounds: SmallVec<[f32; 4]>,
    encode: DomainRange,
    clamper: Clamper,
}

impl Type3 {
    pub(crate) fn new(dict: &Dict, depth: usize) -> Result<Self> {
        let clamper = Clamper::new(dict)?;

        if clamper.domain.len() != 1 {
            return Err(Error::RangeCheck);
        }

        let functions = dict
            .get_object(FUNCTIONS)
            .ok_or(Error::Undefined)?
            .as_array()
            .ok_or(Error::TypeCheck)?
            .iter()
            .map(|f| Function::new_inner(f, depth + 1))
            .collect::<Result<Vec<_>>>()?;

        let bounds = match dict.get_object(BOUNDS) {
            Some(b) => b.cast::<SmallVec<[f32; 4]>>().ok_or(Error::TypeCheck)?,
            None => return Err(Error::Undefined),
        };

        let encode = read_pairs(dict, ENCODE)?.ok_or(Error::Undefined)?;

        if functions.is_empty()
            || bounds.len() + 1 != functions.len()
            || encode.len() != functions.len()
            || bounds.windows(2).any(|w| w[0] > w[1])
        {
            return Err(Error::RangeCheck);
        }

        Ok(Self {
            functions,
            bounds,
            encode,
            clamper,
        })
    }

    pub(crate) fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub(crate) fn output_count(&self) -> usize {
        self.clamper
            .range
            .as_ref()
            .map(|r| r.len())
            .unwrap_or_else(|| self.functions[0].output_count())
    }

    /// Find the subinterval `x` belongs to. This is the first one whose upper bound exceeds
    /// `x`, so a value that is equal to a bound belongs to the subinterval on its right.
    pub(crate) fn subinterval(&self, x: f32) -> usize {
        self.bounds
            .iter()
            .position(|b| x < *b)
            .unwrap_or(self.bounds.len())
    }

    pub(crate) fn eval(&self, input: f32) -> Values {
        let (domain_min, domain_max) = self.clamper.domain[0];
        let x = self.clamper.clamp_input(&[input])[0];
        let idx = self.subinterval(x);

        let lower = if idx == 0 {
            domain_min
        } else {
            self.bounds[idx - 1]
        };
        let upper = self.bounds.get(idx).copied().unwrap_or(domain_max);

        let (Some(function), Some((e_min, e_max))) = (self.functions.get(idx), self.encode.get(idx))
        else {
            return smallvec![0.0; self.output_count()];
        };

        let encoded = interpolate(x, lower, upper, *e_min, *e_max);
        let mut out = function.eval(&[encoded]);

        self.clamper.clamp_output(&mut out);

        out
    }
}
