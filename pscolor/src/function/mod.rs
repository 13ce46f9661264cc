//! Functions, as used by shadings and tint transforms.

mod type0;
mod type2;
mod type3;
mod type4;

use crate::error::{Error, Result};
use crate::object::keys::{DOMAIN, FUNCTION_TYPE, RANGE};
use crate::object::{Dict, Object};
use log::warn;
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;
use type0::Type0;
use type2::Type2;
use type3::Type3;
use type4::Type4;

pub use pscolor_postscript::Values;

/// Pairs of minimum and maximum values, like a `Domain` or `Range` entry.
pub(crate) type DomainRange = SmallVec<[(f32, f32); 4]>;

/// The maximum depth of nested stitching functions.
const MAX_NESTING: usize = 16;

#[derive(Debug)]
enum FunctionType {
    Sampled(Type0),
    Exponential(Type2),
    Stitching(Type3),
    PostScript(Type4),
    Array(Vec<Function>),
    Unsupported { outputs: usize },
}

/// A function.
///
/// Evaluating a function never fails: inputs are clamped to the domain and outputs to the
/// range, and functions of unsupported types produce zeroes.
#[derive(Debug, Clone)]
pub struct Function(Arc<FunctionType>);

impl Function {
    /// Create a new function from a function dictionary, a stream (for sampled functions)
    /// or an array of single-output functions.
    pub fn new(object: &Object) -> Result<Self> {
        Self::new_inner(object, 0)
    }

    fn new_inner(object: &Object, depth: usize) -> Result<Self> {
        if depth > MAX_NESTING {
            return Err(Error::LimitCheck);
        }

        if let Some(items) = object.as_array() {
            if items.is_empty() {
                return Err(Error::RangeCheck);
            }

            let functions = items
                .iter()
                .map(|f| Self::new_inner(f, depth + 1))
                .collect::<Result<Vec<_>>>()?;

            return Ok(Self(Arc::new(FunctionType::Array(functions))));
        }

        let dict = object.as_dict().ok_or(Error::TypeCheck)?;
        let function_type = dict.get::<i32>(FUNCTION_TYPE).ok_or_else(|| {
            if dict.contains_key(FUNCTION_TYPE) {
                Error::TypeCheck
            } else {
                Error::Undefined
            }
        })?;

        let inner = match function_type {
            0 => FunctionType::Sampled(Type0::new(object, dict)?),
            2 => FunctionType::Exponential(Type2::new(dict)?),
            3 => FunctionType::Stitching(Type3::new(dict, depth)?),
            4 => FunctionType::PostScript(Type4::new(object, dict)?),
            _ => {
                warn!("unsupported function type {function_type}");

                let outputs = dict
                    .get::<Vec<f32>>(RANGE)
                    .map(|r| r.len() / 2)
                    .filter(|n| *n > 0)
                    .unwrap_or(1);

                FunctionType::Unsupported { outputs }
            }
        };

        Ok(Self(Arc::new(inner)))
    }

    /// Evaluate the function with the given input.
    pub fn eval(&self, input: &[f32]) -> Values {
        match self.0.as_ref() {
            FunctionType::Sampled(s) => s.eval(input),
            FunctionType::Exponential(e) => e.eval(first(input)),
            FunctionType::Stitching(s) => s.eval(first(input)),
            FunctionType::PostScript(p) => p.eval(input),
            FunctionType::Array(functions) => {
                functions.iter().flat_map(|f| f.eval(input)).collect()
            }
            FunctionType::Unsupported { outputs } => smallvec![0.0; *outputs],
        }
    }

    /// Whether the function has a supported type. Unsupported functions evaluate to zeroes.
    pub fn is_supported(&self) -> bool {
        match self.0.as_ref() {
            FunctionType::Unsupported { .. } => false,
            FunctionType::Stitching(s) => s.functions().iter().all(Self::is_supported),
            FunctionType::Array(functions) => functions.iter().all(Self::is_supported),
            _ => true,
        }
    }

    /// The number of inputs the function expects.
    pub fn input_count(&self) -> usize {
        match self.0.as_ref() {
            FunctionType::Sampled(s) => s.clamper.domain.len(),
            FunctionType::PostScript(p) => p.clamper.domain.len(),
            FunctionType::Array(functions) => {
                functions.first().map(Self::input_count).unwrap_or(1)
            }
            _ => 1,
        }
    }

    /// The number of outputs the function produces.
    pub fn output_count(&self) -> usize {
        match self.0.as_ref() {
            FunctionType::Sampled(s) => s.output_count(),
            FunctionType::Exponential(e) => e.output_count(),
            FunctionType::Stitching(s) => s.output_count(),
            FunctionType::PostScript(p) => p.output_count(),
            FunctionType::Array(functions) => functions.iter().map(Self::output_count).sum(),
            FunctionType::Unsupported { outputs } => *outputs,
        }
    }
}

fn first(input: &[f32]) -> f32 {
    input.first().copied().unwrap_or(0.0)
}

/// Clamps inputs to the domain and outputs to the range of a function.
#[derive(Debug, Clone)]
pub(crate) struct Clamper {
    pub(crate) domain: DomainRange,
    pub(crate) range: Option<DomainRange>,
}

impl Clamper {
    pub(crate) fn new(dict: &Dict) -> Result<Self> {
        let domain = read_pairs(dict, DOMAIN)?.ok_or(Error::Undefined)?;
        let range = read_pairs(dict, RANGE)?;

        Ok(Self { domain, range })
    }

    /// Clamp the inputs to the domain. Missing inputs are replaced by the lower bound of
    /// their domain and surplus inputs are dropped.
    pub(crate) fn clamp_input(&self, input: &[f32]) -> Values {
        self.domain
            .iter()
            .enumerate()
            .map(|(i, (min, max))| {
                input
                    .get(i)
                    .copied()
                    .filter(|v| !v.is_nan())
                    .unwrap_or(*min)
                    .clamp(*min, *max)
            })
            .collect()
    }

    pub(crate) fn clamp_output(&self, output: &mut [f32]) {
        if let Some(range) = &self.range {
            for (val, (min, max)) in output.iter_mut().zip(range.iter()) {
                *val = if val.is_nan() { *min } else { val.clamp(*min, *max) };
            }
        }
    }
}

/// Read an array of `min max` pairs. Returns `Ok(None)` if the key doesn't exist.
pub(crate) fn read_pairs(dict: &Dict, key: &str) -> Result<Option<DomainRange>> {
    let Some(object) = dict.get_object(key) else {
        return Ok(None);
    };

    let values = object.cast::<Vec<f32>>().ok_or(Error::TypeCheck)?;

    pairs(&values).map(Some)
}

/// Group a flat array into pairs. The array must have an even, non-zero length and every
/// minimum must not exceed its maximum.
pub(crate) fn pairs(values: &[f32]) -> Result<DomainRange> {
    if values.is_empty() || values.len() % 2 != 0 {
        return Err(Error::RangeCheck);
    }

    values
        .chunks_exact(2)
        .map(|c| {
            if c[0] <= c[1] {
                Ok((c[0], c[1]))
            } else {
                Err(Error::RangeCheck)
            }
        })
        .collect()
}

/// Linearly map `x` from `[x_min, x_max]` to `[y_min, y_max]`.
#[inline]
pub(crate) fn interpolate(x: f32, x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> f32 {
    let divisor = x_max - x_min;

    if divisor == 0.0 {
        return y_min;
    }

    y_min + (x - x_min) * ((y_max - y_min) / divisor)
}

/// Map `t` in `[0, 1]` to `[min, max]`, hitting both end points exactly.
#[inline]
pub(crate) fn lerp(t: f32, min: f32, max: f32) -> f32 {
    min * (1.0 - t) + max * t
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::object::keys::*;
    use crate::object::Stream;

    pub(crate) fn assert_close(a: &[f32], b: &[f32]) {
        assert_eq!(a.len(), b.len(), "{a:?} != {b:?}");

        for (a1, b1) in a.iter().zip(b) {
            assert!((a1 - b1).abs() < 1e-4, "{a:?} != {b:?}");
        }
    }

    pub(crate) fn identity() -> Object {
        Object::Dict(
            Dict::new()
                .with(FUNCTION_TYPE, 2)
                .with(DOMAIN, Object::numbers(&[0.0, 1.0]))
                .with(N, 1),
        )
    }

    #[test]
    fn decode_end_points_are_exact() {
        for bits in [1u8, 2, 4, 8, 12, 16] {
            let max = ((1u32 << bits) - 1) as f32;

            for (min, dmax) in [(0.0, 1.0), (1.0, 0.0), (-0.3, 0.7), (0.1, 3.3), (-128.0, 127.0)] {
                assert_eq!(lerp(0.0 / max, min, dmax), min);
                assert_eq!(lerp(max / max, min, dmax), dmax);
            }
        }
    }

    #[test]
    fn interpolate_degenerate() {
        assert_eq!(interpolate(0.5, 1.0, 1.0, 3.0, 4.0), 3.0);
        assert_eq!(interpolate(0.5, 0.0, 1.0, 2.0, 4.0), 3.0);
    }

    #[test]
    fn missing_function_type() {
        let dict = Dict::new().with(DOMAIN, Object::numbers(&[0.0, 1.0]));

        assert_eq!(
            Function::new(&Object::Dict(dict)).unwrap_err(),
            Error::Undefined
        );
        assert_eq!(
            Function::new(&Object::Number(1.0)).unwrap_err(),
            Error::TypeCheck
        );
    }

    #[test]
    fn unsupported_function_type() {
        let dict = Dict::new()
            .with(FUNCTION_TYPE, 7)
            .with(DOMAIN, Object::numbers(&[0.0, 1.0]))
            .with(RANGE, Object::numbers(&[0.0, 1.0, 0.0, 1.0, 0.0, 1.0]));
        let function = Function::new(&Object::Dict(dict)).unwrap();

        assert!(!function.is_supported());
        assert_eq!(function.eval(&[0.5]).as_slice(), &[0.0, 0.0, 0.0]);

        let dict = Dict::new()
            .with(FUNCTION_TYPE, 1)
            .with(DOMAIN, Object::numbers(&[0.0, 1.0]));
        let function = Function::new(&Object::Dict(dict)).unwrap();

        assert_eq!(function.eval(&[0.5]).as_slice(), &[0.0]);
    }

    #[test]
    fn array_of_functions() {
        let inverted = Object::Dict(
            Dict::new()
                .with(FUNCTION_TYPE, 2)
                .with(DOMAIN, Object::numbers(&[0.0, 1.0]))
                .with(C0, Object::numbers(&[1.0]))
                .with(C1, Object::numbers(&[0.0]))
                .with(N, 1),
        );

        let function = Function::new(&Object::array([identity(), inverted])).unwrap();

        assert_eq!(function.output_count(), 2);
        assert_close(&function.eval(&[0.25]), &[0.25, 0.75]);
        assert_eq!(
            Function::new(&Object::array([])).unwrap_err(),
            Error::RangeCheck
        );
    }

    #[test]
    fn invalid_domain() {
        let dict = Dict::new()
            .with(FUNCTION_TYPE, 2)
            .with(DOMAIN, Object::numbers(&[0.0, 1.0, 2.0]))
            .with(N, 1);

        assert_eq!(
            Function::new(&Object::Dict(dict)).unwrap_err(),
            Error::RangeCheck
        );

        let dict = Dict::new()
            .with(FUNCTION_TYPE, 2)
            .with(DOMAIN, Object::numbers(&[1.0, 0.0]))
            .with(N, 1);

        assert_eq!(
            Function::new(&Object::Dict(dict)).unwrap_err(),
            Error::RangeCheck
        );
    }

    #[test]
    fn sampled_function_from_stream() {
        let dict = Dict::new()
            .with(FUNCTION_TYPE, 0)
            .with(DOMAIN, Object::numbers(&[0.0, 1.0]))
            .with(RANGE, Object::numbers(&[0.0, 1.0]))
            .with(SIZE, Object::numbers(&[2.0]))
            .with(BITS_PER_SAMPLE, 8);
        let stream = Stream::new(dict, vec![0, 255]);
        let function = Function::new(&Object::Stream(stream)).unwrap();

        assert_close(&function.eval(&[0.5]), &[0.5]);
    }
}
