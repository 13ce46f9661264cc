use crate::error::{Error, Result};
use crate::function::{Clamper, Values};
use crate::object::keys::DATA_SOURCE;
use crate::object::{Dict, Object};
use log::warn;
use pscolor_postscript::Procedure;
use smallvec::smallvec;

/// A PostScript calculator function.
#[derive(Debug)]
pub(crate) struct Type4 {
    program: Procedure,
    pub(crate) clamper: Clamper,
}

impl Type4 {
    pub(crate) fn new(object: &Object, dict: &Dict) -> Result<Self> {
        let clamper = Clamper::new(dict)?;

        if clamper.range.is_none() {
            return Err(Error::Undefined);
        }

        let program = match object {
            Object::Stream(s) => Procedure::parse(s.data())?,
            _ => match dict.get_object(DATA_SOURCE).ok_or(Error::Undefined)? {
                Object::Procedure(p) => p.clone(),
                Object::String(s) => Procedure::parse(s)?,
                Object::Stream(s) => Procedure::parse(s.data())?,
                _ => return Err(Error::TypeCheck),
            },
        };

        Ok(Self { program, clamper })
    }

    pub(crate) fn output_count(&self) -> usize {
        self.clamper.range.as_ref().map(|r| r.len()).unwrap_or(1)
    }

    pub(crate) fn eval(&self, input: &[f32]) -> Values {
        let input = self.clamper.clamp_input(input);
        let outputs = self.output_count();

        let mut out = match self.program.eval(&input) {
            Ok(mut out) => {
                // Only the topmost values are the results.
                if out.len() > outputs {
                    out.drain(..out.len() - outputs);
                }

                out.resize(outputs, 0.0);
                out
            }
            Err(e) => {
                warn!("failed to run calculator function: {e}");

                smallvec![0.0; outputs]
            }
        };

        self.clamper.clamp_output(&mut out);

        out
    }
}

#[cfg(test)]
mod tests {
    use crate::function::Function;
    use crate::function::tests::assert_close;
    use crate::object::keys::*;
    use crate::object::{Dict, Object, Stream};

    fn calculator(domain: &[f32], range: &[f32], program: &[u8]) -> Function {
        let dict = Dict::new()
            .with(FUNCTION_TYPE, 4)
            .with(DOMAIN, Object::numbers(domain))
            .with(RANGE, Object::numbers(range));

        Function::new(&Object::Stream(Stream::new(dict, program.to_vec()))).unwrap()
    }

    #[test]
    fn inverse() {
        let f = calculator(&[0.0, 1.0], &[0.0, 1.0], b"{ 1 exch sub }");

        assert_close(&f.eval(&[0.25]), &[0.75]);
        assert_close(&f.eval(&[3.0]), &[1.0]);
    }

    #[test]
    fn multiple_outputs() {
        let f = calculator(
            &[0.0, 1.0],
            &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
            b"{ dup 0.5 mul exch dup 0.25 mul exch 0 exch }",
        );

        assert_close(&f.eval(&[1.0]), &[0.5, 0.25, 0.0, 1.0]);
    }

    #[test]
    fn output_count_mismatch() {
        let f = calculator(&[0.0, 1.0], &[0.0, 1.0, 0.0, 1.0], b"{ pop 0.2 0.4 0.6 }");
        assert_close(&f.eval(&[0.0]), &[0.4, 0.6]);

        let f = calculator(&[0.0, 1.0], &[0.0, 1.0, 0.0, 1.0], b"{ }");
        assert_close(&f.eval(&[0.7]), &[0.7, 0.0]);
    }

    #[test]
    fn failing_program() {
        let f = calculator(&[0.0, 1.0], &[0.0, 1.0], b"{ 0 div }");

        assert_close(&f.eval(&[0.5]), &[0.0]);
    }

    #[test]
    fn procedure_data_source() {
        let dict = Dict::new()
            .with(FUNCTION_TYPE, 4)
            .with(DOMAIN, Object::numbers(&[0.0, 1.0, 0.0, 1.0]))
            .with(RANGE, Object::numbers(&[0.0, 2.0]))
            .with(DATA_SOURCE, Object::procedure(b"{ add }").unwrap());
        let f = Function::new(&Object::Dict(dict)).unwrap();

        assert_eq!(f.input_count(), 2);
        assert_close(&f.eval(&[0.5, 0.75]), &[1.25]);
    }
}
