/*!
A tokenizer and restricted evaluator for PostScript numeric procedures.

PostScript color spaces carry small procedures, like the `Decode` entries of
CIE-based color spaces, tint transforms of `Separation` spaces or black
generation functions. They only use a restricted subset of the language:
arithmetic, comparisons, stack manipulation, conditionals and lookups in
arrays and strings. This crate scans such procedures into [`Token`]s and
executes them against a float-valued operand stack, without any access to
dictionaries or the surrounding interpreter.

Unknown operators are skipped instead of raising an error, and `bind` as well
as `readonly` are accepted without effect.

```
use pscolor_postscript::Procedure;

let procedure = Procedure::parse(b"{ 1 exch sub } bind").unwrap();
assert_eq!(procedure.eval_single(0.25).unwrap(), 0.75);
```

## Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod decode;
mod error;
mod exec;
mod name;
mod number;
mod procedure;
mod reader;
mod string;
mod token;

pub use decode::{DECODE_TABLE_SIZE, DecodeTable};
pub use error::{Error, Result};
pub use exec::{Interpreter, MAX_STACK_DEPTH, OperandStack, Value};
pub use number::Number;
pub use procedure::Procedure;
pub use token::{Op, Token};

/// The outputs of a procedure or function evaluation.
pub type Values = smallvec::SmallVec<[f32; 4]>;
