//! Executable procedure bodies.

use core::hash::{Hash, Hasher};
use std::sync::Arc;

use siphasher::sip128::{Hasher128, SipHasher13};

use crate::Values;
use crate::error::{Error, Result};
use crate::exec::{Interpreter, Value};
use crate::token::{self, Token};

/// An immutable, cheaply clonable PostScript procedure.
///
/// Two procedures with the same token sequence are considered equal and
/// produce the same [`Procedure::content_hash`], no matter where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Procedure(Arc<[Token]>);

impl Procedure {
    /// Parse a procedure from source text, like `{ 1 exch sub }`.
    ///
    /// The braces are optional. `bind`, `readonly` and `executeonly` after
    /// the closing brace are accepted and ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let trimmed = strip_trailing_attributes(data);

        token::parse(trimmed).map(Self::from_tokens)
    }

    /// Create a procedure from an already scanned token sequence.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self(tokens.into())
    }

    /// The tokens of the procedure.
    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    /// Returns `true` if the procedure has no tokens, which makes it the
    /// identity for decode procedures.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A 128-bit hash of the token sequence, used to key caches by content
    /// instead of by object identity.
    pub fn content_hash(&self) -> u128 {
        let mut hasher = SipHasher13::new();
        self.hash(&mut hasher);
        hasher.finish128().as_u128()
    }

    /// Push `inputs` onto a fresh operand stack, execute the procedure and
    /// return the resulting stack from bottom to top.
    ///
    /// Booleans become `1.0`/`0.0`, other non-numeric results become `0.0`.
    pub fn eval(&self, inputs: &[f32]) -> Result<Values> {
        let mut interpreter = Interpreter::new();

        for input in inputs {
            interpreter.stack_mut().push(Value::Number(*input))?;
        }

        interpreter.execute(self)?;

        Ok(interpreter
            .stack()
            .items()
            .iter()
            .map(Value::to_output)
            .collect())
    }

    /// Execute a procedure that maps a single number to a single number.
    pub fn eval_single(&self, input: f32) -> Result<f32> {
        let out = self.eval(&[input])?;

        out.last().copied().ok_or(Error::StackUnderflow)
    }
}

impl Hash for Procedure {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);

        for token in self.0.iter() {
            token.hash(state);
        }
    }
}

fn strip_trailing_attributes(mut data: &[u8]) -> &[u8] {
    loop {
        let trimmed = data.trim_ascii_end();
        let stripped = [&b"bind"[..], b"readonly", b"executeonly"]
            .iter()
            .find_map(|attr| {
                let rest = trimmed.strip_suffix(*attr)?;
                rest.trim_ascii_end().ends_with(b"}").then_some(rest)
            });

        match stripped {
            Some(rest) => data = rest,
            None => return trimmed,
        }
    }
}
